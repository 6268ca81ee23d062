//! Address and target arithmetic shared by the execute handlers.

use crate::decoder::Instruction;
use crate::{CoreState, ExecutionError};

/// Computes `rs1 + imm` for loads, stores and `JALR`, wrapping at 32 bits.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn compute_effective_address(instr: &Instruction, state: &CoreState) -> u32 {
    state
        .registers
        .get(instr.rs1)
        .wrapping_add(instr.imm as u32)
}

/// Computes `pc + imm` for branches and `JAL`, wrapping at 32 bits.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn compute_pc_relative_target(pc: u32, imm: i32) -> u32 {
    pc.wrapping_add(imm as u32)
}

/// Rejects control-flow offsets and targets that are not multiples of 4.
///
/// # Errors
///
/// Returns [`ExecutionError::OffsetNotAligned`] when `value % 4 != 0`.
pub const fn require_word_aligned(value: u32) -> Result<(), ExecutionError> {
    if value % 4 == 0 {
        Ok(())
    } else {
        Err(ExecutionError::OffsetNotAligned)
    }
}
