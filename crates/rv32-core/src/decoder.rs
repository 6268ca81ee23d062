//! Instruction decoder for RV32I + M.
//!
//! Classifies a raw word against [`crate::encoding::INSTRUCTION_TABLE`] and
//! extracts its operand fields through [`crate::layout`], producing an
//! [`Instruction`] ready for execution.

use crate::encoding::{classify, Format, Mnemonic};
use crate::layout;
use crate::state::Register;
use crate::ExecutionError;

/// Decoded instruction with all operand fields extracted.
///
/// Fields a format does not use are [`Register::ZERO`] / `0`. `imm` holds
/// the sign-extended immediate or displacement; for U-type it is the signed
/// 20-bit value before the `<< 12`, for shifts it is the shift amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// Operation.
    pub mnemonic: Mnemonic,
    /// Destination register.
    pub rd: Register,
    /// First source register.
    pub rs1: Register,
    /// Second source register.
    pub rs2: Register,
    /// Immediate, shift amount or displacement.
    pub imm: i32,
}

impl Instruction {
    /// Re-encodes this instruction into a 32-bit word.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn encode(&self) -> u32 {
        let spec = self.mnemonic.spec();
        let rd = self.rd.number();
        let rs1 = self.rs1.number();
        let rs2 = self.rs2.number();
        match spec.format {
            Format::R => layout::pack_r(spec.funct7, rs2, rs1, spec.funct3, rd, spec.opcode),
            Format::IShift => layout::pack_r(
                spec.funct7,
                (self.imm & 0x1F) as u8,
                rs1,
                spec.funct3,
                rd,
                spec.opcode,
            ),
            Format::I | Format::Load | Format::Jalr => {
                layout::pack_i(self.imm, rs1, spec.funct3, rd, spec.opcode)
            }
            Format::S => layout::pack_s(self.imm, rs2, rs1, spec.funct3, spec.opcode),
            Format::B => layout::pack_b(self.imm, rs2, rs1, spec.funct3, spec.opcode),
            Format::U => layout::pack_u(self.imm, rd, spec.opcode),
            Format::J => layout::pack_j(self.imm, rd, spec.opcode),
        }
    }
}

/// Instruction decoder for RV32I + M.
pub struct Decoder;

fn register(field: u8) -> Result<Register, ExecutionError> {
    // Fields are masked to 5 bits, so this never fails for a real word.
    Register::new(field).ok_or(ExecutionError::InvalidRegister)
}

impl Decoder {
    /// Decodes a 32-bit instruction word.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::UnsupportedOpcode`] when the
    /// opcode/funct3/funct7 combination is not in the instruction table, and
    /// [`ExecutionError::InvalidRegister`] if a register field falls outside
    /// `x0..=x31`.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(word: u32) -> Result<Instruction, ExecutionError> {
        let mnemonic = classify(word).ok_or(ExecutionError::UnsupportedOpcode)?;

        let zero = Register::ZERO;
        let (rd, rs1, rs2, imm) = match mnemonic.format() {
            Format::R => (
                register(layout::rd(word))?,
                register(layout::rs1(word))?,
                register(layout::rs2(word))?,
                0,
            ),
            Format::IShift => (
                register(layout::rd(word))?,
                register(layout::rs1(word))?,
                zero,
                layout::shamt(word) as i32,
            ),
            Format::I | Format::Load | Format::Jalr => (
                register(layout::rd(word))?,
                register(layout::rs1(word))?,
                zero,
                layout::imm_i(word),
            ),
            Format::S => (
                zero,
                register(layout::rs1(word))?,
                register(layout::rs2(word))?,
                layout::imm_s(word),
            ),
            Format::B => (
                zero,
                register(layout::rs1(word))?,
                register(layout::rs2(word))?,
                layout::imm_b(word),
            ),
            Format::U => (register(layout::rd(word))?, zero, zero, layout::imm_u(word)),
            Format::J => (register(layout::rd(word))?, zero, zero, layout::imm_j(word)),
        };

        Ok(Instruction {
            mnemonic,
            rd,
            rs1,
            rs2,
            imm,
        })
    }
}
