//! Instruction execution pipeline for RV32I + M.
//!
//! A step runs in three phases:
//! 1. Fetch the word at `pc / 4` and decode it
//! 2. Compute the register write, memory write and next PC into an [`ExecuteState`]
//! 3. Commit the accumulated effects to the core state
//!
//! Handlers never touch [`CoreState`] mutably, so a failing instruction leaves
//! no partial side effects behind before the architectural reset.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::cast_possible_truncation)]

mod helpers;

pub use helpers::{compute_effective_address, compute_pc_relative_target, require_word_aligned};

use tracing::{debug, trace};

use crate::decoder::{Decoder, Instruction};
use crate::encoding::Mnemonic;
use crate::memory::{validate_data_access, AccessWidth};
use crate::state::Register;
use crate::{
    CoreConfig, CoreState, ExecutionError, MemoryChange, RegisterChange, StepOutcome, TraceEvent,
    TraceSink,
};

/// Store accumulated by a handler and applied at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStore {
    /// Byte address of the access.
    pub address: u32,
    /// Value truncated to `width`.
    pub value: u32,
    /// Access width.
    pub width: AccessWidth,
}

/// Side effects accumulated while executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteState {
    /// Destination register and its new value.
    pub register_write: Option<(Register, u32)>,
    /// Memory store to perform.
    pub memory_write: Option<PendingStore>,
    /// Program counter after the instruction retires.
    pub next_pc: u32,
}

impl ExecuteState {
    /// Creates a state that only advances the PC to `next_pc`.
    #[must_use]
    pub const fn new(next_pc: u32) -> Self {
        Self {
            register_write: None,
            memory_write: None,
            next_pc,
        }
    }
}

/// Executes one decoded instruction against a read-only view of the core.
///
/// # Errors
///
/// Returns the [`ExecutionError`] raised by the handler. No side effects are
/// accumulated for a failing instruction.
pub fn execute_instruction(
    instr: &Instruction,
    state: &CoreState,
) -> Result<ExecuteState, ExecutionError> {
    let pc = state.registers.pc();
    let mut exec = ExecuteState::new(pc.wrapping_add(4));

    match instr.mnemonic {
        Mnemonic::Add => execute_alu(instr, state, &mut exec, AluOp::Add, Operand::Register),
        Mnemonic::Sub => execute_alu(instr, state, &mut exec, AluOp::Sub, Operand::Register),
        Mnemonic::Sll => execute_alu(instr, state, &mut exec, AluOp::Sll, Operand::Register),
        Mnemonic::Slt => execute_alu(instr, state, &mut exec, AluOp::Slt, Operand::Register),
        Mnemonic::Sltu => execute_alu(instr, state, &mut exec, AluOp::Sltu, Operand::Register),
        Mnemonic::Xor => execute_alu(instr, state, &mut exec, AluOp::Xor, Operand::Register),
        Mnemonic::Srl => execute_alu(instr, state, &mut exec, AluOp::Srl, Operand::Register),
        Mnemonic::Sra => execute_alu(instr, state, &mut exec, AluOp::Sra, Operand::Register),
        Mnemonic::Or => execute_alu(instr, state, &mut exec, AluOp::Or, Operand::Register),
        Mnemonic::And => execute_alu(instr, state, &mut exec, AluOp::And, Operand::Register),
        Mnemonic::Addi => execute_alu(instr, state, &mut exec, AluOp::Add, Operand::Immediate),
        Mnemonic::Slti => execute_alu(instr, state, &mut exec, AluOp::Slt, Operand::Immediate),
        Mnemonic::Sltiu => execute_alu(instr, state, &mut exec, AluOp::Sltu, Operand::Immediate),
        Mnemonic::Xori => execute_alu(instr, state, &mut exec, AluOp::Xor, Operand::Immediate),
        Mnemonic::Ori => execute_alu(instr, state, &mut exec, AluOp::Or, Operand::Immediate),
        Mnemonic::Andi => execute_alu(instr, state, &mut exec, AluOp::And, Operand::Immediate),
        Mnemonic::Slli => execute_alu(instr, state, &mut exec, AluOp::Sll, Operand::Immediate),
        Mnemonic::Srli => execute_alu(instr, state, &mut exec, AluOp::Srl, Operand::Immediate),
        Mnemonic::Srai => execute_alu(instr, state, &mut exec, AluOp::Sra, Operand::Immediate),
        Mnemonic::Mul => execute_math(instr, state, &mut exec, MathOp::Mul)?,
        Mnemonic::Mulh => execute_math(instr, state, &mut exec, MathOp::Mulh)?,
        Mnemonic::Mulhsu => execute_math(instr, state, &mut exec, MathOp::Mulhsu)?,
        Mnemonic::Mulhu => execute_math(instr, state, &mut exec, MathOp::Mulhu)?,
        Mnemonic::Div => execute_math(instr, state, &mut exec, MathOp::Div)?,
        Mnemonic::Divu => execute_math(instr, state, &mut exec, MathOp::Divu)?,
        Mnemonic::Rem => execute_math(instr, state, &mut exec, MathOp::Rem)?,
        Mnemonic::Remu => execute_math(instr, state, &mut exec, MathOp::Remu)?,
        Mnemonic::Lb => execute_load(instr, state, &mut exec, LoadOp::Byte)?,
        Mnemonic::Lh => execute_load(instr, state, &mut exec, LoadOp::Half)?,
        Mnemonic::Lw => execute_load(instr, state, &mut exec, LoadOp::Word)?,
        Mnemonic::Lbu => execute_load(instr, state, &mut exec, LoadOp::ByteUnsigned)?,
        Mnemonic::Lhu => execute_load(instr, state, &mut exec, LoadOp::HalfUnsigned)?,
        Mnemonic::Sb => execute_store(instr, state, &mut exec, AccessWidth::Byte)?,
        Mnemonic::Sh => execute_store(instr, state, &mut exec, AccessWidth::Half)?,
        Mnemonic::Sw => execute_store(instr, state, &mut exec, AccessWidth::Word)?,
        Mnemonic::Beq => execute_branch(instr, state, &mut exec, BranchOp::Eq)?,
        Mnemonic::Bne => execute_branch(instr, state, &mut exec, BranchOp::Ne)?,
        Mnemonic::Blt => execute_branch(instr, state, &mut exec, BranchOp::Lt)?,
        Mnemonic::Bge => execute_branch(instr, state, &mut exec, BranchOp::Ge)?,
        Mnemonic::Bltu => execute_branch(instr, state, &mut exec, BranchOp::Ltu)?,
        Mnemonic::Bgeu => execute_branch(instr, state, &mut exec, BranchOp::Geu)?,
        Mnemonic::Jal => execute_jal(instr, pc, &mut exec)?,
        Mnemonic::Jalr => execute_jalr(instr, state, &mut exec)?,
        Mnemonic::Lui => {
            exec.register_write = Some((instr.rd, (instr.imm as u32) << 12));
        }
        Mnemonic::Auipc => {
            exec.register_write = Some((instr.rd, pc.wrapping_add((instr.imm as u32) << 12)));
        }
    }

    Ok(exec)
}

/// Applies accumulated side effects and reports what changed.
///
/// Call only with an [`ExecuteState`] returned by a successful
/// [`execute_instruction`].
pub fn commit_execution(
    state: &mut CoreState,
    exec: &ExecuteState,
) -> (Option<RegisterChange>, Option<MemoryChange>) {
    let register_change = exec.register_write.map(|(reg, value)| {
        state.registers.set(reg, value);
        RegisterChange {
            reg,
            value: state.registers.get(reg),
        }
    });

    let memory_change = exec.memory_write.map(|store| {
        state.memory.store(store.address, store.value, store.width);
        let cell_address = store.address & !3;
        MemoryChange {
            address: cell_address,
            value: state.memory.read32(cell_address),
        }
    });

    state.registers.set_pc(exec.next_pc);
    (register_change, memory_change)
}

#[derive(Clone, Copy)]
enum Operand {
    Register,
    Immediate,
}

#[derive(Clone, Copy)]
enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

fn execute_alu(
    instr: &Instruction,
    state: &CoreState,
    exec: &mut ExecuteState,
    op: AluOp,
    operand: Operand,
) {
    let lhs = state.registers.get(instr.rs1);
    let rhs = match operand {
        Operand::Register => state.registers.get(instr.rs2),
        Operand::Immediate => instr.imm as u32,
    };
    let shamt = rhs & 0x1F;

    let result = match op {
        AluOp::Add => lhs.wrapping_add(rhs),
        AluOp::Sub => lhs.wrapping_sub(rhs),
        AluOp::Sll => lhs << shamt,
        AluOp::Slt => u32::from((lhs as i32) < (rhs as i32)),
        AluOp::Sltu => u32::from(lhs < rhs),
        AluOp::Xor => lhs ^ rhs,
        AluOp::Srl => lhs >> shamt,
        AluOp::Sra => ((lhs as i32) >> shamt) as u32,
        AluOp::Or => lhs | rhs,
        AluOp::And => lhs & rhs,
    };

    exec.register_write = Some((instr.rd, result));
}

#[derive(Clone, Copy)]
enum MathOp {
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

fn execute_math(
    instr: &Instruction,
    state: &CoreState,
    exec: &mut ExecuteState,
    op: MathOp,
) -> Result<(), ExecutionError> {
    let lhs = state.registers.get(instr.rs1);
    let rhs = state.registers.get(instr.rs2);

    let result = match op {
        MathOp::Mul => lhs.wrapping_mul(rhs),
        MathOp::Mulh => ((i64::from(lhs as i32) * i64::from(rhs as i32)) >> 32) as u32,
        MathOp::Mulhsu => ((i64::from(lhs as i32) * i64::from(rhs)) >> 32) as u32,
        MathOp::Mulhu => ((u64::from(lhs) * u64::from(rhs)) >> 32) as u32,
        MathOp::Div | MathOp::Divu | MathOp::Rem | MathOp::Remu if rhs == 0 => {
            return Err(ExecutionError::DivisionByZero);
        }
        MathOp::Div => (lhs as i32).wrapping_div(rhs as i32) as u32,
        MathOp::Divu => lhs / rhs,
        MathOp::Rem => (lhs as i32).wrapping_rem(rhs as i32) as u32,
        MathOp::Remu => lhs % rhs,
    };

    exec.register_write = Some((instr.rd, result));
    Ok(())
}

#[derive(Clone, Copy)]
enum LoadOp {
    Byte,
    Half,
    Word,
    ByteUnsigned,
    HalfUnsigned,
}

impl LoadOp {
    const fn width(self) -> AccessWidth {
        match self {
            Self::Byte | Self::ByteUnsigned => AccessWidth::Byte,
            Self::Half | Self::HalfUnsigned => AccessWidth::Half,
            Self::Word => AccessWidth::Word,
        }
    }
}

fn execute_load(
    instr: &Instruction,
    state: &CoreState,
    exec: &mut ExecuteState,
    op: LoadOp,
) -> Result<(), ExecutionError> {
    let address = compute_effective_address(instr, state);
    validate_data_access(address, op.width(), state.memory.len_bytes())?;

    let raw = state.memory.load(address, op.width());
    let value = match op {
        LoadOp::Byte => i32::from(raw as u8 as i8) as u32,
        LoadOp::Half => i32::from(raw as u16 as i16) as u32,
        LoadOp::Word | LoadOp::ByteUnsigned | LoadOp::HalfUnsigned => raw,
    };

    exec.register_write = Some((instr.rd, value));
    Ok(())
}

fn execute_store(
    instr: &Instruction,
    state: &CoreState,
    exec: &mut ExecuteState,
    width: AccessWidth,
) -> Result<(), ExecutionError> {
    let address = compute_effective_address(instr, state);
    validate_data_access(address, width, state.memory.len_bytes())?;

    exec.memory_write = Some(PendingStore {
        address,
        value: state.registers.get(instr.rs2) & width.value_mask(),
        width,
    });
    Ok(())
}

#[derive(Clone, Copy)]
enum BranchOp {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

fn execute_branch(
    instr: &Instruction,
    state: &CoreState,
    exec: &mut ExecuteState,
    op: BranchOp,
) -> Result<(), ExecutionError> {
    require_word_aligned(instr.imm as u32)?;

    let lhs = state.registers.get(instr.rs1);
    let rhs = state.registers.get(instr.rs2);
    let taken = match op {
        BranchOp::Eq => lhs == rhs,
        BranchOp::Ne => lhs != rhs,
        BranchOp::Lt => (lhs as i32) < (rhs as i32),
        BranchOp::Ge => (lhs as i32) >= (rhs as i32),
        BranchOp::Ltu => lhs < rhs,
        BranchOp::Geu => lhs >= rhs,
    };

    if taken {
        exec.next_pc = compute_pc_relative_target(state.registers.pc(), instr.imm);
    }
    Ok(())
}

fn execute_jal(instr: &Instruction, pc: u32, exec: &mut ExecuteState) -> Result<(), ExecutionError> {
    require_word_aligned(instr.imm as u32)?;

    exec.register_write = Some((instr.rd, pc.wrapping_add(4)));
    exec.next_pc = compute_pc_relative_target(pc, instr.imm);
    Ok(())
}

fn execute_jalr(
    instr: &Instruction,
    state: &CoreState,
    exec: &mut ExecuteState,
) -> Result<(), ExecutionError> {
    let target = compute_effective_address(instr, state);
    require_word_aligned(target)?;

    exec.register_write = Some((instr.rd, state.registers.pc().wrapping_add(4)));
    exec.next_pc = target;
    Ok(())
}

struct Tracer<'a> {
    sink: Option<&'a mut dyn TraceSink>,
}

impl Tracer<'_> {
    fn emit(&mut self, event: TraceEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_event(event);
        }
    }
}

/// Executes exactly one instruction.
///
/// A PC past the end of the program reports
/// [`ExecutionError::PcOutOfBounds`] and leaves state untouched. Any other
/// error resets the register file and PC (memory is kept) and records the
/// failing instruction's index.
pub fn step_one(
    state: &mut CoreState,
    config: &CoreConfig,
    sink: Option<&mut dyn TraceSink>,
) -> StepOutcome {
    let mut tracer = Tracer {
        sink: if config.tracing_enabled { sink } else { None },
    };

    let pc = state.registers.pc();
    let index = (pc / 4) as usize;
    let Some(&raw_word) = state.program.get(index) else {
        trace!(pc, program_len = state.program.len(), "pc past end of program");
        tracer.emit(TraceEvent::ErrorRaised {
            error: ExecutionError::PcOutOfBounds,
            pc,
        });
        return StepOutcome::terminated(pc);
    };

    tracer.emit(TraceEvent::InstructionStart { pc, raw_word });

    let executed = Decoder::decode(raw_word).and_then(|instr| {
        trace!(pc, raw_word = format_args!("{raw_word:#010x}"), mnemonic = %instr.mnemonic, "step");
        execute_instruction(&instr, state)
    });

    let exec = match executed {
        Ok(exec) => exec,
        Err(error) => {
            debug!(%error, pc, index, "instruction failed, resetting registers");
            state.reset_architectural();
            tracer.emit(TraceEvent::ErrorRaised { error, pc });
            return StepOutcome::failed(error, state.registers.pc(), index);
        }
    };

    let (register_change, memory_change) = commit_execution(state, &exec);

    if let Some(change) = register_change {
        tracer.emit(TraceEvent::RegisterWrite {
            reg: change.reg,
            value: change.value,
        });
    }
    if let Some(change) = memory_change {
        tracer.emit(TraceEvent::MemoryWrite {
            address: change.address,
            value: change.value,
        });
    }
    tracer.emit(TraceEvent::InstructionRetired {
        pc,
        next_pc: exec.next_pc,
    });

    StepOutcome {
        error: None,
        memory_change,
        register_change,
        pc: state.registers.pc(),
        error_index: None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{execute_instruction, step_one, ExecuteState};
    use crate::decoder::Instruction;
    use crate::encoding::Mnemonic;
    use crate::state::Register;
    use crate::{CoreConfig, CoreState, ExecutionError, TraceEvent, TraceSink};

    fn reg(number: u8) -> Register {
        Register::new(number).expect("valid register")
    }

    fn instr(mnemonic: Mnemonic, rd: u8, rs1: u8, rs2: u8, imm: i32) -> Instruction {
        Instruction {
            mnemonic,
            rd: reg(rd),
            rs1: reg(rs1),
            rs2: reg(rs2),
            imm,
        }
    }

    fn state_with(x1: u32, x2: u32) -> CoreState {
        let mut state = CoreState::with_config(&CoreConfig {
            memory_words: 16,
            ..CoreConfig::default()
        });
        state.registers.set(reg(1), x1);
        state.registers.set(reg(2), x2);
        state
    }

    fn result_of(mnemonic: Mnemonic, x1: u32, x2: u32, imm: i32) -> Result<u32, ExecutionError> {
        let state = state_with(x1, x2);
        let exec = execute_instruction(&instr(mnemonic, 3, 1, 2, imm), &state)?;
        Ok(exec.register_write.map_or(0, |(_, value)| value))
    }

    #[rstest]
    #[case(Mnemonic::Add, 0xFFFF_FFFF, 2, 1)]
    #[case(Mnemonic::Sub, 1, 2, 0xFFFF_FFFF)]
    #[case(Mnemonic::Sll, 1, 33, 2)]
    #[case(Mnemonic::Slt, 0xFFFF_FFFF, 0, 1)]
    #[case(Mnemonic::Sltu, 0xFFFF_FFFF, 0, 0)]
    #[case(Mnemonic::Xor, 0b1100, 0b1010, 0b0110)]
    #[case(Mnemonic::Srl, 0x8000_0000, 31, 1)]
    #[case(Mnemonic::Sra, 0x8000_0000, 31, 0xFFFF_FFFF)]
    #[case(Mnemonic::Or, 0b1100, 0b1010, 0b1110)]
    #[case(Mnemonic::And, 0b1100, 0b1010, 0b1000)]
    fn register_alu_ops(
        #[case] mnemonic: Mnemonic,
        #[case] x1: u32,
        #[case] x2: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(result_of(mnemonic, x1, x2, 0), Ok(expected));
    }

    #[rstest]
    #[case(Mnemonic::Addi, 5, -6, 0xFFFF_FFFF)]
    #[case(Mnemonic::Slti, 5, 6, 1)]
    #[case(Mnemonic::Sltiu, 5, -1, 1)]
    #[case(Mnemonic::Xori, 0xFF, -1, 0xFFFF_FF00)]
    #[case(Mnemonic::Ori, 0xF0, 0x0F, 0xFF)]
    #[case(Mnemonic::Andi, 0xFF, 0x0F, 0x0F)]
    #[case(Mnemonic::Slli, 1, 31, 0x8000_0000)]
    #[case(Mnemonic::Srli, 0xF000_0000, 28, 0xF)]
    #[case(Mnemonic::Srai, 0xF000_0000, 28, 0xFFFF_FFFF)]
    fn immediate_alu_ops(
        #[case] mnemonic: Mnemonic,
        #[case] x1: u32,
        #[case] imm: i32,
        #[case] expected: u32,
    ) {
        assert_eq!(result_of(mnemonic, x1, 0, imm), Ok(expected));
    }

    #[rstest]
    #[case(Mnemonic::Mul, 0xFFFF_FFFF, 3, 0xFFFF_FFFD)]
    #[case(Mnemonic::Mulh, 0xFFFF_FFFF, 0xFFFF_FFFF, 0)]
    #[case(Mnemonic::Mulh, 0x8000_0000, 2, 0xFFFF_FFFF)]
    #[case(Mnemonic::Mulhsu, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF)]
    #[case(Mnemonic::Mulhu, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFE)]
    #[case(Mnemonic::Div, 0xFFFF_FFF9, 2, 0xFFFF_FFFD)]
    #[case(Mnemonic::Div, 0x8000_0000, 0xFFFF_FFFF, 0x8000_0000)]
    #[case(Mnemonic::Divu, 0xFFFF_FFF9, 2, 0x7FFF_FFFC)]
    #[case(Mnemonic::Rem, 0xFFFF_FFF9, 2, 0xFFFF_FFFF)]
    #[case(Mnemonic::Rem, 0x8000_0000, 0xFFFF_FFFF, 0)]
    #[case(Mnemonic::Remu, 7, 2, 1)]
    fn m_extension_ops(
        #[case] mnemonic: Mnemonic,
        #[case] x1: u32,
        #[case] x2: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(result_of(mnemonic, x1, x2, 0), Ok(expected));
    }

    #[rstest]
    #[case(Mnemonic::Div)]
    #[case(Mnemonic::Divu)]
    #[case(Mnemonic::Rem)]
    #[case(Mnemonic::Remu)]
    fn division_by_zero_is_an_error(#[case] mnemonic: Mnemonic) {
        assert_eq!(
            result_of(mnemonic, 10, 0, 0),
            Err(ExecutionError::DivisionByZero)
        );
    }

    #[rstest]
    #[case(Mnemonic::Beq, 4, 4, true)]
    #[case(Mnemonic::Bne, 4, 4, false)]
    #[case(Mnemonic::Blt, 0xFFFF_FFFF, 0, true)]
    #[case(Mnemonic::Bge, 0xFFFF_FFFF, 0, false)]
    #[case(Mnemonic::Bltu, 0xFFFF_FFFF, 0, false)]
    #[case(Mnemonic::Bgeu, 0xFFFF_FFFF, 0, true)]
    fn branches_compare_with_correct_signedness(
        #[case] mnemonic: Mnemonic,
        #[case] x1: u32,
        #[case] x2: u32,
        #[case] taken: bool,
    ) {
        let mut state = state_with(x1, x2);
        state.registers.set_pc(8);
        let exec = execute_instruction(&instr(mnemonic, 0, 1, 2, -8), &state)
            .expect("aligned branch executes");
        assert_eq!(exec.next_pc, if taken { 0 } else { 12 });
        assert_eq!(exec.register_write, None);
    }

    #[test]
    fn misaligned_branch_offset_is_rejected_even_when_not_taken() {
        let state = state_with(1, 2);
        assert_eq!(
            execute_instruction(&instr(Mnemonic::Beq, 0, 1, 2, 6), &state),
            Err(ExecutionError::OffsetNotAligned)
        );
    }

    #[test]
    fn jal_links_and_redirects() {
        let mut state = state_with(0, 0);
        state.registers.set_pc(16);
        let exec = execute_instruction(&instr(Mnemonic::Jal, 1, 0, 0, -8), &state)
            .expect("aligned jal executes");
        assert_eq!(exec.register_write, Some((reg(1), 20)));
        assert_eq!(exec.next_pc, 8);
    }

    #[test]
    fn jalr_checks_alignment_of_computed_target() {
        let state = state_with(6, 0);
        assert_eq!(
            execute_instruction(&instr(Mnemonic::Jalr, 3, 1, 0, 0), &state),
            Err(ExecutionError::OffsetNotAligned)
        );
        let exec = execute_instruction(&instr(Mnemonic::Jalr, 3, 1, 0, 2), &state)
            .expect("aligned target executes");
        assert_eq!(exec.next_pc, 8);
        assert_eq!(exec.register_write, Some((reg(3), 4)));
    }

    #[test]
    fn upper_immediates_shift_by_twelve() {
        let mut state = state_with(0, 0);
        state.registers.set_pc(8);
        let lui = execute_instruction(&instr(Mnemonic::Lui, 3, 0, 0, -1), &state)
            .expect("lui executes");
        assert_eq!(lui.register_write, Some((reg(3), 0xFFFF_F000)));
        let auipc = execute_instruction(&instr(Mnemonic::Auipc, 3, 0, 0, 1), &state)
            .expect("auipc executes");
        assert_eq!(auipc.register_write, Some((reg(3), 0x1008)));
    }

    #[test]
    fn loads_sign_or_zero_extend() {
        let mut state = state_with(4, 0);
        state.memory.write(4, 0x0000_80FF);
        let load = |mnemonic, imm| {
            execute_instruction(&instr(mnemonic, 3, 1, 0, imm), &state)
                .expect("load executes")
                .register_write
                .map(|(_, value)| value)
        };
        assert_eq!(load(Mnemonic::Lb, 0), Some(0xFFFF_FFFF));
        assert_eq!(load(Mnemonic::Lbu, 0), Some(0xFF));
        assert_eq!(load(Mnemonic::Lh, 0), Some(0xFFFF_80FF));
        assert_eq!(load(Mnemonic::Lhu, 0), Some(0x80FF));
        assert_eq!(load(Mnemonic::Lw, 0), Some(0x80FF));
        assert_eq!(load(Mnemonic::Lb, 1), Some(0xFFFF_FF80));
    }

    #[test]
    fn out_of_bounds_data_access_is_rejected() {
        let state = state_with(64, 2);
        assert_eq!(
            execute_instruction(&instr(Mnemonic::Lw, 3, 1, 0, 0), &state),
            Err(ExecutionError::InvalidMemoryAccess)
        );
        assert_eq!(
            execute_instruction(&instr(Mnemonic::Lw, 3, 1, 0, -2), &state),
            Err(ExecutionError::InvalidMemoryAccess)
        );
        assert_eq!(
            execute_instruction(&instr(Mnemonic::Sh, 0, 1, 2, -1), &state).map(|_| ()),
            Err(ExecutionError::InvalidMemoryAccess)
        );
    }

    #[test]
    fn misaligned_in_bounds_data_access_succeeds() {
        let mut state = state_with(0, 2);
        state.memory.write(0, 0x4433_2211);
        state.memory.write(4, 0x8877_6655);

        let load = |mnemonic, imm| {
            execute_instruction(&instr(mnemonic, 3, 2, 0, imm), &state)
                .map(|exec| exec.register_write.map(|(_, value)| value))
        };
        assert_eq!(load(Mnemonic::Lh, -1), Ok(Some(0x0000_3322)));
        assert_eq!(load(Mnemonic::Lw, 0), Ok(Some(0x6655_4433)));
        assert_eq!(load(Mnemonic::Lhu, 3), Ok(Some(0x0000_7766)));
        assert_eq!(load(Mnemonic::Lh, 4), Ok(Some(0xFFFF_8877)));

        let store = execute_instruction(&instr(Mnemonic::Sw, 0, 2, 1, 0), &state)
            .expect("misaligned store executes")
            .memory_write
            .expect("pending store");
        assert_eq!(store.address, 2);
    }

    #[test]
    fn store_truncates_to_width() {
        let state = state_with(0, 0x1234_5678);
        let exec = execute_instruction(&instr(Mnemonic::Sh, 0, 1, 2, 2), &state)
            .expect("store executes");
        let store = exec.memory_write.expect("pending store");
        assert_eq!(store.address, 2);
        assert_eq!(store.value, 0x5678);
        assert_eq!(exec.register_write, None);
    }

    fn loaded_state(program: &[u32]) -> CoreState {
        let mut state = CoreState::with_config(&CoreConfig {
            memory_words: 16,
            ..CoreConfig::default()
        });
        state.program = program.to_vec();
        state
    }

    #[test]
    fn step_reports_register_change_and_advances_pc() {
        // addi x1, x0, 1
        let mut state = loaded_state(&[0x0010_0093]);
        let outcome = step_one(&mut state, &CoreConfig::default(), None);
        assert!(outcome.is_success());
        assert_eq!(outcome.pc, 4);
        let change = outcome.register_change.expect("register change");
        assert_eq!((change.reg, change.value), (reg(1), 1));
    }

    #[test]
    fn step_reports_whole_cell_for_narrow_store() {
        // addi x1, x0, 0xAB ; sb x1, 5(x0)
        let mut state = loaded_state(&[0x0AB0_0093, 0x0010_02A3]);
        let config = CoreConfig::default();
        step_one(&mut state, &config, None);
        let outcome = step_one(&mut state, &config, None);
        let change = outcome.memory_change.expect("memory change");
        assert_eq!(change.address, 4);
        assert_eq!(change.value, 0x0000_AB00);
    }

    #[test]
    fn step_past_program_end_leaves_state_untouched() {
        let mut state = loaded_state(&[]);
        state.registers.set(reg(5), 9);
        let outcome = step_one(&mut state, &CoreConfig::default(), None);
        assert_eq!(outcome.error, Some(ExecutionError::PcOutOfBounds));
        assert_eq!(outcome.error_index, None);
        assert_eq!(state.registers.get(reg(5)), 9);
    }

    #[test]
    fn failing_step_resets_registers_and_keeps_memory() {
        // addi x1, x0, 1 ; unsupported word
        let mut state = loaded_state(&[0x0010_0093, 0xFFFF_FFFF]);
        state.memory.write(0, 0xAA);
        let config = CoreConfig::default();
        step_one(&mut state, &config, None);
        let outcome = step_one(&mut state, &config, None);
        assert_eq!(outcome.error, Some(ExecutionError::UnsupportedOpcode));
        assert_eq!(outcome.error_index, Some(1));
        assert_eq!(outcome.pc, 0);
        assert_eq!(state.registers.get(reg(1)), 0);
        assert_eq!(state.memory.read32(0), 0xAA);
    }

    #[derive(Default)]
    struct Recorder(Vec<TraceEvent>);

    impl TraceSink for Recorder {
        fn on_event(&mut self, event: TraceEvent) {
            self.0.push(event);
        }
    }

    #[test]
    fn trace_events_follow_execution_order_when_enabled() {
        let mut state = loaded_state(&[0x0010_0093]);
        let mut recorder = Recorder::default();
        let config = CoreConfig {
            tracing_enabled: true,
            ..CoreConfig::default()
        };
        step_one(&mut state, &config, Some(&mut recorder));
        assert_eq!(
            recorder.0,
            vec![
                TraceEvent::InstructionStart {
                    pc: 0,
                    raw_word: 0x0010_0093
                },
                TraceEvent::RegisterWrite {
                    reg: reg(1),
                    value: 1
                },
                TraceEvent::InstructionRetired { pc: 0, next_pc: 4 },
            ]
        );
    }

    #[test]
    fn trace_sink_is_silent_when_disabled() {
        let mut state = loaded_state(&[0x0010_0093]);
        let mut recorder = Recorder::default();
        step_one(&mut state, &CoreConfig::default(), Some(&mut recorder));
        assert!(recorder.0.is_empty());
    }

    #[test]
    fn execute_state_defaults_to_sequential_pc() {
        let exec = ExecuteState::new(12);
        assert_eq!(exec.next_pc, 12);
        assert!(exec.register_write.is_none());
        assert!(exec.memory_write.is_none());
    }
}
