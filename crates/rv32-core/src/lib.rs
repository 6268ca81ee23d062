//! Core RV32IM crate: instruction tables, decoder and execution engine.

/// Execution-time error taxonomy.
pub mod fault;
pub use fault::ExecutionError;

/// Bit packing and field extraction shared by encoder and decoder.
pub mod layout;

/// Single source-of-truth instruction table.
pub mod encoding;
pub use encoding::{classify, Format, InstructionSpec, Mnemonic, OperandSlot, INSTRUCTION_TABLE};

/// Instruction decode pipeline with field extraction.
pub mod decoder;
pub use decoder::{Decoder, Instruction};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{Register, RegisterFile, REGISTER_COUNT};

/// Word-granular data memory.
pub mod memory;
pub use memory::{validate_data_access, AccessWidth, Memory, DEFAULT_MEMORY_WORDS};

/// Public host-facing API contract and the engine.
pub mod api;
pub use api::{
    CoreConfig, CoreState, CpuStatus, Engine, MemoryChange, RegisterChange, RunOutcome,
    StepOutcome, TraceEvent, TraceSink,
};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{commit_execution, execute_instruction, step_one, ExecuteState, PendingStore};

/// Canonical-syntax disassembler.
pub mod disasm;
pub use disasm::{disassemble, disassemble_program, format_instruction, DisassemblyRow};
