//! Public host-facing API for embedding the execution engine.

use tracing::debug;

use crate::memory::{Memory, DEFAULT_MEMORY_WORDS};
use crate::state::{Register, RegisterFile, REGISTER_COUNT};
use crate::{step_one, ExecutionError};

/// Top-level configuration for an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Data memory size in 32-bit words.
    pub memory_words: u32,
    /// Enables deterministic trace callback dispatch.
    pub tracing_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memory_words: DEFAULT_MEMORY_WORDS,
            tracing_enabled: false,
        }
    }
}

/// Complete host-visible core state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreState {
    /// Register file and program counter.
    pub registers: RegisterFile,
    /// Data memory.
    pub memory: Memory,
    /// Loaded program; instruction `i` sits at PC `4 * i`.
    pub program: Vec<u32>,
}

impl Default for CoreState {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl CoreState {
    /// Creates an empty core sized by `config`.
    #[must_use]
    pub fn with_config(config: &CoreConfig) -> Self {
        Self {
            registers: RegisterFile::default(),
            memory: Memory::with_words(config.memory_words),
            program: Vec::new(),
        }
    }

    /// Zeroes registers and PC and clears memory. The program is kept.
    pub fn reset_canonical(&mut self) {
        self.registers.reset();
        self.memory.reset();
    }

    /// Zeroes registers and PC only, as done after a failed instruction.
    pub fn reset_architectural(&mut self) {
        self.registers.reset();
    }
}

/// Memory cell rewritten by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryChange {
    /// Byte address of the 4-byte cell containing the store.
    pub address: u32,
    /// Whole cell value after the store.
    pub value: u32,
}

/// Register written by an instruction.
///
/// A write targeting `x0` is reported with value `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterChange {
    /// Destination register.
    pub reg: Register,
    /// Value the register reads after the write.
    pub value: u32,
}

/// Snapshot produced by one [`Engine::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StepOutcome {
    /// Error raised by the step, if any.
    pub error: Option<ExecutionError>,
    /// Memory cell changed by a store.
    pub memory_change: Option<MemoryChange>,
    /// Register changed by the instruction.
    pub register_change: Option<RegisterChange>,
    /// Program counter after the step (0 after an error reset).
    pub pc: u32,
    /// 0-based index of the failing instruction; absent for termination.
    pub error_index: Option<usize>,
}

impl StepOutcome {
    /// Outcome for a PC past the end of the program.
    #[must_use]
    pub const fn terminated(pc: u32) -> Self {
        Self {
            error: Some(ExecutionError::PcOutOfBounds),
            memory_change: None,
            register_change: None,
            pc,
            error_index: None,
        }
    }

    /// Outcome for an instruction that raised `error`.
    #[must_use]
    pub const fn failed(error: ExecutionError, pc: u32, error_index: usize) -> Self {
        Self {
            error: Some(error),
            memory_change: None,
            register_change: None,
            pc,
            error_index: Some(error_index),
        }
    }

    /// Returns `true` when the instruction retired.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` when the program ran off its end.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self.error, Some(ExecutionError::PcOutOfBounds))
    }
}

/// Bulk register and PC snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuStatus {
    /// General-purpose registers `x0..x31`.
    pub registers: [u32; REGISTER_COUNT],
    /// Program counter.
    pub pc: u32,
}

/// Aggregated outcome from [`Engine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Number of instructions retired during this run call.
    pub steps: u64,
    /// Last step outcome observed, `None` when no step was attempted.
    pub final_step: Option<StepOutcome>,
}

impl RunOutcome {
    /// Returns `true` when the run stopped because the program ended.
    #[must_use]
    pub const fn terminated(&self) -> bool {
        match &self.final_step {
            Some(step) => step.is_terminated(),
            None => false,
        }
    }
}

/// Deterministic trace events emitted in execution order when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// Instruction fetched.
    InstructionStart {
        /// Program counter used for this fetch.
        pc: u32,
        /// Raw instruction word.
        raw_word: u32,
    },
    /// Register written at commit.
    RegisterWrite {
        /// Destination register.
        reg: Register,
        /// Value after the write.
        value: u32,
    },
    /// Memory cell written at commit.
    MemoryWrite {
        /// Byte address of the changed cell.
        address: u32,
        /// Cell value after the write.
        value: u32,
    },
    /// Instruction retired.
    InstructionRetired {
        /// Program counter of the retired instruction.
        pc: u32,
        /// Program counter after retirement.
        next_pc: u32,
    },
    /// Step raised an error.
    ErrorRaised {
        /// Raised error.
        error: ExecutionError,
        /// Program counter active when the error was observed.
        pc: u32,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Single-core RV32IM execution engine.
///
/// Owns its register file, memory and program exclusively; callers observe
/// state through [`Engine::status`], [`Engine::memory`] and the per-step
/// [`StepOutcome`].
pub struct Engine {
    state: CoreState,
    config: CoreConfig,
    trace: Option<Box<dyn TraceSink>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

impl Engine {
    /// Creates an engine with an empty program.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        Self {
            state: CoreState::with_config(&config),
            config,
            trace: None,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Replaces the program and resets registers, PC and memory.
    pub fn load_program(&mut self, words: &[u32]) {
        self.state.program = words.to_vec();
        self.state.reset_canonical();
        debug!(words = words.len(), "program loaded");
    }

    /// Zeroes registers and PC and clears memory.
    pub fn reset(&mut self) {
        self.state.reset_canonical();
        debug!("engine reset");
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> StepOutcome {
        let sink = self
            .trace
            .as_deref_mut()
            .map(|sink| sink as &mut dyn TraceSink);
        step_one(&mut self.state, &self.config, sink)
    }

    /// Steps until the program ends, an error is raised, or `max_steps` is reached.
    pub fn run(&mut self, max_steps: u64) -> RunOutcome {
        let mut outcome = RunOutcome {
            steps: 0,
            final_step: None,
        };
        while outcome.steps < max_steps {
            let step = self.step();
            outcome.final_step = Some(step);
            if !step.is_success() {
                break;
            }
            outcome.steps += 1;
        }
        outcome
    }

    /// Returns the register and PC snapshot.
    #[must_use]
    pub const fn status(&self) -> CpuStatus {
        CpuStatus {
            registers: self.state.registers.snapshot(),
            pc: self.state.registers.pc(),
        }
    }

    /// Resizes data memory, keeping the common prefix.
    pub fn resize_memory(&mut self, words: u32) {
        self.state.memory.resize(words);
        self.config.memory_words = words;
    }

    /// Read-only view of data memory.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.state.memory
    }

    /// Loaded program words.
    #[must_use]
    pub fn program(&self) -> &[u32] {
        &self.state.program
    }

    /// Read-only view of the whole core state.
    #[must_use]
    pub const fn state(&self) -> &CoreState {
        &self.state
    }

    /// Installs a trace sink; events flow only while `tracing_enabled` is set.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    /// Enables or disables trace dispatch.
    pub const fn set_tracing_enabled(&mut self, enabled: bool) {
        self.config.tracing_enabled = enabled;
    }
}
