use rv32_asm::{parse, ParseFailure};
use rv32_core::{
    CoreConfig, CpuStatus, Engine, ExecutionError, MemoryChange, RegisterChange, StepOutcome,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&JsValue::from_str(&format!($($t)*))))
}

/// JS-compatible view of an assembly failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmParseError {
    pub line: usize,
    pub fragment: String,
    pub kind: String,
    pub code: u8,
    pub message: String,
    pub usage: Option<String>,
}

impl From<&ParseFailure> for WasmParseError {
    fn from(failure: &ParseFailure) -> Self {
        Self {
            line: failure.line,
            fragment: failure.fragment.clone(),
            kind: format!("{:?}", failure.kind),
            code: failure.kind.as_u8(),
            message: failure.format_for_stderr(),
            usage: failure.usage().map(str::to_string),
        }
    }
}

/// JS-compatible version of ParseOutcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmParseOutcome {
    pub success: bool,
    pub words: Vec<u32>,
    pub source_lines: Vec<usize>,
    pub error: Option<WasmParseError>,
}

/// JS-compatible version of StepOutcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmStepOutcome {
    pub success: bool,
    pub terminated: bool,
    pub error: Option<ExecutionError>,
    pub error_code: Option<u8>,
    pub memory_change: Option<MemoryChange>,
    pub register_change: Option<RegisterChange>,
    pub pc: u32,
    pub error_index: Option<usize>,
    /// Source line of the failing instruction when the program came from `assemble`.
    pub source_line: Option<usize>,
}

#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
    source_lines: Vec<usize>,
}

impl WasmEngine {
    /// Creates an engine with `memory_words` words of data memory.
    #[must_use]
    pub fn with_memory_words(memory_words: u32) -> Self {
        Self {
            engine: Engine::new(CoreConfig {
                memory_words,
                ..CoreConfig::default()
            }),
            source_lines: Vec::new(),
        }
    }

    /// Assembles `source`; on success the program is loaded and the engine reset.
    pub fn assemble_view(&mut self, source: &str) -> WasmParseOutcome {
        let lines: Vec<&str> = source.lines().collect();
        let outcome = parse(&lines);
        if outcome.is_success() {
            self.engine.load_program(&outcome.words);
            self.source_lines.clone_from(&outcome.source_lines);
        }
        WasmParseOutcome {
            success: outcome.is_success(),
            error: outcome.failure.as_ref().map(WasmParseError::from),
            words: outcome.words,
            source_lines: outcome.source_lines,
        }
    }

    /// Loads raw words with no source mapping.
    pub fn load_words(&mut self, words: &[u32]) {
        self.engine.load_program(words);
        self.source_lines.clear();
    }

    /// Executes one instruction.
    pub fn step_view(&mut self) -> WasmStepOutcome {
        let outcome = self.engine.step();
        self.view_of(&outcome)
    }

    /// Register and PC snapshot.
    #[must_use]
    pub const fn status_view(&self) -> CpuStatus {
        self.engine.status()
    }

    /// Data memory cells.
    #[must_use]
    pub fn memory_cells(&self) -> &[u32] {
        self.engine.memory().cells()
    }

    fn view_of(&self, outcome: &StepOutcome) -> WasmStepOutcome {
        WasmStepOutcome {
            success: outcome.is_success(),
            terminated: outcome.is_terminated(),
            error: outcome.error,
            error_code: outcome.error.map(ExecutionError::as_u8),
            memory_change: outcome.memory_change,
            register_change: outcome.register_change,
            pc: outcome.pc,
            error_index: outcome.error_index,
            source_line: outcome
                .error_index
                .and_then(|index| self.source_lines.get(index).copied()),
        }
    }
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(memory_words: u32) -> Self {
        console_error_panic_hook::set_once();
        Self::with_memory_words(memory_words)
    }

    /// Assembles source text and returns the parse outcome as a JSON object.
    pub fn assemble(&mut self, source: &str) -> Result<JsValue, JsValue> {
        let outcome = self.assemble_view(source);
        console_log!("Assembled {} words", outcome.words.len());
        Ok(serde_wasm_bindgen::to_value(&outcome)?)
    }

    /// Loads a program of instruction words.
    pub fn load_program(&mut self, words: &[u32]) {
        self.load_words(words);
        console_log!("Loaded {} words", words.len());
    }

    /// Resets registers, PC and memory. The program is kept.
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Executes a single instruction.
    /// Returns the step outcome as a JSON object.
    pub fn step(&mut self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.step_view())?)
    }

    /// Returns registers and PC as a JSON object.
    pub fn status(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.status_view())?)
    }

    /// Returns the memory contents as a Uint32Array copy.
    #[must_use]
    pub fn memory(&self) -> js_sys::Uint32Array {
        js_sys::Uint32Array::from(self.memory_cells())
    }

    /// Resizes data memory, preserving the common prefix.
    pub fn resize_memory(&mut self, memory_words: u32) {
        self.engine.resize_memory(memory_words);
    }
}
