//! Assembly-time error taxonomy and user-facing rendering.
//!
//! The assembler stops at the first failing line. A [`ParseFailure`] carries
//! everything needed to point at it: the 1-based line, the offending source
//! fragment, the error kind, and the mnemonic when it was resolved before the
//! failure.
//!
//! # Error Format
//!
//! ```text
//! Error at line 3: immediate out of bounds
//!   addi x1, x0, 4096
//!   usage: addi rd, rs1, imm # rd = rs1 + imm
//! ```

use rv32_core::{ExecutionError, Mnemonic};
use thiserror::Error;

/// Assembly-time error kinds with stable numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u8)]
pub enum ParsingError {
    /// Mnemonic token is not 2 to 6 ASCII letters.
    #[error("invalid opcode")]
    InvalidOpcode = 1,
    /// Empty operand or unbalanced `offset(reg)` parentheses.
    #[error("invalid operands")]
    InvalidOperands = 2,
    /// Operand count differs from the mnemonic's operand slots.
    #[error("invalid operand count")]
    InvalidOperandCount = 3,
    /// Register operand not of the form `x<n>`.
    #[error("invalid register format")]
    InvalidRegisterFormat = 4,
    /// Register number outside `0..=31`.
    #[error("register out of bounds")]
    RegisterOutOfBounds = 5,
    /// Branch or jump displacement does not fit its field.
    #[error("offset out of bounds")]
    OffsetOutOfBounds = 6,
    /// Immediate does not fit its field.
    #[error("immediate out of bounds")]
    ImmediateOutOfBounds = 7,
    /// Branch or jump displacement is not a valid literal.
    #[error("invalid offset format")]
    InvalidOffsetFormat = 8,
    /// Immediate is not a valid literal.
    #[error("invalid immediate format")]
    InvalidImmediateFormat = 9,
    /// Well-formed mnemonic that is not in the instruction table.
    #[error("opcode not found")]
    OpcodeNotFound = 10,
    /// No instruction survived preprocessing.
    #[error("empty input")]
    EmptyInput = 11,
    /// A label was defined more than once.
    #[error("duplicate label definition")]
    DuplicateLabel = 12,
}

impl ParsingError {
    /// Converts an error to its stable numeric code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable numeric code back into an error.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::InvalidOpcode),
            2 => Some(Self::InvalidOperands),
            3 => Some(Self::InvalidOperandCount),
            4 => Some(Self::InvalidRegisterFormat),
            5 => Some(Self::RegisterOutOfBounds),
            6 => Some(Self::OffsetOutOfBounds),
            7 => Some(Self::ImmediateOutOfBounds),
            8 => Some(Self::InvalidOffsetFormat),
            9 => Some(Self::InvalidImmediateFormat),
            10 => Some(Self::OpcodeNotFound),
            11 => Some(Self::EmptyInput),
            12 => Some(Self::DuplicateLabel),
            _ => None,
        }
    }
}

/// The first failure of an assembly pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseFailure {
    /// 1-based source line, or 0 for [`ParsingError::EmptyInput`].
    pub line: usize,
    /// Trimmed original text of the failing line.
    pub fragment: String,
    /// What went wrong.
    pub kind: ParsingError,
    /// Mnemonic of the failing line, when it was recognized.
    pub mnemonic: Option<Mnemonic>,
}

impl ParseFailure {
    /// Creates a failure for `line` with the original `fragment`.
    #[must_use]
    pub fn new(
        line: usize,
        fragment: &str,
        kind: ParsingError,
        mnemonic: Option<Mnemonic>,
    ) -> Self {
        Self {
            line,
            fragment: fragment.trim().to_string(),
            kind,
            mnemonic,
        }
    }

    /// Failure for a source with no instructions.
    #[must_use]
    pub const fn empty_input() -> Self {
        Self {
            line: 0,
            fragment: String::new(),
            kind: ParsingError::EmptyInput,
            mnemonic: None,
        }
    }

    /// Canonical usage string of the failing mnemonic, if known.
    #[must_use]
    pub fn usage(&self) -> Option<&'static str> {
        self.mnemonic.map(Mnemonic::usage)
    }

    /// Formats the failure for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        let mut out = format!("Error at line {}: {}", self.line, self.kind);
        if !self.fragment.is_empty() {
            out.push_str("\n  ");
            out.push_str(&self.fragment);
        }
        if let Some(usage) = self.usage() {
            out.push_str("\n  usage: ");
            out.push_str(usage);
        }
        out
    }
}

/// Renders an execution error against the source line of the failing instruction.
#[must_use]
pub fn render_execution_error(error: ExecutionError, line: usize) -> String {
    format!("Error at line {line}: {error}")
}
