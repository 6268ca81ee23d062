//! Top-level assembler pipeline.
//!
//! This module wires the phases together:
//!
//! 1. **Preprocess**: classify lines (`source::preprocess`)
//! 2. **Pass 1**: address assignment and label table (`symbols::assign_addresses`)
//! 3. **Pass 2**: label substitution, parsing and encoding (`encoder::encode_line`)
//!
//! [`assemble`] is the `Result`-returning core. [`parse`] wraps it into the
//! flat [`ParseOutcome`] snapshot consumed by front ends.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::encoder::encode_line;
use crate::errors::{ParseFailure, ParsingError};
use crate::source::{preprocess, split_source};
use crate::symbols::{assign_addresses, SymbolErrorKind};

/// An entry in the address-to-source listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Byte address of the word.
    pub address: u32,
    /// Encoded word.
    pub word: u32,
    /// 1-based source line.
    pub source_line: usize,
    /// Trimmed source text.
    pub source: String,
}

/// A successfully assembled program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    /// Encoded words in program order.
    pub words: Vec<u32>,
    /// `source_lines[i]` is the 1-based source line of `words[i]`.
    pub source_lines: Vec<usize>,
    /// Address-to-source listing.
    pub listing: Vec<ListingEntry>,
}

impl Program {
    /// Source line of the instruction at `index`, if any.
    #[must_use]
    pub fn source_line_of(&self, index: usize) -> Option<usize> {
        self.source_lines.get(index).copied()
    }
}

/// Flat result of one assembly pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOutcome {
    /// Encoded words; empty on failure.
    pub words: Vec<u32>,
    /// Source line of each encoded word.
    pub source_lines: Vec<usize>,
    /// First failure, if any.
    pub failure: Option<ParseFailure>,
}

impl ParseOutcome {
    /// Returns `true` when every line assembled.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

impl From<Result<Program, ParseFailure>> for ParseOutcome {
    fn from(result: Result<Program, ParseFailure>) -> Self {
        match result {
            Ok(program) => Self {
                words: program.words,
                source_lines: program.source_lines,
                failure: None,
            },
            Err(failure) => Self {
                failure: Some(failure),
                ..Self::default()
            },
        }
    }
}

/// Error from assembling a file.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The input could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Input path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The source did not assemble.
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

/// Assembles source lines into a program.
///
/// # Errors
///
/// Returns the first `ParseFailure` encountered, or
/// [`ParsingError::EmptyInput`] when no instruction survives preprocessing.
pub fn assemble<S: AsRef<str>>(lines: &[S]) -> Result<Program, ParseFailure> {
    let prepared = preprocess(lines);
    let assignment = assign_addresses(&prepared).map_err(|error| {
        let fragment = prepared
            .get(error.line.saturating_sub(1))
            .map_or("", |line| line.original.as_str());
        match error.kind {
            SymbolErrorKind::DuplicateLabel { .. } => {
                ParseFailure::new(error.line, fragment, ParsingError::DuplicateLabel, None)
            }
        }
    })?;
    debug!(
        labels = assignment.symbols.len(),
        code_lines = assignment.lines.len(),
        "pass 1 complete"
    );

    if assignment.lines.is_empty() {
        return Err(ParseFailure::empty_input());
    }

    let mut program = Program::default();
    for line in &assignment.lines {
        let encoded = encode_line(line, &assignment.symbols)?;
        program.words.push(encoded.word);
        program.source_lines.push(encoded.source_line);
        program.listing.push(ListingEntry {
            address: line.address,
            word: encoded.word,
            source_line: encoded.source_line,
            source: line.original.trim().to_string(),
        });
    }
    debug!(words = program.words.len(), "pass 2 complete");
    Ok(program)
}

/// Assembles source lines into a flat [`ParseOutcome`].
#[must_use]
pub fn parse<S: AsRef<str>>(lines: &[S]) -> ParseOutcome {
    let outcome = ParseOutcome::from(assemble(lines));
    if let Some(failure) = &outcome.failure {
        debug!(line = failure.line, kind = %failure.kind, "assembly failed");
    }
    outcome
}

/// Assembles multi-line source text.
///
/// # Errors
///
/// See [`assemble`].
pub fn assemble_source(source: &str) -> Result<Program, ParseFailure> {
    assemble(&split_source(source))
}

/// Reads and assembles a source file.
///
/// # Errors
///
/// Returns [`AssembleError::Io`] when the file cannot be read and
/// [`AssembleError::Parse`] when it does not assemble.
pub fn assemble_file(path: &Path) -> Result<Program, AssembleError> {
    let source = std::fs::read_to_string(path).map_err(|source| AssembleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = source.len(), "read source");
    Ok(assemble_source(&source)?)
}
