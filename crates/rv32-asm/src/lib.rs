//! RV32IM assembler library.

/// Top-level two-pass assembler pipeline.
pub mod assembler;
pub use assembler::{
    assemble, assemble_file, assemble_source, parse, AssembleError, ListingEntry, ParseOutcome,
    Program,
};
/// Instruction encoding and output serialization.
pub mod encoder;
/// Assembly-time error taxonomy and rendering.
pub mod errors;
pub use errors::{render_execution_error, ParseFailure, ParsingError};
/// Subscriber setup for the command-line front end.
pub mod logging;
/// Mnemonic resolution against the core instruction table.
pub mod mnemonic;
/// Instruction-line parser.
pub mod parser;
/// Line preprocessing.
pub mod source;
/// Label table and pass-1 address assignment.
pub mod symbols;
