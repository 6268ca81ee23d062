//! Architectural CPU state model primitives.

/// Register identifiers and the register file.
pub mod registers;

pub use registers::{Register, RegisterFile, REGISTER_COUNT};
