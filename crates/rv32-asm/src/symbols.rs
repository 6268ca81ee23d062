//! Label table and pass-1 address assignment.
//!
//! Pass 1 walks the preprocessed lines, gives every code line the byte
//! address `4 * index`, and records each label against the address of the
//! next code line. Label references in operands are then replaced by the
//! signed displacement from the referencing instruction.

use std::collections::HashMap;

use crate::source::{LineKind, SourceLine};

/// A label with its assigned address and definition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Byte address the label resolves to.
    pub address: u32,
    /// Source line where the label was defined.
    pub defined_at: usize,
}

/// Label table mapping names to their definitions.
pub type SymbolTable = HashMap<String, Symbol>;

/// Error during label table construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of label table errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolErrorKind {
    /// Duplicate label definition.
    DuplicateLabel {
        /// The label name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
}

impl std::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for SymbolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateLabel {
                name,
                first_definition,
            } => write!(
                f,
                "duplicate label '{name}' (first defined at line {first_definition})"
            ),
        }
    }
}

impl std::error::Error for SymbolError {}

/// A code line with its assigned address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedLine {
    /// Byte address of the encoded word.
    pub address: u32,
    /// Original source line number.
    pub source_line: usize,
    /// Normalized instruction text.
    pub text: String,
    /// Original line text.
    pub original: String,
}

/// Result of pass-1 address assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Code lines in program order.
    pub lines: Vec<AddressedLine>,
    /// Label table.
    pub symbols: SymbolTable,
}

/// Performs pass-1 address assignment.
///
/// # Errors
///
/// Returns a `SymbolError` at the line of the second definition when a label
/// is defined twice.
pub fn assign_addresses(lines: &[SourceLine]) -> Result<Assignment, SymbolError> {
    let mut symbols = SymbolTable::new();
    let mut addressed = Vec::new();
    let mut address: u32 = 0;

    for line in lines {
        let label = match &line.kind {
            LineKind::Blank => None,
            LineKind::Label { name } => Some(name),
            LineKind::Code { label, .. } => label.as_ref(),
        };

        if let Some(name) = label {
            if let Some(existing) = symbols.get(name) {
                return Err(SymbolError {
                    kind: SymbolErrorKind::DuplicateLabel {
                        name: name.clone(),
                        first_definition: existing.defined_at,
                    },
                    line: line.number,
                });
            }
            symbols.insert(
                name.clone(),
                Symbol {
                    address,
                    defined_at: line.number,
                },
            );
        }

        if let LineKind::Code { text, .. } = &line.kind {
            addressed.push(AddressedLine {
                address,
                source_line: line.number,
                text: text.clone(),
                original: line.original.clone(),
            });
            address = address.wrapping_add(4);
        }
    }

    Ok(Assignment {
        lines: addressed,
        symbols,
    })
}

/// Replaces label references in the operand part of `text` with their
/// displacement from `address`.
///
/// Only whole identifier tokens are replaced. The mnemonic and tokens shaped
/// like registers (`x` followed by digits) are left alone.
#[must_use]
pub fn substitute_labels(text: &str, address: u32, symbols: &SymbolTable) -> String {
    if symbols.is_empty() {
        return text.to_string();
    }
    let (mnemonic, operands) = text
        .split_once(char::is_whitespace)
        .unwrap_or((text, ""));

    let mut out = String::with_capacity(text.len());
    out.push_str(mnemonic);
    if text.len() > mnemonic.len() {
        out.push(' ');
    }

    let mut token = String::new();
    for ch in operands.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            token.push(ch);
        } else {
            flush_token(&mut out, &mut token, address, symbols);
            out.push(ch);
        }
    }
    flush_token(&mut out, &mut token, address, symbols);
    out
}

fn flush_token(out: &mut String, token: &mut String, address: u32, symbols: &SymbolTable) {
    if token.is_empty() {
        return;
    }
    match symbols.get(token.as_str()) {
        Some(symbol) if !is_register_token(token) => {
            let displacement = i64::from(symbol.address) - i64::from(address);
            out.push_str(&displacement.to_string());
        }
        _ => out.push_str(token),
    }
    token.clear();
}

fn is_register_token(token: &str) -> bool {
    token
        .strip_prefix('x')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
