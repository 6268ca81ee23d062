//! Instruction encoding (pass 2) and output serialization.
//!
//! Each addressed code line has its label references substituted, is parsed
//! against the instruction table, and is packed through the core's shared
//! bit layout so the engine decodes exactly what was assembled.

use rv32_core::Instruction;

use crate::errors::ParseFailure;
use crate::parser::parse_instruction;
use crate::symbols::{substitute_labels, AddressedLine, SymbolTable};

/// Encoded output for a single code line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedOutput {
    /// The instruction word.
    pub word: u32,
    /// Source line number.
    pub source_line: usize,
}

/// Packs a parsed instruction into its machine word.
#[must_use]
pub const fn encode_instruction(instruction: &Instruction) -> u32 {
    instruction.encode()
}

/// Encodes one addressed code line.
///
/// # Errors
///
/// Returns a `ParseFailure` at the line's source position when the line does
/// not parse.
pub fn encode_line(
    line: &AddressedLine,
    symbols: &SymbolTable,
) -> Result<EncodedOutput, ParseFailure> {
    let resolved = substitute_labels(&line.text, line.address, symbols);
    let instruction = parse_instruction(&resolved).map_err(|error| {
        ParseFailure::new(line.source_line, &line.original, error.kind, error.mnemonic)
    })?;
    Ok(EncodedOutput {
        word: encode_instruction(&instruction),
        source_line: line.source_line,
    })
}

/// Serializes words as little-endian bytes.
#[must_use]
pub fn words_to_le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// Renders a word as a 32-character binary string, most significant bit first.
#[must_use]
pub fn format_binary_word(word: u32) -> String {
    format!("{word:032b}")
}

/// Renders words one binary string per line.
#[must_use]
pub fn words_to_text(words: &[u32]) -> String {
    words
        .iter()
        .map(|&word| format_binary_word(word) + "\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use rv32_core::{Decoder, Mnemonic};

    use super::{encode_line, format_binary_word, words_to_le_bytes, words_to_text};
    use crate::errors::ParsingError;
    use crate::parser::parse_instruction;
    use crate::symbols::{AddressedLine, Symbol, SymbolTable};

    fn line(text: &str, address: u32) -> AddressedLine {
        AddressedLine {
            address,
            source_line: 9,
            text: text.to_string(),
            original: format!("  {text}  "),
        }
    }

    #[test]
    fn encodes_reference_vectors() {
        let symbols = SymbolTable::new();
        let cases = [
            ("add x5, x8, x31", 0b0000_0001_1111_0100_0000_0010_1011_0011),
            ("sub x5, x8, x31", 0b0100_0001_1111_0100_0000_0010_1011_0011),
            ("addi x2, x0, -2048", 0b1000_0000_0000_0000_0000_0001_0001_0011),
            ("srai x3, x4, 7", 0x4072_5193),
            ("sw x1, 4(x0)", 0x0010_2223),
        ];
        for (text, expected) in cases {
            let encoded = encode_line(&line(text, 0), &symbols).expect("valid line");
            assert_eq!(
                encoded.word,
                expected,
                "{text}: {}",
                format_binary_word(encoded.word)
            );
            assert_eq!(encoded.source_line, 9);
        }
    }

    #[test]
    fn labels_resolve_relative_to_the_line_address() {
        let mut symbols = SymbolTable::new();
        symbols.insert(
            "top".into(),
            Symbol {
                address: 0,
                defined_at: 1,
            },
        );
        let encoded = encode_line(&line("bne x1, x2, top", 8), &symbols).expect("valid line");
        let decoded = Decoder::decode(encoded.word).expect("decodes");
        assert_eq!(decoded.mnemonic, Mnemonic::Bne);
        assert_eq!(decoded.imm, -8);
    }

    #[test]
    fn failure_carries_original_fragment() {
        let failure =
            encode_line(&line("addi x1, x0, 9999", 0), &SymbolTable::new()).expect_err("range");
        assert_eq!(failure.line, 9);
        assert_eq!(failure.fragment, "addi x1, x0, 9999");
        assert_eq!(failure.kind, ParsingError::ImmediateOutOfBounds);
        assert_eq!(failure.mnemonic, Some(Mnemonic::Addi));
    }

    #[test]
    fn odd_branch_displacement_drops_bit_zero() {
        let instruction = parse_instruction("beq x0, x0, 7").expect("in range");
        let decoded = Decoder::decode(instruction.encode()).expect("decodes");
        assert_eq!(decoded.imm, 6);
    }

    #[test]
    fn serializes_little_endian_and_text() {
        assert_eq!(
            words_to_le_bytes(&[0x0010_0093, 0x6F]),
            vec![0x93, 0x00, 0x10, 0x00, 0x6F, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            words_to_text(&[0x6F]),
            "00000000000000000000000001101111\n"
        );
    }
}
