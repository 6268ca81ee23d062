//! Instruction disassembly for RV32I + M.
//!
//! Renders decoded words back into the canonical assembly syntax accepted by
//! the assembler, so a listing can be fed straight back in.

use crate::decoder::{Decoder, Instruction};
use crate::encoding::Format;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Byte address of this instruction (`4 * index`).
    pub address: u32,
    /// Raw instruction word.
    pub raw_word: u32,
    /// Canonical text, or `.word 0x????????` for unsupported words.
    pub text: String,
    /// Whether the word decodes to a supported instruction.
    pub is_supported: bool,
}

/// Formats a decoded instruction in canonical syntax.
#[must_use]
pub fn format_instruction(instr: &Instruction) -> String {
    let name = instr.mnemonic.name();
    let Instruction {
        rd, rs1, rs2, imm, ..
    } = *instr;
    match instr.mnemonic.format() {
        Format::R => format!("{name} {rd}, {rs1}, {rs2}"),
        Format::I | Format::IShift => format!("{name} {rd}, {rs1}, {imm}"),
        Format::Load | Format::Jalr => format!("{name} {rd}, {imm}({rs1})"),
        Format::S => format!("{name} {rs2}, {imm}({rs1})"),
        Format::B => format!("{name} {rs1}, {rs2}, {imm}"),
        Format::U | Format::J => format!("{name} {rd}, {imm}"),
    }
}

/// Disassembles one word, or `None` when it is unsupported.
#[must_use]
pub fn disassemble(word: u32) -> Option<String> {
    Decoder::decode(word).ok().map(|instr| format_instruction(&instr))
}

/// Disassembles a whole program, one row per word.
#[must_use]
pub fn disassemble_program(words: &[u32]) -> Vec<DisassemblyRow> {
    words
        .iter()
        .zip((0u32..).step_by(4))
        .map(|(&raw_word, address)| match disassemble(raw_word) {
            Some(text) => DisassemblyRow {
                address,
                raw_word,
                text,
                is_supported: true,
            },
            None => DisassemblyRow {
                address,
                raw_word,
                text: format!(".word {raw_word:#010x}"),
                is_supported: false,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{disassemble, disassemble_program};

    #[rstest]
    #[case(0b0000_0001_1111_0100_0000_0010_1011_0011, "add x5, x8, x31")]
    #[case(0b0000_0100_1101_1000_1010_0111_1000_0011, "lw x15, 77(x17)")]
    #[case(0b1111_1000_1111_1000_1010_1110_1010_0011, "sw x15, -99(x17)")]
    #[case(0b0000_0110_1100_0110_1000_1101_0110_0011, "beq x13, x12, 122")]
    #[case(0b0111_1111_1111_1111_1111_0111_1011_0111, "lui x15, 524287")]
    #[case(0b0000_0100_1101_1000_1000_0111_1110_0111, "jalr x15, 77(x17)")]
    #[case(0b0000_0111_1010_0000_0000_0111_1110_1111, "jal x15, 122")]
    #[case(0x4072_5193, "srai x3, x4, 7")]
    fn renders_canonical_syntax(#[case] word: u32, #[case] expected: &str) {
        assert_eq!(disassemble(word).as_deref(), Some(expected));
    }

    #[test]
    fn unsupported_words_render_as_data() {
        assert_eq!(disassemble(0), None);
        let rows = disassemble_program(&[0x0010_0093, 0xFFFF_FFFF]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "addi x1, x0, 1");
        assert!(rows[0].is_supported);
        assert_eq!(rows[1].address, 4);
        assert_eq!(rows[1].text, ".word 0xffffffff");
        assert!(!rows[1].is_supported);
    }
}
