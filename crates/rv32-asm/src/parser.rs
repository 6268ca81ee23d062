//! Instruction-line parser.
//!
//! Turns one normalized, label-free code line into a core [`Instruction`].
//! The `offset(reg)` sugar of loads, stores and `jalr` is rewritten to a
//! third comma-separated operand before the operands are matched against
//! the mnemonic's slots in the instruction table.

use std::num::IntErrorKind;

use rv32_core::{Instruction, Mnemonic, OperandSlot, Register};

use crate::errors::ParsingError;
use crate::mnemonic::{is_well_formed_mnemonic, resolve_mnemonic};

/// Error from parsing a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// Kind of error.
    pub kind: ParsingError,
    /// Mnemonic, when it resolved before the error.
    pub mnemonic: Option<Mnemonic>,
}

impl ParseError {
    const fn bare(kind: ParsingError) -> Self {
        Self {
            kind,
            mnemonic: None,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mnemonic {
            Some(mnemonic) => write!(f, "{}: {}", mnemonic, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ParseError {}

/// Why a numeric literal was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralError {
    /// Not a decimal, `0x` or `0b` literal.
    Malformed,
    /// Well-formed but does not fit in `i64`.
    Overflow,
}

/// Parses an instruction line.
///
/// # Errors
///
/// Returns a `ParseError` naming the first problem found: mnemonic shape,
/// unknown mnemonic, operand structure, operand count, then each operand in
/// slot order.
pub fn parse_instruction(text: &str) -> Result<Instruction, ParseError> {
    let text = text.trim();
    let (token, rest) = text
        .split_once(char::is_whitespace)
        .unwrap_or((text, ""));

    if !is_well_formed_mnemonic(token) {
        return Err(ParseError::bare(ParsingError::InvalidOpcode));
    }
    let mnemonic =
        resolve_mnemonic(token).ok_or(ParseError::bare(ParsingError::OpcodeNotFound))?;
    let fail = |kind| ParseError {
        kind,
        mnemonic: Some(mnemonic),
    };

    let operands = split_operands(rest).map_err(fail)?;
    let slots = mnemonic.format().operands();
    if operands.len() != slots.len() {
        return Err(fail(ParsingError::InvalidOperandCount));
    }

    let mut instruction = Instruction {
        mnemonic,
        rd: Register::ZERO,
        rs1: Register::ZERO,
        rs2: Register::ZERO,
        imm: 0,
    };
    for (slot, operand) in slots.iter().zip(&operands) {
        match *slot {
            OperandSlot::Rd => instruction.rd = parse_register(operand).map_err(fail)?,
            OperandSlot::Rs1 => instruction.rs1 = parse_register(operand).map_err(fail)?,
            OperandSlot::Rs2 => instruction.rs2 = parse_register(operand).map_err(fail)?,
            OperandSlot::Immediate { .. } | OperandSlot::Offset { .. } => {
                instruction.imm = parse_immediate(operand, *slot).map_err(fail)?;
            }
        }
    }
    Ok(instruction)
}

/// Normalizes `offset(reg)` and splits the operand text on commas.
///
/// Whitespace inside operands is ignored. An empty operand list yields no
/// operands.
///
/// # Errors
///
/// Returns [`ParsingError::InvalidOperands`] for an empty operand between
/// commas or unbalanced parentheses.
pub fn split_operands(text: &str) -> Result<Vec<String>, ParsingError> {
    let mut normalized = String::with_capacity(text.len());
    let mut depth = 0u8;
    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        match ch {
            '(' if depth == 0 => {
                depth = 1;
                normalized.push(',');
            }
            ')' if depth == 1 => depth = 0,
            '(' | ')' => return Err(ParsingError::InvalidOperands),
            _ => normalized.push(ch),
        }
    }
    if depth != 0 {
        return Err(ParsingError::InvalidOperands);
    }
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    let operands: Vec<String> = normalized.split(',').map(str::to_string).collect();
    if operands.iter().any(String::is_empty) {
        return Err(ParsingError::InvalidOperands);
    }
    Ok(operands)
}

/// Parses a register operand of the form `x<0-31>`.
///
/// # Errors
///
/// [`ParsingError::InvalidRegisterFormat`] for text that is not `x` followed
/// by ASCII digits (signs included), [`ParsingError::RegisterOutOfBounds`]
/// for numbers outside `0..=31`.
pub fn parse_register(token: &str) -> Result<Register, ParsingError> {
    let number = token
        .strip_prefix('x')
        .ok_or(ParsingError::InvalidRegisterFormat)?;
    match parse_unsigned_decimal(number) {
        Ok(value) => u8::try_from(value)
            .ok()
            .and_then(Register::new)
            .ok_or(ParsingError::RegisterOutOfBounds),
        Err(LiteralError::Overflow) => Err(ParsingError::RegisterOutOfBounds),
        Err(LiteralError::Malformed) => Err(ParsingError::InvalidRegisterFormat),
    }
}

/// Parses an immediate or displacement and checks it against the slot bounds.
///
/// # Errors
///
/// Immediate slots report [`ParsingError::InvalidImmediateFormat`] or
/// [`ParsingError::ImmediateOutOfBounds`]; offset slots report the
/// `*_OFFSET_*` equivalents. Register slots are rejected as malformed.
pub fn parse_immediate(token: &str, slot: OperandSlot) -> Result<i32, ParsingError> {
    let (malformed, out_of_bounds) = match slot {
        OperandSlot::Offset { .. } => (
            ParsingError::InvalidOffsetFormat,
            ParsingError::OffsetOutOfBounds,
        ),
        _ => (
            ParsingError::InvalidImmediateFormat,
            ParsingError::ImmediateOutOfBounds,
        ),
    };
    let (min, max) = slot.bounds().ok_or(malformed)?;
    let value = parse_literal(token).map_err(|error| match error {
        LiteralError::Malformed => malformed,
        LiteralError::Overflow => out_of_bounds,
    })?;
    if !(min..=max).contains(&value) {
        return Err(out_of_bounds);
    }
    i32::try_from(value).map_err(|_| out_of_bounds)
}

/// Parses a decimal, `0x` hexadecimal or `0b` binary literal with an
/// optional leading `-`.
///
/// # Errors
///
/// Returns a `LiteralError` for malformed text or values outside `i64`.
pub fn parse_literal(token: &str) -> Result<i64, LiteralError> {
    let (negative, body) = token
        .strip_prefix('-')
        .map_or((false, token), |rest| (true, rest));

    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x") {
        (16, hex)
    } else if let Some(bin) = body.strip_prefix("0b") {
        (2, bin)
    } else {
        (10, body)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(LiteralError::Malformed);
    }
    let signed = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    i64::from_str_radix(&signed, radix).map_err(|error| match error.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => LiteralError::Overflow,
        _ => LiteralError::Malformed,
    })
}

fn parse_unsigned_decimal(token: &str) -> Result<u64, LiteralError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LiteralError::Malformed);
    }
    token.parse::<u64>().map_err(|_| LiteralError::Overflow)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;
    use rv32_core::{Mnemonic, OperandSlot, Register};

    use super::{
        parse_immediate, parse_instruction, parse_literal, parse_register, split_operands,
        LiteralError, ParseError,
    };
    use crate::errors::ParsingError;

    const IMM12: OperandSlot = OperandSlot::Immediate {
        bits: 12,
        signed: true,
    };
    const SHAMT: OperandSlot = OperandSlot::Immediate {
        bits: 5,
        signed: false,
    };
    const BRANCH: OperandSlot = OperandSlot::Offset { bits: 13 };

    fn kind_of(text: &str) -> ParsingError {
        parse_instruction(text).expect_err("line should fail").kind
    }

    #[test]
    fn parses_register_and_memory_forms() {
        let add = parse_instruction("add x5, x8, x31").expect("valid");
        assert_eq!(add.mnemonic, Mnemonic::Add);
        assert_eq!(add.rd.number(), 5);
        assert_eq!(add.rs1.number(), 8);
        assert_eq!(add.rs2.number(), 31);

        let lw = parse_instruction("lw x15, 77(x17)").expect("valid");
        assert_eq!(lw.rd.number(), 15);
        assert_eq!(lw.rs1.number(), 17);
        assert_eq!(lw.imm, 77);

        let sw = parse_instruction("sw x15,-99( x17 )").expect("valid");
        assert_eq!(sw.rs2.number(), 15);
        assert_eq!(sw.rs1.number(), 17);
        assert_eq!(sw.imm, -99);
    }

    #[test]
    fn explicit_third_operand_matches_offset_sugar() {
        assert_eq!(
            parse_instruction("jalr x1, 8, x2"),
            parse_instruction("jalr x1, 8(x2)")
        );
    }

    #[rstest]
    #[case("a x1, x2, x3", ParsingError::InvalidOpcode)]
    #[case("addxyzw x1, x2, x3", ParsingError::InvalidOpcode)]
    #[case("ad1 x1, x2, x3", ParsingError::InvalidOpcode)]
    #[case("nop x1", ParsingError::OpcodeNotFound)]
    #[case("add x1,, x3", ParsingError::InvalidOperands)]
    #[case("lw x1, 4(x2", ParsingError::InvalidOperands)]
    #[case("lw x1, 4)x2(", ParsingError::InvalidOperands)]
    #[case("add x1, x2", ParsingError::InvalidOperandCount)]
    #[case("add", ParsingError::InvalidOperandCount)]
    #[case("lui x1, 1, 2", ParsingError::InvalidOperandCount)]
    #[case("add xb, x1, x2", ParsingError::InvalidRegisterFormat)]
    #[case("add r1, x1, x2", ParsingError::InvalidRegisterFormat)]
    #[case("add x32, x1, x2", ParsingError::RegisterOutOfBounds)]
    #[case("add x-1, x1, x2", ParsingError::InvalidRegisterFormat)]
    #[case("add x1, x-0, x2", ParsingError::InvalidRegisterFormat)]
    #[case("add x1, x+1, x2", ParsingError::InvalidRegisterFormat)]
    #[case("addi x2, x0, -2049", ParsingError::ImmediateOutOfBounds)]
    #[case("addi x2, x0, 2048", ParsingError::ImmediateOutOfBounds)]
    #[case("slli x1, x1, 77", ParsingError::ImmediateOutOfBounds)]
    #[case("slli x1, x1, -1", ParsingError::ImmediateOutOfBounds)]
    #[case("auipc x1, 524288", ParsingError::ImmediateOutOfBounds)]
    #[case("addi x1, x0, 0x", ParsingError::InvalidImmediateFormat)]
    #[case("addi x1, x0, 12abc", ParsingError::InvalidImmediateFormat)]
    #[case("beq x1, x2, 4096", ParsingError::OffsetOutOfBounds)]
    #[case("jal x1, 1048576", ParsingError::OffsetOutOfBounds)]
    #[case("beq x1, x2, nowhere", ParsingError::InvalidOffsetFormat)]
    fn reports_error_kinds(#[case] text: &str, #[case] expected: ParsingError) {
        assert_eq!(kind_of(text), expected);
    }

    #[test]
    fn mnemonic_is_attached_once_resolved() {
        assert_eq!(
            parse_instruction("addi x1, x0, 5000"),
            Err(ParseError {
                kind: ParsingError::ImmediateOutOfBounds,
                mnemonic: Some(Mnemonic::Addi),
            })
        );
        assert_eq!(
            parse_instruction("frob x1").map_err(|e| e.mnemonic),
            Err(None)
        );
    }

    #[rstest]
    #[case("x0", 0)]
    #[case("x31", 31)]
    #[case("x007", 7)]
    fn parses_registers(#[case] token: &str, #[case] number: u8) {
        assert_eq!(parse_register(token), Ok(Register::new(number).expect("valid")));
    }

    #[rstest]
    #[case("x-0", ParsingError::InvalidRegisterFormat)]
    #[case("x-1", ParsingError::InvalidRegisterFormat)]
    #[case("x+3", ParsingError::InvalidRegisterFormat)]
    #[case("x", ParsingError::InvalidRegisterFormat)]
    #[case("x32", ParsingError::RegisterOutOfBounds)]
    #[case("x99999999999999999999999", ParsingError::RegisterOutOfBounds)]
    fn rejects_malformed_registers(#[case] token: &str, #[case] expected: ParsingError) {
        assert_eq!(parse_register(token), Err(expected));
    }

    #[rstest]
    #[case("0", Ok(0))]
    #[case("-2048", Ok(-2048))]
    #[case("0x7ff", Ok(0x7FF))]
    #[case("-0x800", Ok(-0x800))]
    #[case("0b101", Ok(5))]
    #[case("-0b1", Ok(-1))]
    #[case("+5", Err(LiteralError::Malformed))]
    #[case("0b102", Err(LiteralError::Malformed))]
    #[case("0x", Err(LiteralError::Malformed))]
    #[case("-", Err(LiteralError::Malformed))]
    #[case("99999999999999999999", Err(LiteralError::Overflow))]
    fn literal_forms(#[case] token: &str, #[case] expected: Result<i64, LiteralError>) {
        assert_eq!(parse_literal(token), expected);
    }

    #[test]
    fn slot_bounds_select_error_vocabulary() {
        assert_eq!(parse_immediate("-2048", IMM12), Ok(-2048));
        assert_eq!(parse_immediate("31", SHAMT), Ok(31));
        assert_eq!(parse_immediate("-4096", BRANCH), Ok(-4096));
        assert_eq!(
            parse_immediate("4096", BRANCH),
            Err(ParsingError::OffsetOutOfBounds)
        );
        assert_eq!(
            parse_immediate("1_000", IMM12),
            Err(ParsingError::InvalidImmediateFormat)
        );
        assert_eq!(
            parse_immediate("1", OperandSlot::Rd),
            Err(ParsingError::InvalidImmediateFormat)
        );
    }

    #[test]
    fn splitting_handles_empty_and_sugar() {
        assert_eq!(split_operands("   "), Ok(Vec::new()));
        assert_eq!(
            split_operands("x1, 4(x2)"),
            Ok(vec!["x1".to_string(), "4".to_string(), "x2".to_string()])
        );
        assert_eq!(split_operands("x1,"), Err(ParsingError::InvalidOperands));
    }

    proptest! {
        #[test]
        fn any_in_range_addi_immediate_parses(imm in -2048i32..=2047) {
            let parsed = parse_instruction(&format!("addi x1, x2, {imm}"));
            prop_assert_eq!(parsed.map(|instr| instr.imm), Ok(imm));
        }

        #[test]
        fn decimal_and_hex_spellings_agree(value in 0i64..=0xFFFF_FFFF) {
            prop_assert_eq!(parse_literal(&value.to_string()), Ok(value));
            prop_assert_eq!(parse_literal(&format!("{value:#x}")), Ok(value));
            prop_assert_eq!(parse_literal(&format!("-{value:#b}")), Ok(-value));
        }
    }
}
