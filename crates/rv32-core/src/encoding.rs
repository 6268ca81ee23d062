//! Instruction table for the supported RV32I and RV32M mnemonics.
//!
//! [`INSTRUCTION_TABLE`] maps every [`Mnemonic`] to its format family,
//! opcode, funct3/funct7 selectors, operand slots and usage string. The
//! assembler resolves names against it and the decoder classifies words
//! against it; neither keeps format knowledge of its own.

use crate::layout;

/// Primary 7-bit opcodes.
pub mod opcode {
    /// Register-register ALU and M-extension operations.
    pub const OP: u8 = 0b011_0011;
    /// Register-immediate ALU operations.
    pub const OP_IMM: u8 = 0b001_0011;
    /// Loads.
    pub const LOAD: u8 = 0b000_0011;
    /// Stores.
    pub const STORE: u8 = 0b010_0011;
    /// Conditional branches.
    pub const BRANCH: u8 = 0b110_0011;
    /// Load upper immediate.
    pub const LUI: u8 = 0b011_0111;
    /// Add upper immediate to PC.
    pub const AUIPC: u8 = 0b001_0111;
    /// Jump and link.
    pub const JAL: u8 = 0b110_1111;
    /// Jump and link register.
    pub const JALR: u8 = 0b110_0111;
}

/// funct7 selectors for R-type and shift-immediate encodings.
pub mod funct7 {
    /// Base integer operation.
    pub const BASE: u8 = 0b000_0000;
    /// `SUB`, `SRA` and `SRAI`.
    pub const ALT: u8 = 0b010_0000;
    /// M-extension multiply/divide.
    pub const MULDIV: u8 = 0b000_0001;
}

/// Encoding family of an instruction.
///
/// `IShift`, `Load` and `Jalr` share the I-type bit layout but differ in
/// operand order or in how the upper immediate bits are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Format {
    /// `funct7|rs2|rs1|funct3|rd|opcode`.
    R,
    /// `imm12|rs1|funct3|rd|opcode` arithmetic.
    I,
    /// `funct7|shamt|rs1|funct3|rd|opcode`.
    IShift,
    /// I-type loads, written `rd, offset(rs1)`.
    Load,
    /// I-type `JALR`, written `rd, offset(rs1)`.
    Jalr,
    /// Stores with a split 12-bit immediate.
    S,
    /// Branches with a split 13-bit displacement.
    B,
    /// `LUI`/`AUIPC` with a 20-bit upper immediate.
    U,
    /// `JAL` with a split 21-bit displacement.
    J,
}

impl Format {
    /// Returns `true` when funct3 participates in classification.
    #[must_use]
    pub const fn uses_funct3(self) -> bool {
        !matches!(self, Self::U | Self::J)
    }

    /// Returns `true` when funct7 participates in classification.
    #[must_use]
    pub const fn uses_funct7(self) -> bool {
        matches!(self, Self::R | Self::IShift)
    }

    /// Returns `true` for formats whose handlers redirect or advance the PC themselves.
    #[must_use]
    pub const fn is_control_flow(self) -> bool {
        matches!(self, Self::B | Self::J | Self::Jalr)
    }

    /// Ordered operand slots as written in assembly (after `offset(reg)` normalization).
    #[must_use]
    pub const fn operands(self) -> &'static [OperandSlot] {
        match self {
            Self::R => &[OperandSlot::Rd, OperandSlot::Rs1, OperandSlot::Rs2],
            Self::I => &[OperandSlot::Rd, OperandSlot::Rs1, IMM12],
            Self::IShift => &[OperandSlot::Rd, OperandSlot::Rs1, SHAMT],
            Self::Load | Self::Jalr => &[OperandSlot::Rd, IMM12, OperandSlot::Rs1],
            Self::S => &[OperandSlot::Rs2, IMM12, OperandSlot::Rs1],
            Self::B => &[OperandSlot::Rs1, OperandSlot::Rs2, BRANCH_OFFSET],
            Self::U => &[OperandSlot::Rd, IMM20],
            Self::J => &[OperandSlot::Rd, JUMP_OFFSET],
        }
    }
}

/// A typed operand position of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OperandSlot {
    /// Destination register.
    Rd,
    /// First source register.
    Rs1,
    /// Second source register.
    Rs2,
    /// Literal constant checked against `bits` with signed or unsigned bounds.
    Immediate {
        /// Field width in bits.
        bits: u8,
        /// Whether the field is two's complement.
        signed: bool,
    },
    /// Signed PC-relative displacement of `bits` bits.
    Offset {
        /// Field width in bits, including the implicit zero bit 0.
        bits: u8,
    },
}

impl OperandSlot {
    /// Returns `true` for register slots.
    #[must_use]
    pub const fn is_register(self) -> bool {
        matches!(self, Self::Rd | Self::Rs1 | Self::Rs2)
    }

    /// Inclusive value bounds of an immediate or offset slot.
    #[must_use]
    pub const fn bounds(self) -> Option<(i64, i64)> {
        match self {
            Self::Rd | Self::Rs1 | Self::Rs2 => None,
            Self::Immediate { bits, signed: false } => Some((0, (1i64 << bits) - 1)),
            Self::Immediate { bits, signed: true } | Self::Offset { bits } => {
                Some((-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1))
            }
        }
    }
}

const IMM12: OperandSlot = OperandSlot::Immediate {
    bits: 12,
    signed: true,
};
const SHAMT: OperandSlot = OperandSlot::Immediate {
    bits: 5,
    signed: false,
};
const IMM20: OperandSlot = OperandSlot::Immediate {
    bits: 20,
    signed: true,
};
const BRANCH_OFFSET: OperandSlot = OperandSlot::Offset { bits: 13 };
const JUMP_OFFSET: OperandSlot = OperandSlot::Offset { bits: 21 };

/// Supported mnemonics, in [`INSTRUCTION_TABLE`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Mnemonic {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Jalr,
    Sb,
    Sh,
    Sw,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Jal,
    Lui,
    Auipc,
}

impl Mnemonic {
    /// Returns the table entry for this mnemonic.
    #[must_use]
    pub const fn spec(self) -> &'static InstructionSpec {
        &INSTRUCTION_TABLE[self as usize]
    }

    /// Lowercase assembly name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.spec().name
    }

    /// Encoding family.
    #[must_use]
    pub const fn format(self) -> Format {
        self.spec().format
    }

    /// Canonical operand-usage string, e.g. `add rd, rs1, rs2 # rd = rs1 + rs2`.
    #[must_use]
    pub const fn usage(self) -> &'static str {
        self.spec().usage
    }
}

impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSpec {
    /// Mnemonic this row describes.
    pub mnemonic: Mnemonic,
    /// Lowercase assembly name.
    pub name: &'static str,
    /// Encoding family.
    pub format: Format,
    /// 7-bit primary opcode.
    pub opcode: u8,
    /// 3-bit secondary selector (ignored for U/J).
    pub funct3: u8,
    /// 7-bit selector for R-type and shift-immediate rows.
    pub funct7: u8,
    /// Ordered operand slots.
    pub operands: &'static [OperandSlot],
    /// Canonical operand-usage string.
    pub usage: &'static str,
}

impl InstructionSpec {
    /// Returns `true` when `word` carries this row's selector bits.
    #[must_use]
    pub const fn matches(&self, word: u32) -> bool {
        layout::opcode(word) == self.opcode
            && (!self.format.uses_funct3() || layout::funct3(word) == self.funct3)
            && (!self.format.uses_funct7() || layout::funct7(word) == self.funct7)
    }
}

const fn row(
    mnemonic: Mnemonic,
    name: &'static str,
    format: Format,
    opcode: u8,
    funct3: u8,
    funct7: u8,
    usage: &'static str,
) -> InstructionSpec {
    InstructionSpec {
        mnemonic,
        name,
        format,
        opcode,
        funct3,
        funct7,
        operands: format.operands(),
        usage,
    }
}

use self::funct7::{ALT, BASE, MULDIV};
use self::opcode::{AUIPC, BRANCH, JAL, JALR, LOAD, LUI, OP, OP_IMM, STORE};
use Format::{IShift, Load, B, I, J, R, S, U};

/// Single source-of-truth instruction table, indexed by `Mnemonic as usize`.
///
/// Any word not matched by a row here is unsupported by definition.
#[rustfmt::skip]
pub const INSTRUCTION_TABLE: &[InstructionSpec] = &[
    row(Mnemonic::Add, "add", R, OP, 0b000, BASE, "add rd, rs1, rs2 # rd = rs1 + rs2"),
    row(Mnemonic::Sub, "sub", R, OP, 0b000, ALT, "sub rd, rs1, rs2 # rd = rs1 - rs2"),
    row(Mnemonic::Sll, "sll", R, OP, 0b001, BASE, "sll rd, rs1, rs2 # rd = rs1 << rs2"),
    row(Mnemonic::Slt, "slt", R, OP, 0b010, BASE, "slt rd, rs1, rs2 # rd = (rs1 < rs2) ? 1 : 0"),
    row(Mnemonic::Sltu, "sltu", R, OP, 0b011, BASE, "sltu rd, rs1, rs2 # rd = (rs1 < rs2) ? 1 : 0 (unsigned)"),
    row(Mnemonic::Xor, "xor", R, OP, 0b100, BASE, "xor rd, rs1, rs2 # rd = rs1 ^ rs2"),
    row(Mnemonic::Srl, "srl", R, OP, 0b101, BASE, "srl rd, rs1, rs2 # rd = rs1 >> rs2"),
    row(Mnemonic::Sra, "sra", R, OP, 0b101, ALT, "sra rd, rs1, rs2 # rd = rs1 >> rs2 (arithmetic)"),
    row(Mnemonic::Or, "or", R, OP, 0b110, BASE, "or rd, rs1, rs2 # rd = rs1 | rs2"),
    row(Mnemonic::And, "and", R, OP, 0b111, BASE, "and rd, rs1, rs2 # rd = rs1 & rs2"),
    row(Mnemonic::Mul, "mul", R, OP, 0b000, MULDIV, "mul rd, rs1, rs2 # rd = rs1 * rs2"),
    row(Mnemonic::Mulh, "mulh", R, OP, 0b001, MULDIV, "mulh rd, rs1, rs2 # rd = (rs1 * rs2) >> 32"),
    row(Mnemonic::Mulhsu, "mulhsu", R, OP, 0b010, MULDIV, "mulhsu rd, rs1, rs2 # rd = (rs1 * (unsigned)rs2) >> 32"),
    row(Mnemonic::Mulhu, "mulhu", R, OP, 0b011, MULDIV, "mulhu rd, rs1, rs2 # rd = ((unsigned)rs1 * (unsigned)rs2) >> 32"),
    row(Mnemonic::Div, "div", R, OP, 0b100, MULDIV, "div rd, rs1, rs2 # rd = rs1 / rs2"),
    row(Mnemonic::Divu, "divu", R, OP, 0b101, MULDIV, "divu rd, rs1, rs2 # rd = (unsigned)rs1 / (unsigned)rs2"),
    row(Mnemonic::Rem, "rem", R, OP, 0b110, MULDIV, "rem rd, rs1, rs2 # rd = rs1 % rs2"),
    row(Mnemonic::Remu, "remu", R, OP, 0b111, MULDIV, "remu rd, rs1, rs2 # rd = (unsigned)rs1 % (unsigned)rs2"),
    row(Mnemonic::Addi, "addi", I, OP_IMM, 0b000, BASE, "addi rd, rs1, imm # rd = rs1 + imm"),
    row(Mnemonic::Slti, "slti", I, OP_IMM, 0b010, BASE, "slti rd, rs1, imm # rd = (rs1 < imm) ? 1 : 0"),
    row(Mnemonic::Sltiu, "sltiu", I, OP_IMM, 0b011, BASE, "sltiu rd, rs1, imm # rd = (rs1 < imm) ? 1 : 0 (unsigned)"),
    row(Mnemonic::Xori, "xori", I, OP_IMM, 0b100, BASE, "xori rd, rs1, imm # rd = rs1 ^ imm"),
    row(Mnemonic::Ori, "ori", I, OP_IMM, 0b110, BASE, "ori rd, rs1, imm # rd = rs1 | imm"),
    row(Mnemonic::Andi, "andi", I, OP_IMM, 0b111, BASE, "andi rd, rs1, imm # rd = rs1 & imm"),
    row(Mnemonic::Slli, "slli", IShift, OP_IMM, 0b001, BASE, "slli rd, rs1, shamt # rd = rs1 << shamt"),
    row(Mnemonic::Srli, "srli", IShift, OP_IMM, 0b101, BASE, "srli rd, rs1, shamt # rd = rs1 >> shamt"),
    row(Mnemonic::Srai, "srai", IShift, OP_IMM, 0b101, ALT, "srai rd, rs1, shamt # rd = rs1 >> shamt (arithmetic)"),
    row(Mnemonic::Lb, "lb", Load, LOAD, 0b000, BASE, "lb rd, offset(rs1) # rd = sext(mem8[rs1 + offset])"),
    row(Mnemonic::Lh, "lh", Load, LOAD, 0b001, BASE, "lh rd, offset(rs1) # rd = sext(mem16[rs1 + offset])"),
    row(Mnemonic::Lw, "lw", Load, LOAD, 0b010, BASE, "lw rd, offset(rs1) # rd = mem32[rs1 + offset]"),
    row(Mnemonic::Lbu, "lbu", Load, LOAD, 0b100, BASE, "lbu rd, offset(rs1) # rd = zext(mem8[rs1 + offset])"),
    row(Mnemonic::Lhu, "lhu", Load, LOAD, 0b101, BASE, "lhu rd, offset(rs1) # rd = zext(mem16[rs1 + offset])"),
    row(Mnemonic::Jalr, "jalr", Format::Jalr, JALR, 0b000, BASE, "jalr rd, offset(rs1) # rd = pc + 4; pc = rs1 + offset"),
    row(Mnemonic::Sb, "sb", S, STORE, 0b000, BASE, "sb rs2, offset(rs1) # mem8[rs1 + offset] = rs2"),
    row(Mnemonic::Sh, "sh", S, STORE, 0b001, BASE, "sh rs2, offset(rs1) # mem16[rs1 + offset] = rs2"),
    row(Mnemonic::Sw, "sw", S, STORE, 0b010, BASE, "sw rs2, offset(rs1) # mem32[rs1 + offset] = rs2"),
    row(Mnemonic::Beq, "beq", B, BRANCH, 0b000, BASE, "beq rs1, rs2, offset # if (rs1 == rs2) pc += offset"),
    row(Mnemonic::Bne, "bne", B, BRANCH, 0b001, BASE, "bne rs1, rs2, offset # if (rs1 != rs2) pc += offset"),
    row(Mnemonic::Blt, "blt", B, BRANCH, 0b100, BASE, "blt rs1, rs2, offset # if (rs1 < rs2) pc += offset"),
    row(Mnemonic::Bge, "bge", B, BRANCH, 0b101, BASE, "bge rs1, rs2, offset # if (rs1 >= rs2) pc += offset"),
    row(Mnemonic::Bltu, "bltu", B, BRANCH, 0b110, BASE, "bltu rs1, rs2, offset # if (rs1 < rs2) pc += offset (unsigned)"),
    row(Mnemonic::Bgeu, "bgeu", B, BRANCH, 0b111, BASE, "bgeu rs1, rs2, offset # if (rs1 >= rs2) pc += offset (unsigned)"),
    row(Mnemonic::Jal, "jal", J, JAL, 0b000, BASE, "jal rd, offset # rd = pc + 4; pc += offset"),
    row(Mnemonic::Lui, "lui", U, LUI, 0b000, BASE, "lui rd, imm # rd = imm << 12"),
    row(Mnemonic::Auipc, "auipc", U, AUIPC, 0b000, BASE, "auipc rd, imm # rd = pc + (imm << 12)"),
];

/// Classifies a raw word into a supported mnemonic.
///
/// `None` means the opcode/funct3/funct7 combination is unsupported.
#[must_use]
pub fn classify(word: u32) -> Option<Mnemonic> {
    INSTRUCTION_TABLE
        .iter()
        .find(|spec| spec.matches(word))
        .map(|spec| spec.mnemonic)
}
