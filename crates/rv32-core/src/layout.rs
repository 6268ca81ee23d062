//! Bit packing and field extraction for the six RV32 instruction formats.
//!
//! The assembler packs through the `pack_*` functions and the decoder
//! extracts through the matching field readers, so both directions share one
//! definition of every field position.
//!
//! ```text
//!  31        25 24   20 19   15 14  12 11        7 6      0
//! | funct7     | rs2   | rs1   | f3   | rd         | opcode |  R
//! | imm[11:0]          | rs1   | f3   | rd         | opcode |  I
//! | imm[11:5]  | rs2   | rs1   | f3   | imm[4:0]   | opcode |  S
//! | imm[12|10:5] | rs2 | rs1   | f3   | imm[4:1|11]| opcode |  B
//! | imm[31:12]                        | rd         | opcode |  U
//! | imm[20|10:1|11|19:12]             | rd         | opcode |  J
//! ```

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless
)]

/// Extracts the 7-bit opcode field (bits 6..0).
#[must_use]
pub const fn opcode(word: u32) -> u8 {
    (word & 0x7F) as u8
}

/// Extracts the destination register field (bits 11..7).
#[must_use]
pub const fn rd(word: u32) -> u8 {
    ((word >> 7) & 0x1F) as u8
}

/// Extracts the funct3 field (bits 14..12).
#[must_use]
pub const fn funct3(word: u32) -> u8 {
    ((word >> 12) & 0x07) as u8
}

/// Extracts the first source register field (bits 19..15).
#[must_use]
pub const fn rs1(word: u32) -> u8 {
    ((word >> 15) & 0x1F) as u8
}

/// Extracts the second source register field (bits 24..20).
#[must_use]
pub const fn rs2(word: u32) -> u8 {
    ((word >> 20) & 0x1F) as u8
}

/// Extracts the funct7 field (bits 31..25).
#[must_use]
pub const fn funct7(word: u32) -> u8 {
    (word >> 25) as u8
}

/// Sign-extends the low `bits` bits of `value` to 32 bits.
#[must_use]
pub const fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// I-type immediate, sign-extended from 12 bits.
#[must_use]
pub const fn imm_i(word: u32) -> i32 {
    (word as i32) >> 20
}

/// Unsigned 5-bit shift amount of `SLLI`/`SRLI`/`SRAI`.
#[must_use]
pub const fn shamt(word: u32) -> u32 {
    (word >> 20) & 0x1F
}

/// S-type immediate reassembled from `imm[11:5]` and `imm[4:0]`.
#[must_use]
pub const fn imm_s(word: u32) -> i32 {
    let value = ((word >> 25) << 5) | ((word >> 7) & 0x1F);
    sign_extend(value, 12)
}

/// B-type displacement reassembled from its four split fields; bit 0 is zero.
#[must_use]
pub const fn imm_b(word: u32) -> i32 {
    let value = (((word >> 31) & 0x1) << 12)
        | (((word >> 7) & 0x1) << 11)
        | (((word >> 25) & 0x3F) << 5)
        | (((word >> 8) & 0xF) << 1);
    sign_extend(value, 13)
}

/// U-type immediate as the signed 20-bit value (before the `<< 12`).
#[must_use]
pub const fn imm_u(word: u32) -> i32 {
    (word as i32) >> 12
}

/// J-type displacement reassembled from its four split fields; bit 0 is zero.
#[must_use]
pub const fn imm_j(word: u32) -> i32 {
    let value = (((word >> 31) & 0x1) << 20)
        | (((word >> 12) & 0xFF) << 12)
        | (((word >> 20) & 0x1) << 11)
        | (((word >> 21) & 0x3FF) << 1);
    sign_extend(value, 21)
}

/// Packs `funct7|rs2|rs1|funct3|rd|opcode`.
#[must_use]
pub const fn pack_r(funct7: u8, rs2: u8, rs1: u8, funct3: u8, rd: u8, opcode: u8) -> u32 {
    ((funct7 as u32 & 0x7F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 as u32 & 0x07) << 12)
        | ((rd as u32 & 0x1F) << 7)
        | (opcode as u32 & 0x7F)
}

/// Packs `imm[11:0]|rs1|funct3|rd|opcode`.
#[must_use]
pub const fn pack_i(imm: i32, rs1: u8, funct3: u8, rd: u8, opcode: u8) -> u32 {
    (((imm as u32) & 0xFFF) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 as u32 & 0x07) << 12)
        | ((rd as u32 & 0x1F) << 7)
        | (opcode as u32 & 0x7F)
}

/// Packs `imm[11:5]|rs2|rs1|funct3|imm[4:0]|opcode`.
#[must_use]
pub const fn pack_s(imm: i32, rs2: u8, rs1: u8, funct3: u8, opcode: u8) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 as u32 & 0x07) << 12)
        | ((imm & 0x1F) << 7)
        | (opcode as u32 & 0x7F)
}

/// Packs `imm[12]|imm[10:5]|rs2|rs1|funct3|imm[4:1]|imm[11]|opcode`.
///
/// Bit 0 of `imm` is dropped.
#[must_use]
pub const fn pack_b(imm: i32, rs2: u8, rs1: u8, funct3: u8, opcode: u8) -> u32 {
    let imm = imm as u32;
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 as u32 & 0x07) << 12)
        | (((imm >> 1) & 0xF) << 8)
        | (((imm >> 11) & 0x1) << 7)
        | (opcode as u32 & 0x7F)
}

/// Packs `imm[19:0]|rd|opcode`, with `imm` given before the `<< 12`.
#[must_use]
pub const fn pack_u(imm: i32, rd: u8, opcode: u8) -> u32 {
    (((imm as u32) & 0xF_FFFF) << 12) | ((rd as u32 & 0x1F) << 7) | (opcode as u32 & 0x7F)
}

/// Packs `imm[20]|imm[10:1]|imm[11]|imm[19:12]|rd|opcode`.
///
/// Bit 0 of `imm` is dropped.
#[must_use]
pub const fn pack_j(imm: i32, rd: u8, opcode: u8) -> u32 {
    let imm = imm as u32;
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xFF) << 12)
        | ((rd as u32 & 0x1F) << 7)
        | (opcode as u32 & 0x7F)
}
