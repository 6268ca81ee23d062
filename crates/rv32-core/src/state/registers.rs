use std::fmt;

/// Number of architecturally visible general-purpose registers (`x0..x31`).
pub const REGISTER_COUNT: usize = 32;

/// General-purpose register identifier in `x0..=x31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Register(u8);

impl Register {
    /// The hard-wired zero register.
    pub const ZERO: Self = Self(0);

    /// Ordered list of all registers.
    #[allow(clippy::cast_possible_truncation)]
    pub const ALL: [Self; REGISTER_COUNT] = {
        let mut all = [Self::ZERO; REGISTER_COUNT];
        let mut index = 0;
        while index < REGISTER_COUNT {
            all[index] = Self(index as u8);
            index += 1;
        }
        all
    };

    /// Creates a register from its number, rejecting anything above 31.
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if (number as usize) < REGISTER_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    /// Returns the register number (`0..=31`).
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Returns the array index for this register.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for `x0`.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl TryFrom<u8> for Register {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(value)
    }
}

impl From<Register> for u8 {
    fn from(value: Register) -> Self {
        value.0
    }
}

/// Architectural register file: 32 general-purpose registers plus the PC.
///
/// `x0` reads as zero regardless of writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [u32; REGISTER_COUNT],
    pc: u32,
}

impl RegisterFile {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn get(&self, reg: Register) -> u32 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register. Writes to `x0` are discarded.
    pub const fn set(&mut self, reg: Register, value: u32) {
        if !reg.is_zero() {
            self.gpr[reg.index()] = value;
        }
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Advances the program counter by one instruction (4 bytes).
    pub const fn increment_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Zeroes every register and the program counter.
    pub const fn reset(&mut self) {
        self.gpr = [0; REGISTER_COUNT];
        self.pc = 0;
    }

    /// Returns a copy of all 32 general-purpose registers.
    #[must_use]
    pub const fn snapshot(&self) -> [u32; REGISTER_COUNT] {
        self.gpr
    }
}
