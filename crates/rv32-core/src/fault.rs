use thiserror::Error;

/// Execution-time error taxonomy reported by [`crate::Engine::step`].
///
/// Every variant except [`ExecutionError::PcOutOfBounds`] forces an
/// architectural reset of the register file and program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum ExecutionError {
    /// Opcode or funct3/funct7 combination outside the supported set.
    #[error("unsupported opcode")]
    UnsupportedOpcode = 0x01,
    /// Decoded register index outside `x0..=x31`.
    #[error("invalid register, the register number must be between 0 and 31")]
    InvalidRegister = 0x02,
    /// Data access that does not fit inside memory.
    #[error("invalid memory access, the address must be within the memory bounds")]
    InvalidMemoryAccess = 0x03,
    /// `DIV`/`DIVU`/`REM`/`REMU` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero = 0x04,
    /// Program counter points past the loaded program.
    #[error("program counter out of bounds")]
    PcOutOfBounds = 0x05,
    /// Branch or jump target is not a multiple of 4.
    #[error("offset not 32-bit aligned, the target must be a multiple of 4")]
    OffsetNotAligned = 0x06,
}

impl ExecutionError {
    /// Converts an error to its stable numeric code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable numeric code back into an error.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::UnsupportedOpcode),
            0x02 => Some(Self::InvalidRegister),
            0x03 => Some(Self::InvalidMemoryAccess),
            0x04 => Some(Self::DivisionByZero),
            0x05 => Some(Self::PcOutOfBounds),
            0x06 => Some(Self::OffsetNotAligned),
            _ => None,
        }
    }

    /// Returns `true` for the normal "program finished" signal.
    ///
    /// Termination leaves architectural state untouched; every other error
    /// resets it.
    #[must_use]
    pub const fn is_termination(self) -> bool {
        matches!(self, Self::PcOutOfBounds)
    }
}
