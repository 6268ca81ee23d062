//! Engine-side legality checks for data memory accesses.

use crate::ExecutionError;

/// Width of a data memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// One byte (`LB`/`LBU`/`SB`).
    Byte,
    /// Two bytes (`LH`/`LHU`/`SH`).
    Half,
    /// Four bytes (`LW`/`SW`).
    Word,
}

impl AccessWidth {
    /// Number of bytes touched by the access.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    /// Mask covering the low `bytes() * 8` bits.
    #[must_use]
    pub const fn value_mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => u32::MAX,
        }
    }
}

/// Validates a data access of `width` at `addr` against a memory of `len_bytes`.
///
/// The whole access must fall inside memory. Half and word accesses may start
/// at any byte address and span two cells.
///
/// # Errors
///
/// Returns [`ExecutionError::InvalidMemoryAccess`] when the access overruns
/// memory.
#[allow(clippy::cast_lossless)]
pub const fn validate_data_access(
    addr: u32,
    width: AccessWidth,
    len_bytes: u64,
) -> Result<(), ExecutionError> {
    if addr as u64 + width.bytes() as u64 > len_bytes {
        return Err(ExecutionError::InvalidMemoryAccess);
    }
    Ok(())
}
