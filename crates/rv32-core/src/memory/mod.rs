//! Word-granular data memory with byte-lane access.
//!
//! Byte address `a` selects cell `a / 4` and little-endian lane `a % 4`.
//! Out-of-range reads return zero and out-of-range writes are ignored; the
//! engine rejects such accesses before they reach this layer.

/// Data access width and legality checks.
pub mod access;

pub use access::{validate_data_access, AccessWidth};

/// Default memory size in 32-bit words (8 KiB).
pub const DEFAULT_MEMORY_WORDS: u32 = 2048;

/// Byte-addressable memory backed by 32-bit cells.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    cells: Vec<u32>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::with_words(DEFAULT_MEMORY_WORDS)
    }
}

impl Memory {
    /// Allocates zeroed memory of `words` cells.
    #[must_use]
    pub fn with_words(words: u32) -> Self {
        Self {
            cells: vec![0; words as usize],
        }
    }

    /// Size in 32-bit cells.
    #[must_use]
    pub fn len_words(&self) -> usize {
        self.cells.len()
    }

    /// Size in bytes.
    #[must_use]
    pub fn len_bytes(&self) -> u64 {
        self.cells.len() as u64 * 4
    }

    fn cell_index(&self, addr: u32) -> Option<usize> {
        let index = (addr / 4) as usize;
        (index < self.cells.len()).then_some(index)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_lanes(&self, addr: u32, width: AccessWidth) -> u32 {
        if u64::from(addr) + u64::from(width.bytes()) > self.len_bytes() {
            return 0;
        }
        let mut value = 0u32;
        for lane in 0..width.bytes() {
            let byte_addr = addr + lane;
            let Some(index) = self.cell_index(byte_addr) else {
                return 0;
            };
            let byte = (self.cells[index] >> ((byte_addr % 4) * 8)) & 0xFF;
            value |= byte << (lane * 8);
        }
        value
    }

    fn write_lanes(&mut self, addr: u32, value: u32, width: AccessWidth) {
        if u64::from(addr) + u64::from(width.bytes()) > self.len_bytes() {
            return;
        }
        for lane in 0..width.bytes() {
            let byte_addr = addr + lane;
            let Some(index) = self.cell_index(byte_addr) else {
                return;
            };
            let shift = (byte_addr % 4) * 8;
            let byte = (value >> (lane * 8)) & 0xFF;
            self.cells[index] = (self.cells[index] & !(0xFF << shift)) | (byte << shift);
        }
    }

    /// Reads four bytes starting at `addr`.
    #[must_use]
    pub fn read32(&self, addr: u32) -> u32 {
        self.read_lanes(addr, AccessWidth::Word)
    }

    /// Reads two bytes starting at `addr`, zero-extended.
    #[must_use]
    pub fn read_half(&self, addr: u32) -> u32 {
        self.read_lanes(addr, AccessWidth::Half)
    }

    /// Reads one byte at `addr`, zero-extended.
    #[must_use]
    pub fn read_byte(&self, addr: u32) -> u32 {
        self.read_lanes(addr, AccessWidth::Byte)
    }

    /// Writes four bytes starting at `addr`.
    pub fn write(&mut self, addr: u32, value: u32) {
        self.write_lanes(addr, value, AccessWidth::Word);
    }

    /// Writes the low two bytes of `value` at `addr`.
    pub fn write_half(&mut self, addr: u32, value: u32) {
        self.write_lanes(addr, value, AccessWidth::Half);
    }

    /// Writes the low byte of `value` at `addr`.
    pub fn write_byte(&mut self, addr: u32, value: u32) {
        self.write_lanes(addr, value, AccessWidth::Byte);
    }

    /// Reads `width` bytes at `addr`, zero-extended.
    #[must_use]
    pub fn load(&self, addr: u32, width: AccessWidth) -> u32 {
        self.read_lanes(addr, width)
    }

    /// Writes the low `width` bytes of `value` at `addr`.
    pub fn store(&mut self, addr: u32, value: u32, width: AccessWidth) {
        self.write_lanes(addr, value, width);
    }

    /// Returns the cell at `index`, if present.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<u32> {
        self.cells.get(index).copied()
    }

    /// Read-only view of every cell.
    #[must_use]
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Zeroes every cell.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    /// Resizes to `words` cells, keeping the common prefix and zero-filling growth.
    pub fn resize(&mut self, words: u32) {
        self.cells.resize(words as usize, 0);
    }
}
