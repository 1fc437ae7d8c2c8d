//! Data memory: eight byte cells.
//!
//! The address space is exactly the range of the 3-bit operand2 field,
//! so every address is valid. Addresses are masked on access.

use crate::cpu::decode::FIELD3_MASK;
use serde::{Serialize, Deserialize};

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 8;

/// Byte-addressable data memory.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub const fn new() -> Self {
        Self { cells: [0; MEMORY_SIZE] }
    }

    pub const fn from_cells(cells: [u8; MEMORY_SIZE]) -> Self {
        Self { cells }
    }

    /// Read a cell. Only the low three bits of `addr` are used.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.cells[Self::index(addr)]
    }

    /// Write a cell. Only the low three bits of `addr` are used.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.cells[Self::index(addr)] = value;
    }

    pub fn cells(&self) -> &[u8; MEMORY_SIZE] {
        &self.cells
    }

    #[inline]
    fn index(addr: u8) -> usize {
        usize::from(addr & FIELD3_MASK)
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory{:?}", self.cells)
    }
}
