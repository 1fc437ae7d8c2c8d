//! Register file: four 8-bit unsigned registers R0-R3.
//!
//! All arithmetic wraps modulo 256. Nothing here can fail.

use crate::cpu::decode::RegisterIndex;
use serde::{Serialize, Deserialize};

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 4;

/// The register file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    slots: [u8; REGISTER_COUNT],
}

impl Registers {
    /// Create a register file with all values zeroed.
    pub const fn new() -> Self {
        Self { slots: [0; REGISTER_COUNT] }
    }

    /// Create a register file with the given initial values.
    pub const fn from_values(slots: [u8; REGISTER_COUNT]) -> Self {
        Self { slots }
    }

    #[inline]
    pub fn read(&self, r: RegisterIndex) -> u8 {
        self.slots[r.as_usize()]
    }

    #[inline]
    pub fn write(&mut self, r: RegisterIndex, value: u8) {
        self.slots[r.as_usize()] = value;
    }

    /// R[dst] := R[dst] + R[src], wrapping. Returns the new value.
    pub fn add(&mut self, dst: RegisterIndex, src: RegisterIndex) -> u8 {
        let value = self.read(dst).wrapping_add(self.read(src));
        self.write(dst, value);
        value
    }

    /// R[dst] := R[dst] - R[src], wrapping. Returns the new value.
    pub fn sub(&mut self, dst: RegisterIndex, src: RegisterIndex) -> u8 {
        let value = self.read(dst).wrapping_sub(self.read(src));
        self.write(dst, value);
        value
    }

    /// R[dst] := R[dst] & R[src]. Returns the new value.
    pub fn and(&mut self, dst: RegisterIndex, src: RegisterIndex) -> u8 {
        let value = self.read(dst) & self.read(src);
        self.write(dst, value);
        value
    }

    /// R[dst] := R[dst] | R[src]. Returns the new value.
    pub fn or(&mut self, dst: RegisterIndex, src: RegisterIndex) -> u8 {
        let value = self.read(dst) | self.read(src);
        self.write(dst, value);
        value
    }

    pub fn values(&self) -> [u8; REGISTER_COUNT] {
        self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const R0: RegisterIndex = RegisterIndex::R0;
    const R1: RegisterIndex = RegisterIndex::R1;

    #[test]
    fn test_registers_independent() {
        let mut regs = Registers::new();
        regs.write(RegisterIndex::R2, 200);
        assert_eq!(regs.values(), [0, 0, 200, 0]);
    }

    #[test]
    fn test_add_wraps() {
        let mut regs = Registers::from_values([250, 10, 0, 0]);
        assert_eq!(regs.add(R0, R1), 4);
        assert_eq!(regs.read(R0), 4);
        assert_eq!(regs.read(R1), 10);
    }

    #[test]
    fn test_sub_wraps() {
        let mut regs = Registers::from_values([3, 5, 0, 0]);
        assert_eq!(regs.sub(R0, R1), 254);
    }

    #[test]
    fn test_self_operand() {
        let mut regs = Registers::from_values([9, 0, 0, 0]);
        assert_eq!(regs.add(R0, R0), 18);
        assert_eq!(regs.sub(R0, R0), 0);
    }

    #[test]
    fn test_bitwise() {
        let mut regs = Registers::from_values([0b1100, 0b1010, 0, 0]);
        assert_eq!(regs.and(R0, R1), 0b1000);
        assert_eq!(regs.or(R0, R1), 0b1010);
    }

    proptest! {
        #[test]
        fn prop_add_is_mod_256(a in any::<u8>(), b in any::<u8>()) {
            let mut regs = Registers::from_values([a, b, 0, 0]);
            regs.add(R0, R1);
            prop_assert_eq!(regs.read(R0) as u16, (a as u16 + b as u16) % 256);
        }

        #[test]
        fn prop_sub_is_mod_256(a in any::<u8>(), b in any::<u8>()) {
            let mut regs = Registers::from_values([a, b, 0, 0]);
            regs.sub(R0, R1);
            prop_assert_eq!(regs.read(R0) as i16, (a as i16 - b as i16).rem_euclid(256));
        }
    }
}
