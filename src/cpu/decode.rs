//! Instruction decoder.
//!
//! Every instruction is a single 8-bit word:
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +-----------+-------+-----------+
//! |  opcode   |  op1  |    op2    |
//! +-----------+-------+-----------+
//! ```
//!
//! `op1` always names a register and goes through a [`RegisterMap`].
//! `op2` is an immediate, a memory address, a jump target or a source
//! register depending on the operation.

use crate::cpu::isa::Op;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Mask for the 3-bit opcode and operand2 fields.
pub const FIELD3_MASK: u8 = 0b111;

/// Mask for the 2-bit operand1 field.
pub const FIELD2_MASK: u8 = 0b11;

/// Raw fields of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    /// Bits 7-5.
    pub opcode: u8,
    /// Bits 4-3, before register mapping.
    pub operand1: u8,
    /// Bits 2-0.
    pub operand2: u8,
}

/// Split a word into its three fields.
#[inline]
pub const fn decode(word: u8) -> Fields {
    Fields {
        opcode: (word >> 5) & FIELD3_MASK,
        operand1: (word >> 3) & FIELD2_MASK,
        operand2: word & FIELD3_MASK,
    }
}

/// Pack three fields into a word. Fields wider than their slot are truncated.
#[inline]
pub const fn encode(opcode: u8, operand1: u8, operand2: u8) -> u8 {
    ((opcode & FIELD3_MASK) << 5) | ((operand1 & FIELD2_MASK) << 3) | (operand2 & FIELD3_MASK)
}

/// Index of one of the four registers. Always in `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RegisterIndex(u8);

impl RegisterIndex {
    pub const R0: Self = Self(0);
    pub const R1: Self = Self(1);
    pub const R2: Self = Self(2);
    pub const R3: Self = Self(3);

    /// All four registers in order.
    pub const ALL: [Self; 4] = [Self::R0, Self::R1, Self::R2, Self::R3];

    /// Create from a register number, `None` if it is not 0-3.
    pub const fn new(index: u8) -> Option<Self> {
        if index <= FIELD2_MASK {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Select a register from the low two bits of a field.
    #[inline]
    pub const fn from_low_bits(value: u8) -> Self {
        Self(value & FIELD2_MASK)
    }

    /// The register number.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegisterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RegisterIndex> for u8 {
    fn from(r: RegisterIndex) -> u8 {
        r.0
    }
}

impl TryFrom<u8> for RegisterIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RegisterIndex::new(value).ok_or_else(|| format!("register index {} out of range (0-3)", value))
    }
}

/// How the 2-bit operand1 field selects a register.
///
/// Both encodings exist in the wild and programs written for one do not
/// run correctly under the other, so the choice is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterMap {
    /// `00`→R0, `01`→R1, `10`→R2, `11`→R3.
    Identity,
    /// `01`→R0, `11`→R1. `00` and `10` fall back to R0, so R2 and R3
    /// cannot be named through operand1.
    Remapped,
}

impl RegisterMap {
    /// Resolve a raw operand1 code.
    pub const fn resolve(self, raw: u8) -> RegisterIndex {
        match self {
            RegisterMap::Identity => RegisterIndex::from_low_bits(raw),
            RegisterMap::Remapped => match raw & FIELD2_MASK {
                0b11 => RegisterIndex::R1,
                // 0b01 is the canonical R0 code; 0b00 and 0b10 fall back to it.
                _ => RegisterIndex::R0,
            },
        }
    }

    /// The canonical raw code that selects `reg`, if it is reachable.
    pub const fn encode(self, reg: RegisterIndex) -> Option<u8> {
        match self {
            RegisterMap::Identity => Some(reg.get()),
            RegisterMap::Remapped => match reg.get() {
                0 => Some(0b01),
                1 => Some(0b11),
                _ => None,
            },
        }
    }
}

impl fmt::Display for RegisterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterMap::Identity => write!(f, "identity"),
            RegisterMap::Remapped => write!(f, "remapped"),
        }
    }
}

/// A fully resolved instruction, ready to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// R[dst] := R[dst] + R[src]
    Add { dst: RegisterIndex, src: RegisterIndex },
    /// R[dst] := imm
    Mov { dst: RegisterIndex, imm: u8 },
    /// R[dst] := R[dst] - R[src]
    Sub { dst: RegisterIndex, src: RegisterIndex },
    /// R[dst] := MEM[addr]
    Ld { dst: RegisterIndex, addr: u8 },
    /// MEM[addr] := R[src]
    St { src: RegisterIndex, addr: u8 },
    /// PC := target
    Jmp { target: u8 },
    /// if R[reg] = 0 then PC := target
    Jz { reg: RegisterIndex, target: u8 },
    /// Stop the machine.
    Hlt,
    /// R[dst] := R[dst] & R[src]
    And { dst: RegisterIndex, src: RegisterIndex },
    /// R[dst] := R[dst] | R[src]
    Or { dst: RegisterIndex, src: RegisterIndex },
    /// Opcode with no entry in the active table.
    Unknown { opcode: u8 },
}

impl Instruction {
    /// Build an instruction from decoded fields and the table entry for
    /// its opcode.
    ///
    /// When operand2 names a source register only its low two bits are
    /// used, so `R[op2]` is always one of the four registers.
    pub fn resolve(fields: Fields, op: Option<Op>, map: RegisterMap) -> Self {
        let Some(op) = op else {
            return Instruction::Unknown { opcode: fields.opcode };
        };

        let r1 = map.resolve(fields.operand1);
        let r2 = RegisterIndex::from_low_bits(fields.operand2);
        let v2 = fields.operand2;

        match op {
            Op::Add => Instruction::Add { dst: r1, src: r2 },
            Op::Mov => Instruction::Mov { dst: r1, imm: v2 },
            Op::Sub => Instruction::Sub { dst: r1, src: r2 },
            Op::Ld => Instruction::Ld { dst: r1, addr: v2 },
            Op::St => Instruction::St { src: r1, addr: v2 },
            Op::Jmp => Instruction::Jmp { target: v2 },
            Op::Jz => Instruction::Jz { reg: r1, target: v2 },
            Op::Hlt => Instruction::Hlt,
            Op::And => Instruction::And { dst: r1, src: r2 },
            Op::Or => Instruction::Or { dst: r1, src: r2 },
        }
    }

    /// The operation kind, `None` for [`Instruction::Unknown`].
    pub fn op(&self) -> Option<Op> {
        Some(match self {
            Instruction::Add { .. } => Op::Add,
            Instruction::Mov { .. } => Op::Mov,
            Instruction::Sub { .. } => Op::Sub,
            Instruction::Ld { .. } => Op::Ld,
            Instruction::St { .. } => Op::St,
            Instruction::Jmp { .. } => Op::Jmp,
            Instruction::Jz { .. } => Op::Jz,
            Instruction::Hlt => Op::Hlt,
            Instruction::And { .. } => Op::And,
            Instruction::Or { .. } => Op::Or,
            Instruction::Unknown { .. } => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_fields() {
        let f = decode(0b000_01_011);
        assert_eq!(f, Fields { opcode: 0, operand1: 0b01, operand2: 3 });

        let f = decode(0b111_11_111);
        assert_eq!(f, Fields { opcode: 7, operand1: 3, operand2: 7 });

        let f = decode(0);
        assert_eq!(f, Fields { opcode: 0, operand1: 0, operand2: 0 });
    }

    #[test]
    fn test_identity_map_is_bijective() {
        let resolved: Vec<u8> = (0..4).map(|raw| RegisterMap::Identity.resolve(raw).get()).collect();
        assert_eq!(resolved, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_remapped_collapses_00_and_10_to_r0() {
        let map = RegisterMap::Remapped;
        assert_eq!(map.resolve(0b00), RegisterIndex::R0);
        assert_eq!(map.resolve(0b10), RegisterIndex::R0);
        assert_eq!(map.resolve(0b00), map.resolve(0b10));
        assert_eq!(map.resolve(0b01), RegisterIndex::R0);
        assert_eq!(map.resolve(0b11), RegisterIndex::R1);
    }

    #[test]
    fn test_remapped_cannot_reach_r2_r3() {
        let map = RegisterMap::Remapped;
        for raw in 0..4 {
            let r = map.resolve(raw);
            assert!(r == RegisterIndex::R0 || r == RegisterIndex::R1);
        }
        assert_eq!(map.encode(RegisterIndex::R2), None);
        assert_eq!(map.encode(RegisterIndex::R3), None);
    }

    #[test]
    fn test_map_encode_resolves_back() {
        for map in [RegisterMap::Identity, RegisterMap::Remapped] {
            for reg in RegisterIndex::ALL {
                if let Some(raw) = map.encode(reg) {
                    assert_eq!(map.resolve(raw), reg);
                }
            }
        }
    }

    #[test]
    fn test_resolve_reference_words() {
        // ADD R0, R3 as written for the remapped encoding
        let add = Instruction::resolve(decode(0b000_01_011), Some(Op::Add), RegisterMap::Remapped);
        assert_eq!(add, Instruction::Add { dst: RegisterIndex::R0, src: RegisterIndex::R3 });

        // MOV R1, #0 as written for the identity encoding
        let mov = Instruction::resolve(decode(0b001_01_000), Some(Op::Mov), RegisterMap::Identity);
        assert_eq!(mov, Instruction::Mov { dst: RegisterIndex::R1, imm: 0 });
    }

    #[test]
    fn test_source_register_uses_low_bits() {
        let add = Instruction::resolve(decode(0b000_00_110), Some(Op::Add), RegisterMap::Identity);
        assert_eq!(add, Instruction::Add { dst: RegisterIndex::R0, src: RegisterIndex::R2 });
    }

    #[test]
    fn test_missing_table_entry_is_unknown() {
        let instr = Instruction::resolve(decode(0b110_00_000), None, RegisterMap::Identity);
        assert_eq!(instr, Instruction::Unknown { opcode: 6 });
        assert_eq!(instr.op(), None);
    }

    #[test]
    fn test_register_index_range() {
        assert!(RegisterIndex::new(3).is_some());
        assert!(RegisterIndex::new(4).is_none());
        assert!(RegisterIndex::try_from(9u8).is_err());
    }

    proptest! {
        #[test]
        fn prop_decode_encode_total(word in any::<u8>()) {
            let f = decode(word);
            prop_assert!(f.opcode <= 7);
            prop_assert!(f.operand1 <= 3);
            prop_assert!(f.operand2 <= 7);
            prop_assert_eq!(encode(f.opcode, f.operand1, f.operand2), word);
        }

        #[test]
        fn prop_register_maps_stay_in_range(raw in any::<u8>()) {
            prop_assert!(RegisterMap::Identity.resolve(raw).get() <= 3);
            prop_assert!(RegisterMap::Remapped.resolve(raw).get() <= 1);
        }
    }
}
