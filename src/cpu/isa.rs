//! Opcode tables.
//!
//! The engine never matches on raw opcode numbers. It looks the opcode up
//! in an [`OpcodeTable`], so the two instruction-set profiles differ only
//! in which [`Op`] sits in slots 6 and 7.

use serde::{Serialize, Deserialize};
use std::fmt;

/// Number of opcode slots (3-bit opcode field).
pub const OPCODE_SLOTS: usize = 8;

/// Operation kind, independent of its opcode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Op {
    Add,
    Mov,
    Sub,
    Ld,
    St,
    Jmp,
    Jz,
    Hlt,
    And,
    Or,
}

impl Op {
    pub const ALL: [Op; 10] = [
        Op::Add, Op::Mov, Op::Sub, Op::Ld, Op::St,
        Op::Jmp, Op::Jz, Op::Hlt, Op::And, Op::Or,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Add => "ADD",
            Op::Mov => "MOV",
            Op::Sub => "SUB",
            Op::Ld => "LD",
            Op::St => "ST",
            Op::Jmp => "JMP",
            Op::Jz => "JZ",
            Op::Hlt => "HLT",
            Op::And => "AND",
            Op::Or => "OR",
        }
    }

    /// Case-insensitive mnemonic lookup.
    pub fn from_mnemonic(s: &str) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.mnemonic().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// The two built-in instruction-set profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Profile A: `110` = JZ, `111` = HLT.
    Jump,
    /// Profile B: `110` = AND, `111` = OR. No halt instruction.
    Bitwise,
}

impl Profile {
    pub fn table(self) -> OpcodeTable {
        OpcodeTable::for_profile(self)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Jump => write!(f, "jump"),
            Profile::Bitwise => write!(f, "bitwise"),
        }
    }
}

/// Mapping from 3-bit opcode to operation. Empty slots decode as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeTable {
    slots: [Option<Op>; OPCODE_SLOTS],
}

impl OpcodeTable {
    const SHARED: [Op; 6] = [Op::Add, Op::Mov, Op::Sub, Op::Ld, Op::St, Op::Jmp];

    /// A table with every slot unassigned.
    pub const fn empty() -> Self {
        Self { slots: [None; OPCODE_SLOTS] }
    }

    pub fn for_profile(profile: Profile) -> Self {
        let mut table = Self::empty();
        for (opcode, op) in Self::SHARED.into_iter().enumerate() {
            table.slots[opcode] = Some(op);
        }
        let (six, seven) = match profile {
            Profile::Jump => (Op::Jz, Op::Hlt),
            Profile::Bitwise => (Op::And, Op::Or),
        };
        table.slots[6] = Some(six);
        table.slots[7] = Some(seven);
        table
    }

    /// Look up an opcode. Only the low three bits are significant.
    #[inline]
    pub fn get(&self, opcode: u8) -> Option<Op> {
        self.slots[usize::from(opcode) % OPCODE_SLOTS]
    }

    /// Assign (or clear) one slot, builder style.
    pub fn with(mut self, opcode: u8, op: Option<Op>) -> Self {
        self.slots[usize::from(opcode) % OPCODE_SLOTS] = op;
        self
    }

    /// Reverse lookup: the first opcode bound to `op`.
    pub fn opcode_of(&self, op: Op) -> Option<u8> {
        self.slots
            .iter()
            .position(|slot| *slot == Some(op))
            .map(|i| i as u8)
    }

    /// True when all eight opcodes are assigned.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn slots(&self) -> &[Option<Op>; OPCODE_SLOTS] {
        &self.slots
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_a_table() {
        let t = OpcodeTable::for_profile(Profile::Jump);
        let expected = [Op::Add, Op::Mov, Op::Sub, Op::Ld, Op::St, Op::Jmp, Op::Jz, Op::Hlt];
        for (opcode, op) in expected.into_iter().enumerate() {
            assert_eq!(t.get(opcode as u8), Some(op));
        }
        assert!(t.is_complete());
    }

    #[test]
    fn test_profile_b_differs_only_in_top_slots() {
        let a = Profile::Jump.table();
        let b = Profile::Bitwise.table();
        for opcode in 0..6 {
            assert_eq!(a.get(opcode), b.get(opcode));
        }
        assert_eq!(b.get(6), Some(Op::And));
        assert_eq!(b.get(7), Some(Op::Or));
        assert_eq!(b.opcode_of(Op::Hlt), None);
    }

    #[test]
    fn test_narrow_table() {
        let t = Profile::Jump.table().with(7, None);
        assert_eq!(t.get(7), None);
        assert!(!t.is_complete());
        assert_eq!(t.opcode_of(Op::Jz), Some(6));
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(Op::from_mnemonic("jz"), Some(Op::Jz));
        assert_eq!(Op::from_mnemonic("HLT"), Some(Op::Hlt));
        assert_eq!(Op::from_mnemonic("NOP"), None);
    }

    #[test]
    fn test_table_json_shape() {
        let t = Profile::Bitwise.table().with(5, None);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"AND\""));
        assert!(json.contains("null"));
        let back: OpcodeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
