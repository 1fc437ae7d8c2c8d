//! Disassembler.
//!
//! Converts instruction words back to the assembler's text syntax. The
//! output depends on the opcode table and register map of the engine.

use crate::asm::loader::format_word;
use crate::cpu::{Cpu, Instruction};

/// Format a resolved instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        Instruction::Add { dst, src } => format!("ADD R{}, R{}", dst, src),
        Instruction::Mov { dst, imm } => format!("MOV R{}, #{}", dst, imm),
        Instruction::Sub { dst, src } => format!("SUB R{}, R{}", dst, src),
        Instruction::Ld { dst, addr } => format!("LD R{}, [{}]", dst, addr),
        Instruction::St { src, addr } => format!("ST R{}, [{}]", src, addr),
        Instruction::Jmp { target } => format!("JMP {}", target),
        Instruction::Jz { reg, target } => format!("JZ R{}, {}", reg, target),
        Instruction::Hlt => "HLT".to_string(),
        Instruction::And { dst, src } => format!("AND R{}, R{}", dst, src),
        Instruction::Or { dst, src } => format!("OR R{}, R{}", dst, src),
        Instruction::Unknown { opcode } => format!("??? ; opcode {}", opcode),
    }
}

/// Disassemble a single word.
pub fn disassemble_word(cpu: &Cpu, word: u8) -> String {
    format_instruction(&cpu.decode(word))
}

/// Disassemble a program listing, one `index: bits  text` line per word.
pub fn disassemble(cpu: &Cpu, words: &[u8]) -> String {
    let mut output = String::new();
    let table: Vec<&str> = cpu
        .table()
        .slots()
        .iter()
        .map(|slot| slot.map_or("-", |op| op.mnemonic()))
        .collect();
    output.push_str(&format!("; opcodes 0-7: {}\n", table.join(" ")));
    output.push_str(&format!("; register map: {}\n\n", cpu.register_map()));

    for (addr, &word) in words.iter().enumerate() {
        output.push_str(&format!("{:03}: {}  {}\n", addr, format_word(word), disassemble_word(cpu, word)));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{encode, Profile, RegisterMap};

    #[test]
    fn test_reference_words_remapped() {
        let cpu = Cpu::for_profile(Profile::Jump, RegisterMap::Remapped);
        assert_eq!(disassemble_word(&cpu, 0b000_01_011), "ADD R0, R3");
        assert_eq!(disassemble_word(&cpu, 0b001_11_000), "MOV R1, #0");
    }

    #[test]
    fn test_reference_words_identity() {
        let cpu = Cpu::for_profile(Profile::Bitwise, RegisterMap::Identity);
        assert_eq!(disassemble_word(&cpu, 0b000_00_011), "ADD R0, R3");
        assert_eq!(disassemble_word(&cpu, 0b001_01_000), "MOV R1, #0");
    }

    #[test]
    fn test_profile_changes_top_opcodes() {
        let word = encode(6, 2, 1);
        let a = Cpu::for_profile(Profile::Jump, RegisterMap::Identity);
        let b = Cpu::for_profile(Profile::Bitwise, RegisterMap::Identity);
        assert_eq!(disassemble_word(&a, word), "JZ R2, 1");
        assert_eq!(disassemble_word(&b, word), "AND R2, R1");
        assert_eq!(disassemble_word(&a, encode(7, 0, 0)), "HLT");
        assert_eq!(disassemble_word(&b, encode(7, 3, 2)), "OR R3, R2");
    }

    #[test]
    fn test_memory_and_unknown() {
        let cpu = Cpu::new(Profile::Jump.table().with(5, None), RegisterMap::Identity);
        assert_eq!(disassemble_word(&cpu, encode(3, 1, 4)), "LD R1, [4]");
        assert_eq!(disassemble_word(&cpu, encode(4, 2, 7)), "ST R2, [7]");
        assert!(disassemble_word(&cpu, encode(5, 0, 2)).starts_with("???"));
    }

    #[test]
    fn test_listing() {
        let cpu = Cpu::for_profile(Profile::Jump, RegisterMap::Identity);
        let listing = disassemble(&cpu, &[encode(5, 0, 2), encode(7, 0, 0)]);
        assert!(listing.contains("000: 10100010  JMP 2\n"));
        assert!(listing.contains("001: 11100000  HLT\n"));
        assert!(listing.starts_with("; opcodes 0-7: ADD MOV SUB LD ST JMP JZ HLT\n"));
    }
}
