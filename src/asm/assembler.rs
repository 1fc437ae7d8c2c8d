//! Simple assembler.
//!
//! Syntax:
//! ```text
//! ; Comment
//! loop:               ; Define a label (index of the next word)
//!     MOV R1, #1      ; Immediate 0-7
//!     ADD R0, R3      ; Register, register
//!     LD  R2, [5]     ; Load from memory cell 5
//!     ST  R2, [6]     ; Store to memory cell 6
//!     JZ  R0, done    ; Jump target is a label or 0-7
//!     JMP loop
//! done:
//!     HLT
//!     WORD 0b10100010 ; Raw instruction word
//! ```
//!
//! Opcode numbers come from the engine's opcode table and destination
//! registers are encoded through its register map, so the same source
//! assembles differently for each configuration.

use crate::cpu::decode::{encode, FIELD3_MASK};
use crate::cpu::isa::Op;
use crate::cpu::program::MAX_PROGRAM_LEN;
use crate::cpu::{Cpu, RegisterIndex};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to instruction words for `cpu`.
pub fn assemble(source: &str, cpu: &Cpu) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new(cpu);
    asm.assemble(source)
}

/// A parsed source line awaiting encoding.
enum Statement {
    Instruction { op: Op, operands: Vec<String> },
    Word(u8),
}

/// The assembler state.
struct Assembler<'a> {
    cpu: &'a Cpu,
    /// Symbol table (label -> word index).
    symbols: HashMap<String, usize>,
    /// Statements in output order with their source line.
    statements: Vec<(usize, Statement)>,
}

impl<'a> Assembler<'a> {
    fn new(cpu: &'a Cpu) -> Self {
        Self {
            cpu,
            symbols: HashMap::new(),
            statements: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: collect labels and statements
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        if self.statements.len() > MAX_PROGRAM_LEN {
            return Err(AssemblerError::ProgramTooLarge {
                size: self.statements.len(),
                max: MAX_PROGRAM_LEN,
            });
        }

        // Pass 2: encode with all labels known
        self.statements
            .iter()
            .map(|(line_num, stmt)| match stmt {
                Statement::Word(word) => Ok(*word),
                Statement::Instruction { op, operands } => self.encode_instruction(*op, operands, *line_num),
            })
            .collect()
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        // Label definition, optionally followed by a statement
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label {:?}", &line[..colon_idx]),
                });
            }
            if self.symbols.insert(label.clone(), self.statements.len()).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }
            line = line[colon_idx + 1..].trim();
        }

        if line.is_empty() {
            return Ok(());
        }

        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, r)) => (m, r.trim()),
            None => (line, ""),
        };
        let operands: Vec<String> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(|s| s.trim().to_string()).collect()
        };

        let mnemonic = mnemonic.to_uppercase();
        let statement = if mnemonic == "WORD" || mnemonic == "DB" {
            expect_operands(&mnemonic, &operands, 1, line_num)?;
            let value = parse_number(&operands[0], line_num)?;
            let word = u8::try_from(value)
                .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })?;
            Statement::Word(word)
        } else {
            let op = Op::from_mnemonic(&mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic: mnemonic.clone(),
            })?;
            Statement::Instruction { op, operands }
        };

        self.statements.push((line_num, statement));
        Ok(())
    }

    fn encode_instruction(&self, op: Op, operands: &[String], line: usize) -> Result<u8, AssemblerError> {
        let opcode = self.cpu.table().opcode_of(op).ok_or_else(|| AssemblerError::NotInTable {
            line,
            mnemonic: op.mnemonic().to_string(),
        })?;
        let mnemonic = op.mnemonic();

        let (op1, op2) = match op {
            Op::Add | Op::Sub | Op::And | Op::Or => {
                expect_operands(mnemonic, operands, 2, line)?;
                let dst = self.destination(&operands[0], line)?;
                let src = parse_register(&operands[1], line)?;
                (dst, src.get())
            }
            Op::Mov => {
                expect_operands(mnemonic, operands, 2, line)?;
                let dst = self.destination(&operands[0], line)?;
                let imm = operands[1].strip_prefix('#').unwrap_or(&operands[1]);
                (dst, field3(parse_number(imm, line)?, line)?)
            }
            Op::Ld | Op::St => {
                expect_operands(mnemonic, operands, 2, line)?;
                let reg = self.destination(&operands[0], line)?;
                (reg, field3(parse_number(strip_brackets(&operands[1]), line)?, line)?)
            }
            Op::Jmp => {
                expect_operands(mnemonic, operands, 1, line)?;
                (0, self.target(&operands[0], line)?)
            }
            Op::Jz => {
                expect_operands(mnemonic, operands, 2, line)?;
                let reg = self.destination(&operands[0], line)?;
                (reg, self.target(&operands[1], line)?)
            }
            Op::Hlt => {
                expect_operands(mnemonic, operands, 0, line)?;
                (0, 0)
            }
        };

        Ok(encode(opcode, op1, op2))
    }

    /// Raw operand1 code for a register under the active register map.
    fn destination(&self, text: &str, line: usize) -> Result<u8, AssemblerError> {
        let reg = parse_register(text, line)?;
        self.cpu.register_map().encode(reg).ok_or_else(|| AssemblerError::RegisterUnreachable {
            line,
            register: reg.get(),
            map: self.cpu.register_map().to_string(),
        })
    }

    /// Jump target: a label or a number that fits operand2.
    fn target(&self, text: &str, line: usize) -> Result<u8, AssemblerError> {
        let value = match self.symbols.get(&text.to_uppercase()) {
            Some(&index) => index as i64,
            None if text.starts_with(|c: char| c.is_ascii_digit()) => parse_number(text, line)?,
            None => {
                return Err(AssemblerError::UndefinedLabel { line, label: text.to_string() });
            }
        };
        field3(value, line)
    }
}

fn expect_operands(mnemonic: &str, operands: &[String], count: usize, line: usize) -> Result<(), AssemblerError> {
    if operands.len() != count {
        return Err(AssemblerError::SyntaxError {
            line,
            message: format!("{} takes {} operand(s), found {}", mnemonic, count, operands.len()),
        });
    }
    Ok(())
}

fn parse_register(text: &str, line: usize) -> Result<RegisterIndex, AssemblerError> {
    text.strip_prefix(['R', 'r'])
        .and_then(|n| n.parse::<u8>().ok())
        .and_then(RegisterIndex::new)
        .ok_or_else(|| AssemblerError::SyntaxError {
            line,
            message: format!("expected register R0-R3, found {:?}", text),
        })
}

fn parse_number(text: &str, line: usize) -> Result<i64, AssemblerError> {
    let text = text.trim();
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else {
        text.parse::<i64>()
    };
    parsed.map_err(|_| AssemblerError::SyntaxError {
        line,
        message: format!("invalid number {:?}", text),
    })
}

fn strip_brackets(text: &str) -> &str {
    text.strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .map(str::trim)
        .unwrap_or(text)
}

/// Check that a value fits the 3-bit operand2 field.
fn field3(value: i64, line: usize) -> Result<u8, AssemblerError> {
    if (0..=i64::from(FIELD3_MASK)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(AssemblerError::ValueOutOfRange { line, value })
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("{mnemonic} on line {line} has no opcode in the active table")]
    NotInTable { line: usize, mnemonic: String },

    #[error("R{register} on line {line} cannot be encoded with the {map} register map")]
    RegisterUnreachable { line: usize, register: u8, map: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("program has {size} words, more than the {max} allowed")]
    ProgramTooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{Profile, RegisterMap};

    fn jump_identity() -> Cpu {
        Cpu::for_profile(Profile::Jump, RegisterMap::Identity)
    }

    #[test]
    fn test_reference_encodings() {
        let remapped = Cpu::for_profile(Profile::Jump, RegisterMap::Remapped);
        let words = assemble("ADD R0, R3\nMOV R1, #0", &remapped).unwrap();
        assert_eq!(words, vec![0b000_01_011, 0b001_11_000]);

        let identity = Cpu::for_profile(Profile::Bitwise, RegisterMap::Identity);
        let words = assemble("ADD R0, R3\nMOV R1, #0", &identity).unwrap();
        assert_eq!(words, vec![0b000_00_011, 0b001_01_000]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        start:
            JMP end     ; skip the MOV
            MOV R0, #5
        end:
            HLT
        "#;
        let words = assemble(source, &jump_identity()).unwrap();
        assert_eq!(words, vec![0b101_00_010, 0b001_00_101, 0b111_00_000]);
    }

    #[test]
    fn test_memory_operands() {
        let words = assemble("LD R2, [5]\nST R3, 6", &jump_identity()).unwrap();
        assert_eq!(words, vec![0b011_10_101, 0b100_11_110]);
    }

    #[test]
    fn test_raw_word() {
        let words = assemble("WORD 0b11100000\nDB 0xA2\nWORD 7", &jump_identity()).unwrap();
        assert_eq!(words, vec![0xE0, 0xA2, 7]);
        assert!(matches!(
            assemble("WORD 256", &jump_identity()),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        ));
    }

    #[test]
    fn test_halt_not_in_bitwise_table() {
        let cpu = Cpu::for_profile(Profile::Bitwise, RegisterMap::Identity);
        assert!(matches!(assemble("HLT", &cpu), Err(AssemblerError::NotInTable { .. })));
        assert_eq!(assemble("OR R1, R2", &cpu).unwrap(), vec![0b111_01_010]);
    }

    #[test]
    fn test_remapped_rejects_high_destinations() {
        let cpu = Cpu::for_profile(Profile::Jump, RegisterMap::Remapped);
        let err = assemble("MOV R2, #1", &cpu).unwrap_err();
        assert!(matches!(err, AssemblerError::RegisterUnreachable { register: 2, .. }));
        // Source registers do not go through the map
        assert!(assemble("ADD R1, R2", &cpu).is_ok());
    }

    #[test]
    fn test_out_of_range_operands() {
        let cpu = jump_identity();
        assert!(matches!(assemble("MOV R0, #8", &cpu), Err(AssemblerError::ValueOutOfRange { value: 8, .. })));
        assert!(matches!(assemble("JMP 9", &cpu), Err(AssemblerError::ValueOutOfRange { .. })));
        assert!(matches!(assemble("ADD R0, R4", &cpu), Err(AssemblerError::SyntaxError { .. })));
    }

    #[test]
    fn test_label_errors() {
        let cpu = jump_identity();
        assert!(matches!(assemble("JMP nowhere", &cpu), Err(AssemblerError::UndefinedLabel { line: 1, .. })));
        assert!(matches!(
            assemble("a:\nHLT\na:\nHLT", &cpu),
            Err(AssemblerError::DuplicateLabel { line: 3, .. })
        ));
    }

    #[test]
    fn test_label_beyond_operand_range() {
        let mut source = String::new();
        for _ in 0..8 {
            source.push_str("MOV R0, #0\n");
        }
        source.push_str("far: HLT\nJMP far\n");
        assert!(matches!(
            assemble(&source, &jump_identity()),
            Err(AssemblerError::ValueOutOfRange { value: 8, .. })
        ));
    }

    #[test]
    fn test_unknown_mnemonic_and_arity() {
        let cpu = jump_identity();
        assert!(matches!(assemble("NOP", &cpu), Err(AssemblerError::UnknownMnemonic { .. })));
        assert!(matches!(assemble("HLT R0", &cpu), Err(AssemblerError::SyntaxError { .. })));
    }
}
