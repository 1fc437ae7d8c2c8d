//! # Octet
//!
//! An interpreter for a tiny 8-bit instruction set.
//!
//! Each instruction is one byte: a 3-bit opcode, a 2-bit register field
//! and a 3-bit operand. The machine has four 8-bit registers, eight bytes
//! of memory and a program counter into a fixed-capacity program. Every
//! executed instruction produces one trace line.
//!
//! ```
//! use octet::{Cpu, Profile, Program, RegisterMap, VmState};
//!
//! let cpu = Cpu::for_profile(Profile::Jump, RegisterMap::Identity);
//! let program = Program::from_words(&[0b101_00_010, 0b001_00_101, 0b111_00_000]).unwrap();
//! let mut state = VmState::new();
//! let mut trace: Vec<String> = Vec::new();
//! cpu.run(&mut state, &program, &mut trace);
//! assert_eq!(trace, ["JMP to 2", "HLT: Halting"]);
//! ```

pub mod asm;
pub mod config;
pub mod cpu;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use asm::{assemble, disassemble, AssemblerError, LoadReport, ProgramLoader};
pub use config::{load_config, ConfigError, VmConfig};
pub use cpu::{
    Cpu, Instruction, Memory, Op, OpcodeTable, Profile, Program, RegisterIndex, RegisterMap,
    Registers, RunSummary, StopReason, TraceEvent, TraceSink, VmState,
};
