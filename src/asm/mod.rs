//! Program front end.
//!
//! - a line loader for the `0`/`1` text format (with `END` terminator)
//! - a two-pass assembler (mnemonics → words)
//! - a disassembler (words → mnemonics)

pub mod assembler;
pub mod disasm;
pub mod loader;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_word};
pub use loader::{
    load_program_file, parse_program, write_program, LoadDiagnostic, LoadError, LoadReport,
    ProgramLoader,
};
