//! The 8-bit machine.
//!
//! - 4 eight-bit registers R0-R3
//! - 8 bytes of data memory
//! - 8-bit instructions: 3-bit opcode, 2-bit register, 3-bit operand
//! - two opcode tables: jump/halt (profile A) and bitwise (profile B)

pub mod decode;
pub mod execute;
pub mod isa;
pub mod memory;
pub mod program;
pub mod registers;
pub mod trace;

pub use decode::{decode, encode, Fields, Instruction, RegisterIndex, RegisterMap};
pub use execute::{execute, Cpu, PcUpdate, RunSummary, StopReason, VmState};
pub use isa::{Op, OpcodeTable, Profile};
pub use memory::Memory;
pub use program::{Program, ProgramError, MAX_PROGRAM_LEN};
pub use registers::Registers;
pub use trace::{NullTrace, TraceEvent, TraceFormat, TraceSink, WriteTrace};
