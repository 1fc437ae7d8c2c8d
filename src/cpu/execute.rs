//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! Machine state lives in a caller-owned [`VmState`]; the [`Cpu`] only
//! holds the decoding configuration and is never mutated by a run.

use crate::config::VmConfig;
use crate::cpu::decode::{self, Instruction, RegisterMap};
use crate::cpu::isa::{OpcodeTable, Profile};
use crate::cpu::program::Program;
use crate::cpu::trace::{TraceEvent, TraceSink};
use crate::cpu::{Memory, Registers};
use serde::{Serialize, Deserialize};

/// Mutable machine state for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmState {
    /// R0-R3.
    pub regs: Registers,
    /// Data memory.
    pub mem: Memory,
    /// Index of the next instruction to fetch.
    pub pc: usize,
    /// Cleared by HLT.
    pub running: bool,
    /// Instructions dispatched so far.
    pub cycles: u64,
}

impl VmState {
    /// Zeroed registers and memory, PC at 0, running.
    pub fn new() -> Self {
        Self::with(Registers::new(), Memory::new())
    }

    pub fn with(regs: Registers, mem: Memory) -> Self {
        Self {
            regs,
            mem,
            pc: 0,
            running: true,
            cycles: 0,
        }
    }

    /// Initial state as described by a configuration.
    pub fn from_config(config: &VmConfig) -> Self {
        Self::with(
            Registers::from_values(config.registers),
            Memory::from_cells(config.memory),
        )
    }

    /// True while another instruction may be fetched from `program`.
    #[inline]
    pub fn can_fetch(&self, program: &Program) -> bool {
        self.running && self.pc < program.len()
    }
}

impl Default for VmState {
    fn default() -> Self {
        Self::new()
    }
}

/// How the program counter moves after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcUpdate {
    /// PC := PC + 1
    Increment,
    /// PC := target, no increment.
    JumpTo(u8),
    /// Clear the running flag. PC is left on the halting instruction.
    Halt,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// HLT was executed.
    Halted,
    /// PC left the program.
    EndOfProgram,
}

/// Result of [`Cpu::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stop: StopReason,
    /// Instructions dispatched during this call.
    pub executed: u64,
}

/// Execute one resolved instruction against `state`.
///
/// Touches registers and memory only; the caller applies the returned
/// [`PcUpdate`].
pub fn execute(state: &mut VmState, instr: Instruction) -> (PcUpdate, TraceEvent) {
    let regs = &mut state.regs;

    match instr {
        Instruction::Add { dst, src } => {
            let result = regs.add(dst, src);
            (PcUpdate::Increment, TraceEvent::Add { dst, src, result })
        }

        Instruction::Mov { dst, imm } => {
            regs.write(dst, imm);
            (PcUpdate::Increment, TraceEvent::Mov { dst, value: imm })
        }

        Instruction::Sub { dst, src } => {
            let result = regs.sub(dst, src);
            (PcUpdate::Increment, TraceEvent::Sub { dst, src, result })
        }

        Instruction::Ld { dst, addr } => {
            let value = state.mem.read(addr);
            regs.write(dst, value);
            (PcUpdate::Increment, TraceEvent::Ld { dst, addr, value })
        }

        Instruction::St { src, addr } => {
            let value = regs.read(src);
            state.mem.write(addr, value);
            (PcUpdate::Increment, TraceEvent::St { addr, src, value })
        }

        Instruction::Jmp { target } => (PcUpdate::JumpTo(target), TraceEvent::Jmp { target }),

        Instruction::Jz { reg, target } => {
            if regs.read(reg) == 0 {
                (PcUpdate::JumpTo(target), TraceEvent::JzTaken { reg, target })
            } else {
                (PcUpdate::Increment, TraceEvent::JzNotTaken { reg })
            }
        }

        Instruction::Hlt => (PcUpdate::Halt, TraceEvent::Halt),

        Instruction::And { dst, src } => {
            let result = regs.and(dst, src);
            (PcUpdate::Increment, TraceEvent::And { dst, src, result })
        }

        Instruction::Or { dst, src } => {
            let result = regs.or(dst, src);
            (PcUpdate::Increment, TraceEvent::Or { dst, src, result })
        }

        Instruction::Unknown { opcode } => {
            log::warn!("unknown opcode {} at pc {}, skipping", opcode, state.pc);
            (PcUpdate::Increment, TraceEvent::Unknown { opcode })
        }
    }
}

/// The decode/dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cpu {
    table: OpcodeTable,
    map: RegisterMap,
}

impl Cpu {
    pub fn new(table: OpcodeTable, map: RegisterMap) -> Self {
        Self { table, map }
    }

    /// Engine for one of the built-in profiles.
    pub fn for_profile(profile: Profile, map: RegisterMap) -> Self {
        Self::new(OpcodeTable::for_profile(profile), map)
    }

    pub fn from_config(config: &VmConfig) -> Self {
        Self::new(config.opcode_table(), config.register_map)
    }

    pub fn table(&self) -> &OpcodeTable {
        &self.table
    }

    pub fn register_map(&self) -> RegisterMap {
        self.map
    }

    /// Decode a word under this engine's table and register map.
    pub fn decode(&self, word: u8) -> Instruction {
        let fields = decode::decode(word);
        Instruction::resolve(fields, self.table.get(fields.opcode), self.map)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was dispatched, or `None` if the
    /// machine is halted or PC is outside the program.
    pub fn step<T: TraceSink + ?Sized>(
        &self,
        state: &mut VmState,
        program: &Program,
        trace: &mut T,
    ) -> Option<Instruction> {
        if !state.running {
            return None;
        }

        // Fetch
        let word = program.fetch(state.pc)?;

        // Decode
        let instr = self.decode(word);
        log::debug!("pc={:03} word={:08b} {:?}", state.pc, word, instr);

        // Execute
        let (update, event) = execute(state, instr);
        trace.emit(&event);

        match update {
            PcUpdate::Increment => state.pc += 1,
            PcUpdate::JumpTo(target) => state.pc = usize::from(target),
            PcUpdate::Halt => state.running = false,
        }
        state.cycles += 1;

        Some(instr)
    }

    /// Run until HLT or until PC leaves the program.
    ///
    /// There is no cycle limit: a program that jumps to itself never
    /// returns. Use [`Cpu::step`] to drive execution with an external bound.
    pub fn run<T: TraceSink + ?Sized>(
        &self,
        state: &mut VmState,
        program: &Program,
        trace: &mut T,
    ) -> RunSummary {
        let start_cycles = state.cycles;

        while state.can_fetch(program) {
            self.step(state, program, trace);
        }

        let stop = if state.running {
            StopReason::EndOfProgram
        } else {
            StopReason::Halted
        };
        let executed = state.cycles - start_cycles;
        log::info!("run finished: {:?} after {} instructions", stop, executed);

        RunSummary { stop, executed }
    }
}
