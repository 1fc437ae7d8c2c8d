//! Execution trace.
//!
//! One [`TraceEvent`] is produced per dispatched instruction. Its
//! `Display` form is the line format downstream tools compare against, so
//! the templates below must not change.

use crate::cpu::decode::RegisterIndex;
use serde::{Serialize, Deserialize};
use std::fmt;
use std::io::{self, Write};

/// What a single dispatched instruction did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceEvent {
    Add { dst: RegisterIndex, src: RegisterIndex, result: u8 },
    Mov { dst: RegisterIndex, value: u8 },
    Sub { dst: RegisterIndex, src: RegisterIndex, result: u8 },
    Ld { dst: RegisterIndex, addr: u8, value: u8 },
    St { addr: u8, src: RegisterIndex, value: u8 },
    Jmp { target: u8 },
    JzTaken { reg: RegisterIndex, target: u8 },
    JzNotTaken { reg: RegisterIndex },
    Halt,
    And { dst: RegisterIndex, src: RegisterIndex, result: u8 },
    Or { dst: RegisterIndex, src: RegisterIndex, result: u8 },
    Unknown { opcode: u8 },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TraceEvent::Add { dst, src, result } => write!(f, "R{dst} = R{dst} + R{src} = {result}"),
            TraceEvent::Mov { dst, value } => write!(f, "R{dst} = {value}"),
            TraceEvent::Sub { dst, src, result } => write!(f, "R{dst} = R{dst} - R{src} = {result}"),
            TraceEvent::Ld { dst, addr, value } => write!(f, "R{dst} = MEM[{addr}] = {value}"),
            TraceEvent::St { addr, src, value } => write!(f, "MEM[{addr}] = R{src} = {value}"),
            TraceEvent::Jmp { target } => write!(f, "JMP to {target}"),
            TraceEvent::JzTaken { reg, target } => write!(f, "JZ: R{reg} == 0, jump to {target}"),
            TraceEvent::JzNotTaken { reg } => write!(f, "JZ: R{reg} != 0, no jump"),
            TraceEvent::Halt => write!(f, "HLT: Halting"),
            TraceEvent::And { dst, src, result } => write!(f, "R{dst} = R{dst} & R{src} = {result}"),
            TraceEvent::Or { dst, src, result } => write!(f, "R{dst} = R{dst} | R{src} = {result}"),
            TraceEvent::Unknown { opcode } => write!(f, "Unknown opcode: {opcode}"),
        }
    }
}

/// Receiver for trace events.
pub trait TraceSink {
    fn emit(&mut self, event: &TraceEvent);
}

/// Collect events in memory.
impl TraceSink for Vec<TraceEvent> {
    fn emit(&mut self, event: &TraceEvent) {
        self.push(*event);
    }
}

/// Collect rendered lines in memory.
impl TraceSink for Vec<String> {
    fn emit(&mut self, event: &TraceEvent) {
        self.push(event.to_string());
    }
}

/// Discard all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn emit(&mut self, _event: &TraceEvent) {}
}

/// Output encoding for [`WriteTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// One human-readable line per event.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Write events to any [`Write`] implementation.
///
/// The first I/O error is kept and later events are dropped; call
/// [`WriteTrace::finish`] to observe it.
pub struct WriteTrace<W: Write> {
    writer: W,
    format: TraceFormat,
    error: Option<io::Error>,
}

impl<W: Write> WriteTrace<W> {
    pub fn new(writer: W, format: TraceFormat) -> Self {
        Self { writer, format, error: None }
    }

    /// Flush and return the writer, or the first error hit while tracing.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_event(&mut self, event: &TraceEvent) -> io::Result<()> {
        match self.format {
            TraceFormat::Text => writeln!(self.writer, "{}", event),
            TraceFormat::Json => {
                serde_json::to_writer(&mut self.writer, event)?;
                writeln!(self.writer)
            }
        }
    }
}

impl<W: Write> TraceSink for WriteTrace<W> {
    fn emit(&mut self, event: &TraceEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write_event(event) {
            log::error!("trace output failed: {}", e);
            self.error = Some(e);
        }
    }
}
