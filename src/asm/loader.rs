//! Binary line loader.
//!
//! Programs are given one instruction per line as exactly eight `0`/`1`
//! characters, most significant bit first. The literal line `END` (or end
//! of input) finishes the program:
//!
//! ```text
//! 00001011
//! 00111000
//! END
//! ```
//!
//! Bad lines are reported and skipped; they never stop collection.

use crate::cpu::program::{Program, ProgramError, MAX_PROGRAM_LEN};
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Printed before reading a program interactively.
pub const PROMPT: &str = "Enter 8-bit binary instructions (one per line). Type 'END' to run:";

/// Printed for each rejected line.
pub const INVALID_LINE_MESSAGE: &str = "Invalid input. Please enter 8 binary digits.";

/// Line that ends a program.
pub const TERMINATOR: &str = "END";

/// Width of one instruction line.
pub const WORD_BITS: usize = 8;

/// Why a line was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRejection {
    /// Not exactly eight characters.
    WrongLength(usize),
    /// A character other than `0` or `1`.
    NonBinary(char),
    /// Valid word, but the program is already full.
    CapacityExceeded { capacity: usize },
}

impl fmt::Display for LineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRejection::WrongLength(n) => write!(f, "expected {} binary digits, found {} characters", WORD_BITS, n),
            LineRejection::NonBinary(c) => write!(f, "invalid character {:?}", c),
            LineRejection::CapacityExceeded { capacity } => {
                write!(f, "program is full ({} instructions)", capacity)
            }
        }
    }
}

/// A rejected line and where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDiagnostic {
    /// 1-based line number.
    pub line: usize,
    pub text: String,
    pub reason: LineRejection,
}

impl LoadDiagnostic {
    /// The console message for this rejection.
    pub fn message(&self) -> String {
        match self.reason {
            LineRejection::CapacityExceeded { capacity } => {
                format!("Program full ({} instructions). Line ignored.", capacity)
            }
            _ => INVALID_LINE_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for LoadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.reason, self.text)
    }
}

/// Outcome of loading a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub program: Program,
    pub diagnostics: Vec<LoadDiagnostic>,
    /// True if an `END` line was seen, false if input simply ran out.
    pub terminated: bool,
}

/// Parse one instruction line.
pub fn parse_line(line: &str) -> Result<u8, LineRejection> {
    let len = line.chars().count();
    if len != WORD_BITS {
        return Err(LineRejection::WrongLength(len));
    }

    line.chars().try_fold(0u8, |acc, c| match c {
        '0' => Ok(acc << 1),
        '1' => Ok((acc << 1) | 1),
        other => Err(LineRejection::NonBinary(other)),
    })
}

/// Format a word as an instruction line.
pub fn format_word(word: u8) -> String {
    format!("{:08b}", word)
}

/// Collects words from a line source into a [`Program`].
#[derive(Debug, Clone, Copy)]
pub struct ProgramLoader {
    capacity: usize,
}

impl ProgramLoader {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.min(MAX_PROGRAM_LEN) }
    }

    /// Load from a reader, collecting diagnostics into the report.
    pub fn load<R: BufRead>(&self, reader: R) -> Result<LoadReport, LoadError> {
        self.load_with(reader, |_| {})
    }

    /// Load from a reader, calling `on_reject` as soon as a line is rejected.
    pub fn load_with<R, F>(&self, mut reader: R, mut on_reject: F) -> Result<LoadReport, LoadError>
    where
        R: BufRead,
        F: FnMut(&LoadDiagnostic),
    {
        let mut program = Program::with_capacity(self.capacity);
        let mut diagnostics = Vec::new();
        let mut terminated = false;
        let mut buf = Vec::new();
        let mut line_num = 0;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| LoadError::Io(e.to_string()))?;
            if read == 0 {
                break;
            }
            line_num += 1;

            let bytes = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
            // Invalid UTF-8 becomes U+FFFD, which parse_line rejects as non-binary
            let text = String::from_utf8_lossy(bytes);
            let line: &str = &text;

            if line == TERMINATOR {
                terminated = true;
                break;
            }

            let rejection = match parse_line(line) {
                Ok(word) => match program.push(word) {
                    Ok(()) => continue,
                    Err(ProgramError::CapacityExceeded { capacity }) => {
                        LineRejection::CapacityExceeded { capacity }
                    }
                },
                Err(reason) => reason,
            };

            let diagnostic = LoadDiagnostic {
                line: line_num,
                text: line.to_string(),
                reason: rejection,
            };
            log::warn!("rejected {}", diagnostic);
            on_reject(&diagnostic);
            diagnostics.push(diagnostic);
        }

        log::debug!("loaded {} instructions, {} rejected lines", program.len(), diagnostics.len());

        Ok(LoadReport { program, diagnostics, terminated })
    }
}

impl Default for ProgramLoader {
    fn default() -> Self {
        Self::new(MAX_PROGRAM_LEN)
    }
}

/// Load a program from text already in memory.
pub fn parse_program(text: &str, capacity: usize) -> Result<LoadReport, LoadError> {
    ProgramLoader::new(capacity).load(text.as_bytes())
}

/// Load a program file from disk.
pub fn load_program_file<P: AsRef<Path>>(path: P, capacity: usize) -> Result<LoadReport, LoadError> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| LoadError::Io(e.to_string()))?;
    ProgramLoader::new(capacity).load(BufReader::new(file))
}

/// Write a program in loader format, terminated by `END`.
pub fn write_program<W: Write>(mut writer: W, words: &[u8]) -> Result<(), LoadError> {
    for &word in words {
        writeln!(writer, "{}", format_word(word)).map_err(|e| LoadError::Io(e.to_string()))?;
    }
    writeln!(writer, "{}", TERMINATOR).map_err(|e| LoadError::Io(e.to_string()))?;
    Ok(())
}

/// Errors that stop loading altogether.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("00001011"), Ok(0b0000_1011));
        assert_eq!(parse_line("11111111"), Ok(255));
        assert_eq!(parse_line("0000101"), Err(LineRejection::WrongLength(7)));
        assert_eq!(parse_line("000010111"), Err(LineRejection::WrongLength(9)));
        assert_eq!(parse_line("0000x011"), Err(LineRejection::NonBinary('x')));
        assert_eq!(parse_line(""), Err(LineRejection::WrongLength(0)));
    }

    #[test]
    fn test_load_until_end() {
        let report = parse_program("00001011\n00111000\nEND\n10100000\n", MAX_PROGRAM_LEN).unwrap();
        assert_eq!(report.program.words(), &[0b0000_1011, 0b0011_1000]);
        assert!(report.terminated);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_bad_lines_skipped() {
        let text = "00001011\nhello\n0101\n 0001011\n00111000\n";
        let report = parse_program(text, MAX_PROGRAM_LEN).unwrap();
        assert_eq!(report.program.len(), 2);
        assert!(!report.terminated);
        let lines: Vec<usize> = report.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert_eq!(report.diagnostics[0].message(), INVALID_LINE_MESSAGE);
    }

    #[test]
    fn test_end_must_be_exact() {
        let report = parse_program("end\nEND \nEND\n", MAX_PROGRAM_LEN).unwrap();
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.terminated);
    }

    #[test]
    fn test_crlf_input() {
        let report = parse_program("11100000\r\nEND\r\n", MAX_PROGRAM_LEN).unwrap();
        assert_eq!(report.program.words(), &[0b1110_0000]);
        assert!(report.terminated);
    }

    #[test]
    fn test_capacity_overflow_rejected() {
        let report = parse_program("00000000\n00000001\n00000010\nEND\n", 2).unwrap();
        assert_eq!(report.program.words(), &[0, 1]);
        assert_eq!(
            report.diagnostics[0].reason,
            LineRejection::CapacityExceeded { capacity: 2 }
        );
        assert_eq!(report.diagnostics[0].line, 3);
        assert_eq!(
            report.diagnostics[0].message(),
            "Program full (2 instructions). Line ignored."
        );
        assert!(report.terminated);
    }

    #[test]
    fn test_non_utf8_line_skipped() {
        let input: &[u8] = b"00100011\n\xff\xfe000000\n00101001\nEND\n";
        let report = ProgramLoader::default().load(input).unwrap();
        assert_eq!(report.program.words(), &[0b0010_0011, 0b0010_1001]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].line, 2);
        assert_eq!(report.diagnostics[0].reason, LineRejection::NonBinary('\u{FFFD}'));
        assert_eq!(report.diagnostics[0].message(), INVALID_LINE_MESSAGE);
        assert!(report.terminated);
    }

    #[test]
    fn test_callback_sees_each_rejection() {
        let mut seen = Vec::new();
        ProgramLoader::default()
            .load_with("bad\n00000000\nworse\n".as_bytes(), |d| seen.push(d.text.clone()))
            .unwrap();
        assert_eq!(seen, vec!["bad", "worse"]);
    }

    #[test]
    fn test_write_program_reloads() {
        let mut out = Vec::new();
        write_program(&mut out, &[0xA2, 0xE0]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "10100010\n11100000\nEND\n");
        assert_eq!(parse_program(&text, MAX_PROGRAM_LEN).unwrap().program.words(), &[0xA2, 0xE0]);
    }
}
