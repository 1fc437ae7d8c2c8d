//! Fixed-capacity program buffer.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Largest program the machine accepts.
pub const MAX_PROGRAM_LEN: usize = 256;

/// An ordered list of instruction words with an enforced capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProgram")]
pub struct Program {
    words: Vec<u8>,
    capacity: usize,
}

impl Program {
    /// Create an empty program holding at most [`MAX_PROGRAM_LEN`] words.
    pub fn new() -> Self {
        Self::with_capacity(MAX_PROGRAM_LEN)
    }

    /// Create an empty program with a smaller capacity.
    /// Capacities above [`MAX_PROGRAM_LEN`] are clamped.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_PROGRAM_LEN);
        Self {
            words: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a program from words, rejecting anything over capacity.
    pub fn from_words(words: &[u8]) -> Result<Self, ProgramError> {
        let mut program = Self::new();
        program.extend(words)?;
        Ok(program)
    }

    /// Append one word.
    pub fn push(&mut self, word: u8) -> Result<(), ProgramError> {
        if self.is_full() {
            return Err(ProgramError::CapacityExceeded { capacity: self.capacity });
        }
        self.words.push(word);
        Ok(())
    }

    pub fn extend(&mut self, words: &[u8]) -> Result<(), ProgramError> {
        if self.words.len() + words.len() > self.capacity {
            return Err(ProgramError::CapacityExceeded { capacity: self.capacity });
        }
        self.words.extend_from_slice(words);
        Ok(())
    }

    /// Fetch the word at `pc`.
    #[inline]
    pub fn fetch(&self, pc: usize) -> Option<u8> {
        self.words.get(pc).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.words.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn words(&self) -> &[u8] {
        &self.words
    }
}

#[derive(Deserialize)]
struct RawProgram {
    words: Vec<u8>,
    #[serde(default = "max_len")]
    capacity: usize,
}

fn max_len() -> usize {
    MAX_PROGRAM_LEN
}

impl TryFrom<RawProgram> for Program {
    type Error = ProgramError;

    fn try_from(raw: RawProgram) -> Result<Self, Self::Error> {
        if raw.capacity > MAX_PROGRAM_LEN {
            return Err(ProgramError::CapacityExceeded { capacity: MAX_PROGRAM_LEN });
        }
        let mut program = Self::with_capacity(raw.capacity);
        program.extend(&raw.words)?;
        Ok(program)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised while building a [`Program`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("program capacity of {capacity} instructions exceeded")]
    CapacityExceeded { capacity: usize },
}
