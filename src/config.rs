//! Machine configuration.
//!
//! A [`VmConfig`] fixes everything that must stay constant for a run:
//! the opcode table, the register map, the initial register and memory
//! contents and the program capacity. It can be loaded from JSON:
//!
//! ```json
//! {
//!   "profile": "jump",
//!   "register_map": "remapped",
//!   "registers": [4, 0, 0, 3]
//! }
//! ```
//!
//! `profile` and `register_map` have no defaults.

use crate::cpu::isa::{OpcodeTable, Profile};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::program::{Program, MAX_PROGRAM_LEN};
use crate::cpu::registers::REGISTER_COUNT;
use crate::cpu::{RegisterIndex, RegisterMap};
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VmConfig {
    /// Built-in opcode table.
    pub profile: Profile,
    /// How operand1 selects a register.
    pub register_map: RegisterMap,
    /// Replaces the profile's table when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_table: Option<OpcodeTable>,
    /// Initial R0-R3.
    #[serde(default)]
    pub registers: [u8; REGISTER_COUNT],
    /// Initial data memory.
    #[serde(default)]
    pub memory: [u8; MEMORY_SIZE],
    /// Maximum number of instructions a program may hold.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    MAX_PROGRAM_LEN
}

impl VmConfig {
    /// Zeroed registers and memory, full capacity.
    pub fn new(profile: Profile, register_map: RegisterMap) -> Self {
        Self {
            profile,
            register_map,
            custom_table: None,
            registers: [0; REGISTER_COUNT],
            memory: [0; MEMORY_SIZE],
            capacity: MAX_PROGRAM_LEN,
        }
    }

    /// The table the engine decodes with.
    pub fn opcode_table(&self) -> OpcodeTable {
        self.custom_table.unwrap_or_else(|| self.profile.table())
    }

    /// Switch to a stock profile, discarding any custom table.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self.custom_table = None;
        self
    }

    pub fn with_register(mut self, reg: RegisterIndex, value: u8) -> Self {
        self.registers[reg.as_usize()] = value;
        self
    }

    /// Seed registers the way the stock demo programs for `self.profile` expect.
    pub fn with_reference_seed(mut self) -> Self {
        self.registers = reference_registers(self.profile);
        self
    }

    /// An empty program sized by this configuration.
    pub fn empty_program(&self) -> Program {
        Program::with_capacity(self.capacity)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity > MAX_PROGRAM_LEN {
            return Err(ConfigError::Invalid(format!(
                "capacity {} exceeds maximum of {}",
                self.capacity, MAX_PROGRAM_LEN
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: VmConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Register seeds used by the demo programs.
///
/// - jump profile: R0 = 4, R3 = 3
/// - bitwise profile: R0 = 4, R1 = 8, R2 = 5, R3 = 3
pub fn reference_registers(profile: Profile) -> [u8; REGISTER_COUNT] {
    match profile {
        Profile::Jump => [4, 0, 0, 3],
        Profile::Bitwise => [4, 8, 5, 3],
    }
}

/// Load a configuration file from disk.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<VmConfig, ConfigError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ConfigError::Io(e.to_string()))?;
    VmConfig::from_json(&text)
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
