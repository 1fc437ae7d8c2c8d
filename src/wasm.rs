//! WebAssembly bindings.
//!
//! JavaScript-friendly wrapper around the engine. Configuration is passed
//! as the same JSON accepted by [`VmConfig::from_json`].

use wasm_bindgen::prelude::*;
use crate::asm::{assemble, disassemble_word, parse_program};
use crate::{Cpu, Program, VmConfig, VmState};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly VM wrapper.
#[wasm_bindgen]
pub struct WasmVm {
    config: VmConfig,
    cpu: Cpu,
    state: VmState,
    program: Program,
}

#[wasm_bindgen]
impl WasmVm {
    /// Create a VM from a JSON configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmVm, JsError> {
        let config = VmConfig::from_json(config_json)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self {
            cpu: Cpu::from_config(&config),
            state: VmState::from_config(&config),
            program: config.empty_program(),
            config,
        })
    }

    /// Load `0`/`1` lines. Returns the number of rejected lines.
    #[wasm_bindgen]
    pub fn load_binary(&mut self, text: &str) -> Result<usize, JsError> {
        let report = parse_program(text, self.config.capacity)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.program = report.program;
        self.reset();
        Ok(report.diagnostics.len())
    }

    /// Load assembly source. Returns the number of words.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let words = assemble(source, &self.cpu)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.program = Program::from_words(&words)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.reset();
        Ok(words.len())
    }

    /// Step one instruction. Returns its trace line, or `undefined` when stopped.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Option<String> {
        let mut lines: Vec<String> = Vec::new();
        self.cpu.step(&mut self.state, &self.program, &mut lines)?;
        lines.pop()
    }

    /// Run at most `max_steps` instructions and return their trace lines.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for _ in 0..max_steps {
            if self.cpu.step(&mut self.state, &self.program, &mut lines).is_none() {
                break;
            }
        }
        lines
    }

    /// Restore the configured initial state, keeping the program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.state = VmState::from_config(&self.config);
    }

    #[wasm_bindgen]
    pub fn can_continue(&self) -> bool {
        self.state.can_fetch(&self.program)
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.state.pc
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.state.cycles
    }

    #[wasm_bindgen]
    pub fn registers(&self) -> Vec<u8> {
        self.state.regs.values().to_vec()
    }

    #[wasm_bindgen]
    pub fn memory(&self) -> Vec<u8> {
        self.state.mem.cells().to_vec()
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.state).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Disassemble one word with this VM's configuration.
    #[wasm_bindgen]
    pub fn disassemble(&self, word: u8) -> String {
        disassemble_word(&self.cpu, word)
    }
}
