//! WebAssembly bindings.
//!
//! This module provides JavaScript-friendly wrappers around [`Computer`].

use wasm_bindgen::prelude::*;
use crate::image::{self, parse_image, RamImage};
use crate::machine::{Computer, MachineConfig, PipelineState};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmComputer {
    computer: Computer,
}

#[wasm_bindgen]
impl WasmComputer {
    /// Create a default machine running the demo program.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmComputer, JsError> {
        let computer = Computer::new(MachineConfig::default(), &image::demo())
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self { computer })
    }

    /// Replace the machine with one built from a JSON config and image text.
    ///
    /// An empty config string selects the defaults. Returns the number of
    /// words loaded.
    #[wasm_bindgen]
    pub fn load_image(&mut self, config_json: &str, text: &str) -> Result<usize, JsError> {
        let config = if config_json.trim().is_empty() {
            MachineConfig::default()
        } else {
            MachineConfig::from_json(config_json).map_err(|e| JsError::new(&e.to_string()))?
        };
        let image = parse_image(text, config.word_width)
            .map_err(|e| JsError::new(&e.to_string()))?;
        let len = image.len();
        self.computer = Computer::new(config, &image)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(len)
    }

    /// Run paired ticks. Returns whether the machine can continue.
    #[wasm_bindgen]
    pub fn tick(&mut self, count: u32) -> bool {
        self.computer.tick(u64::from(count))
    }

    #[wasm_bindgen]
    pub fn tick_cpu(&mut self) -> bool {
        self.computer.tick_cpu()
    }

    #[wasm_bindgen]
    pub fn tick_ram(&mut self) -> bool {
        self.computer.tick_ram()
    }

    /// Run until the machine stops or `max_ticks` elapse. Returns the
    /// reason the run ended.
    #[wasm_bindgen]
    pub fn run(&mut self, max_ticks: u32) -> String {
        self.computer.run_until_halt(u64::from(max_ticks)).reason.describe().to_string()
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.computer.reset();
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.computer.is_running()
    }

    #[wasm_bindgen]
    pub fn ticks(&self) -> u64 {
        self.computer.ticks()
    }

    /// Instruction pointer (in words).
    #[wasm_bindgen]
    pub fn ip(&self) -> u64 {
        self.computer.snapshot().ip
    }

    /// Accumulator (AR).
    #[wasm_bindgen]
    pub fn accumulator(&self) -> u64 {
        self.computer.snapshot().ar
    }

    /// Executed instruction count.
    #[wasm_bindgen]
    pub fn counter(&self) -> u64 {
        self.computer.snapshot().counter
    }

    /// Pipeline stage name.
    #[wasm_bindgen]
    pub fn pipeline_state(&self) -> String {
        self.computer
            .pipeline_state()
            .map_or("invalid", PipelineState::name)
            .to_string()
    }

    /// Flags packed as bits: Terminated, Overflow, Fatal, Zero.
    #[wasm_bindgen]
    pub fn flags(&self) -> u8 {
        let f = self.computer.snapshot().flags;
        u8::from(f.terminated)
            | u8::from(f.overflow) << 1
            | u8::from(f.fatal) << 2
            | u8::from(f.zero) << 3
    }

    /// General register `CR[index]`, or 0 past the end.
    #[wasm_bindgen]
    pub fn general(&self, index: usize) -> u64 {
        self.computer.snapshot().general.get(index).copied().unwrap_or(0)
    }

    /// All RAM words.
    #[wasm_bindgen]
    pub fn ram_all(&self) -> Vec<u64> {
        self.computer.ram_image().words
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.computer.snapshot())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Disassembly of current RAM.
    #[wasm_bindgen]
    pub fn disassemble(&self) -> String {
        image::disassemble(&self.computer.ram_image())
    }
}

/// Disassemble image text for `width`-bit words.
#[wasm_bindgen]
pub fn wasm_disassemble(text: &str, width: usize) -> Result<String, JsError> {
    let image: RamImage = parse_image(text, width)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(image::disassemble(&image))
}
