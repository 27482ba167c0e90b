//! Machine geometry.
//!
//! The word width and the sizes of CPU-internal memory and RAM are chosen
//! per machine rather than fixed at compile time. A configuration is
//! validated once before any memory is allocated.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::machine::registers::SERVICE_REGISTERS;

/// Narrowest supported word: the System and Flags words pack four fields.
pub const MIN_WORD_WIDTH: usize = 4;
/// Widest supported word: words convert to `u64` for addressing.
pub const MAX_WORD_WIDTH: usize = 64;

mod defaults {
    pub const WORD_WIDTH: usize = 8;
    pub const CPU_WORDS: usize = 16;
    pub const RAM_WORDS: usize = 256;
}

/// Machine geometry, measured in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Bits per word.
    #[serde(default = "MachineConfig::default_word_width")]
    pub word_width: usize,

    /// Words of CPU-internal memory (service registers plus general registers).
    #[serde(default = "MachineConfig::default_cpu_words")]
    pub cpu_words: usize,

    /// Words of RAM.
    #[serde(default = "MachineConfig::default_ram_words")]
    pub ram_words: usize,
}

impl MachineConfig {
    /// Create a configuration. Call [`validate`](Self::validate) before use.
    pub const fn new(word_width: usize, cpu_words: usize, ram_words: usize) -> Self {
        Self { word_width, cpu_words, ram_words }
    }

    fn default_word_width() -> usize {
        defaults::WORD_WIDTH
    }

    fn default_cpu_words() -> usize {
        defaults::CPU_WORDS
    }

    fn default_ram_words() -> usize {
        defaults::RAM_WORDS
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Check the geometry invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_WORD_WIDTH..=MAX_WORD_WIDTH).contains(&self.word_width) {
            return Err(ConfigError::WordWidthOutOfRange { width: self.word_width });
        }
        if self.cpu_words < SERVICE_REGISTERS {
            return Err(ConfigError::InternalMemoryTooSmall {
                words: self.cpu_words,
                required: SERVICE_REGISTERS,
            });
        }
        if self.ram_words == 0 {
            return Err(ConfigError::RamTooSmall);
        }
        Ok(())
    }

    /// Size of CPU-internal memory in bits.
    #[inline]
    pub const fn cpu_bits(&self) -> usize {
        self.cpu_words * self.word_width
    }

    /// Size of RAM in bits.
    #[inline]
    pub const fn ram_bits(&self) -> usize {
        self.ram_words * self.word_width
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            word_width: defaults::WORD_WIDTH,
            cpu_words: defaults::CPU_WORDS,
            ram_words: defaults::RAM_WORDS,
        }
    }
}

/// Errors describing a misconfigured machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("word width {width} out of range (4..=64)")]
    WordWidthOutOfRange { width: usize },

    #[error("internal memory of {words} words is smaller than the {required} service registers")]
    InternalMemoryTooSmall { words: usize, required: usize },

    #[error("RAM must hold at least one word")]
    RamTooSmall,

    #[error("RAM image of {words} words exceeds RAM capacity {capacity}")]
    ImageTooLarge { words: usize, capacity: usize },

    #[error("RAM image word width {got} does not match machine word width {expected}")]
    ImageWidthMismatch { expected: usize, got: usize },

    #[error("RAM image word {index} ({value:#x}) does not fit in {width} bits")]
    ImageWordTooWide { index: usize, value: u64, width: usize },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}
