//! # minicomp
//!
//! A cycle-accurate model of a minimal stored-program binary computer.
//!
//! The CPU keeps every register in one bit-addressed internal memory and
//! talks to RAM only through control, address and data buses. Each tick
//! advances the CPU pipeline by exactly one stage, so instruction timing,
//! bus handshakes and faults can be observed tick by tick.

pub mod bits;
pub mod machine;
pub mod image;
pub mod trace;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use bits::{BitVector, Reference};
pub use machine::{Computer, MachineConfig, ConfigError, Command, PipelineState, Snapshot, RunOutcome, StopReason};
pub use image::{RamImage, ImageError, load_image, save_image, parse_image, disassemble};
pub use trace::{TraceCategory, TraceCategoryError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
