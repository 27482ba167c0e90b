//! The simulated machine.
//!
//! This module implements a minimal stored-program binary computer:
//! - A CPU whose registers all live in one bit-addressed internal memory
//! - A word-addressed RAM reached only over control/address/data buses
//! - An 18-opcode instruction set executed by a multi-stage pipeline
//!
//! Word width and memory sizes come from a [`MachineConfig`].

pub mod config;
pub mod memory;
pub mod registers;
pub mod logics;
pub mod commands;
pub mod runner;
pub mod ram;
pub mod computer;

pub use config::{MachineConfig, ConfigError};
pub use memory::{Memory, Buses};
pub use registers::{RegisterSet, AddressingFault};
pub use logics::CpuLogics;
pub use commands::{Command, CommandFault, Effect, Phase};
pub use runner::{CpuRunner, PipelineState};
pub use ram::RamRunner;
pub use computer::{Computer, ComputerState, Snapshot, FlagSnapshot, BusSnapshot, RunOutcome, StopReason};
