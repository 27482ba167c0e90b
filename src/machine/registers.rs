//! CPU register layout.
//!
//! Registers are not stored here: the [`RegisterSet`] only computes where
//! each architectural register lives inside CPU-internal memory.
//!
//! Word slots (shown for a 4-bit word):
//!
//! | Slot | Bits    | Register                                        |
//! |------|---------|-------------------------------------------------|
//! | 0    | 00..04  | System: PipelineState (3 bits), ArgumentMode    |
//! | 1    | 04..08  | CommandCode                                     |
//! | 2    | 08..12  | Arg1                                            |
//! | 3    | 12..16  | Arg2                                            |
//! | 4    | 16..20  | Flags: Terminated, Overflow, Fatal, Zero        |
//! | 5    | 20..24  | Counter (executed instructions)                 |
//! | 6    | 24..28  | IP (next instruction, in words)                 |
//! | 7    | 28..32  | AR (accumulator)                                |
//! | 8..  | 32..    | CR[0], CR[1], ... (general registers)           |

use thiserror::Error;

use crate::bits::{BitVector, Reference};
use crate::machine::config::{ConfigError, MachineConfig};

/// Number of word slots reserved before the general registers.
pub const SERVICE_REGISTERS: usize = 8;

/// Width of the PipelineState field.
pub const PIPELINE_STATE_WIDTH: usize = 3;

/// The register layout of one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSet {
    word_width: usize,
    general_count: usize,

    pub system: Reference,
    pub pipeline_state: Reference,
    pub argument_mode: Reference,

    pub command_code: Reference,
    pub arg1: Reference,
    pub arg2: Reference,

    pub flags: Reference,
    pub terminated: Reference,
    pub overflow: Reference,
    pub fatal: Reference,
    pub zero: Reference,

    pub counter: Reference,
    pub ip: Reference,
    pub ar: Reference,
}

impl RegisterSet {
    /// Compute the layout for a validated machine configuration.
    pub fn new(config: &MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let w = config.word_width;
        let at = |slot: usize| slot * w;

        Ok(Self {
            word_width: w,
            general_count: config.cpu_words - SERVICE_REGISTERS,

            system: Reference::named("System", at(0), w),
            pipeline_state: Reference::named("PipelineState", at(0), PIPELINE_STATE_WIDTH),
            argument_mode: Reference::named("ArgumentMode", at(0) + PIPELINE_STATE_WIDTH, 1),

            command_code: Reference::named("CommandCode", at(1), w),
            arg1: Reference::named("Arg1", at(2), w),
            arg2: Reference::named("Arg2", at(3), w),

            flags: Reference::named("Flags", at(4), w),
            terminated: Reference::named("Terminated", at(4), 1),
            overflow: Reference::named("Overflow", at(4) + 1, 1),
            fatal: Reference::named("Fatal", at(4) + 2, 1),
            zero: Reference::named("Zero", at(4) + 3, 1),

            counter: Reference::named("Counter", at(5), w),
            ip: Reference::named("IP", at(6), w),
            ar: Reference::named("AR", at(7), w),
        })
    }

    /// Bits per word.
    #[inline]
    pub fn word_width(&self) -> usize {
        self.word_width
    }

    /// Number of general registers.
    #[inline]
    pub fn general_count(&self) -> usize {
        self.general_count
    }

    /// Reference to the `index`-th word slot of CPU memory.
    pub fn register(&self, index: usize) -> Reference {
        Reference::new(index * self.word_width, self.word_width)
    }

    /// Reference to general register `CR[index]`.
    pub fn general(&self, index: u64) -> Result<Reference, AddressingFault> {
        match usize::try_from(index) {
            Ok(i) if i < self.general_count => {
                Ok(Reference::named("CR", (SERVICE_REGISTERS + i) * self.word_width, self.word_width))
            }
            _ => Err(AddressingFault { index, count: self.general_count }),
        }
    }

    /// Reference to the general register selected by an argument word.
    pub fn general_at(&self, index: &BitVector) -> Result<Reference, AddressingFault> {
        self.general(index.to_u64())
    }
}

/// A general-register index past the end of the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("general register CR[{index}] out of range ({count} registers)")]
pub struct AddressingFault {
    pub index: u64,
    pub count: usize,
}
