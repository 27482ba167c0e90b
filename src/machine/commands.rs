//! The instruction set.
//!
//! An instruction is an opcode word followed by zero, one, or two argument
//! words. The opcode selects a [`Command`], which fixes the argument count
//! and the handler run in the Execute stage.
//!
//! | Code | Mnemonic | Args | Effect                                  |
//! |------|----------|------|-----------------------------------------|
//! | 0x00 | NOOP     | 0    | advance only                            |
//! | 0x01 | RST      | 0    | set Terminated                          |
//! | 0x02 | CLR      | 1    | `CR[x] = 0`                             |
//! | 0x03 | INC      | 1    | `CR[x] += 1`                            |
//! | 0x04 | SUM      | 2    | `AR = CR[x] + CR[y]`                    |
//! | 0x05 | MOV      | 2    | `CR[x] = CR[y]`                         |
//! | 0x06 | CLRA     | 0    | `AR = 0`                                |
//! | 0x07 | INCA     | 0    | `AR += 1`                               |
//! | 0x08 | ADDA     | 1    | `AR += CR[x]`                           |
//! | 0x09 | LD       | 2    | `CR[y] = RAM[CR[x]]` (two phases)       |
//! | 0x0A | ST       | 2    | `RAM[CR[y]] = CR[x]`                    |
//! | 0x0B | SUB      | 2    | `AR = CR[x] - CR[y]`                    |
//! | 0x0C | SUBA     | 1    | `AR -= CR[x]`                           |
//! | 0x0D | DEC      | 1    | `CR[x] -= 1`                            |
//! | 0x0E | DECA     | 0    | `AR -= 1`                               |
//! | 0x0F | JMP      | 1    | `IP = x`                                |
//! | 0x12 | CMP      | 2    | `Zero = (CR[x] == CR[y])`               |
//! | 0x13 | JZ       | 1    | `IP = x` if Zero                        |

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::bits::{arith, BitVector};
use crate::machine::logics::CpuLogics;
use crate::machine::registers::AddressingFault;
use crate::trace;

/// A decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// No operation; advance to the next instruction.
    Noop,
    /// Stop the machine.
    Rst,
    /// Clear a general register.
    Clr,
    /// Increment a general register.
    Inc,
    /// Sum two general registers into AR.
    Sum,
    /// Copy one general register into another.
    Mov,
    /// Clear AR.
    Clra,
    /// Increment AR.
    Inca,
    /// Add a general register to AR.
    Adda,
    /// Load a general register from RAM.
    Ld,
    /// Store a general register to RAM.
    St,
    /// Subtract two general registers into AR.
    Sub,
    /// Subtract a general register from AR.
    Suba,
    /// Decrement a general register.
    Dec,
    /// Decrement AR.
    Deca,
    /// Unconditional absolute jump.
    Jmp,
    /// Compare two general registers into Zero.
    Cmp,
    /// Jump if Zero is set.
    Jz,
}

/// Opcode values.
struct Opcode;

impl Opcode {
    const NOOP: u64 = 0x00;
    const RST: u64 = 0x01;
    const CLR: u64 = 0x02;
    const INC: u64 = 0x03;
    const SUM: u64 = 0x04;
    const MOV: u64 = 0x05;
    const CLRA: u64 = 0x06;
    const INCA: u64 = 0x07;
    const ADDA: u64 = 0x08;
    const LD: u64 = 0x09;
    const ST: u64 = 0x0A;
    const SUB: u64 = 0x0B;
    const SUBA: u64 = 0x0C;
    const DEC: u64 = 0x0D;
    const DECA: u64 = 0x0E;
    const JMP: u64 = 0x0F;
    const CMP: u64 = 0x12;
    const JZ: u64 = 0x13;
}

/// Which half of a two-phase instruction to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    First,
    Second,
}

/// What the pipeline should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The instruction has committed; fetch the next one.
    Complete,
    /// A RAM read is in flight; run the second phase next tick.
    AwaitRam,
}

/// A handler could not run. The pipeline turns this into Fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandFault {
    #[error(transparent)]
    Addressing(#[from] AddressingFault),

    #[error("{0} has no second execute phase")]
    NoSecondPhase(Command),
}

impl Command {
    /// Every command, in opcode order.
    pub const ALL: [Command; 18] = [
        Command::Noop, Command::Rst, Command::Clr, Command::Inc,
        Command::Sum, Command::Mov, Command::Clra, Command::Inca,
        Command::Adda, Command::Ld, Command::St, Command::Sub,
        Command::Suba, Command::Dec, Command::Deca, Command::Jmp,
        Command::Cmp, Command::Jz,
    ];

    /// Look up an opcode. Unknown codes yield `None`.
    pub fn from_code(code: u64) -> Option<Self> {
        let command = match code {
            Opcode::NOOP => Command::Noop,
            Opcode::RST => Command::Rst,
            Opcode::CLR => Command::Clr,
            Opcode::INC => Command::Inc,
            Opcode::SUM => Command::Sum,
            Opcode::MOV => Command::Mov,
            Opcode::CLRA => Command::Clra,
            Opcode::INCA => Command::Inca,
            Opcode::ADDA => Command::Adda,
            Opcode::LD => Command::Ld,
            Opcode::ST => Command::St,
            Opcode::SUB => Command::Sub,
            Opcode::SUBA => Command::Suba,
            Opcode::DEC => Command::Dec,
            Opcode::DECA => Command::Deca,
            Opcode::JMP => Command::Jmp,
            Opcode::CMP => Command::Cmp,
            Opcode::JZ => Command::Jz,
            _ => return None,
        };
        Some(command)
    }

    /// The opcode value.
    pub const fn code(self) -> u64 {
        match self {
            Command::Noop => Opcode::NOOP,
            Command::Rst => Opcode::RST,
            Command::Clr => Opcode::CLR,
            Command::Inc => Opcode::INC,
            Command::Sum => Opcode::SUM,
            Command::Mov => Opcode::MOV,
            Command::Clra => Opcode::CLRA,
            Command::Inca => Opcode::INCA,
            Command::Adda => Opcode::ADDA,
            Command::Ld => Opcode::LD,
            Command::St => Opcode::ST,
            Command::Sub => Opcode::SUB,
            Command::Suba => Opcode::SUBA,
            Command::Dec => Opcode::DEC,
            Command::Deca => Opcode::DECA,
            Command::Jmp => Opcode::JMP,
            Command::Cmp => Opcode::CMP,
            Command::Jz => Opcode::JZ,
        }
    }

    /// Number of argument words following the opcode.
    pub const fn arity(self) -> usize {
        match self {
            Command::Noop | Command::Rst | Command::Clra | Command::Inca | Command::Deca => 0,
            Command::Clr | Command::Inc | Command::Adda | Command::Suba | Command::Dec
            | Command::Jmp | Command::Jz => 1,
            Command::Sum | Command::Mov | Command::Ld | Command::St | Command::Sub
            | Command::Cmp => 2,
        }
    }

    /// Total instruction length in words.
    #[inline]
    pub const fn words(self) -> usize {
        1 + self.arity()
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Command::Noop => "NOOP",
            Command::Rst => "RST",
            Command::Clr => "CLR",
            Command::Inc => "INC",
            Command::Sum => "SUM",
            Command::Mov => "MOV",
            Command::Clra => "CLRA",
            Command::Inca => "INCA",
            Command::Adda => "ADDA",
            Command::Ld => "LD",
            Command::St => "ST",
            Command::Sub => "SUB",
            Command::Suba => "SUBA",
            Command::Dec => "DEC",
            Command::Deca => "DECA",
            Command::Jmp => "JMP",
            Command::Cmp => "CMP",
            Command::Jz => "JZ",
        }
    }

    /// Look up a mnemonic (case-insensitive). `RSTA` is accepted for `CLRA`.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        let upper = text.trim().to_ascii_uppercase();
        if upper == "RSTA" {
            return Some(Command::Clra);
        }
        Command::ALL.into_iter().find(|c| c.mnemonic() == upper)
    }

    /// Run one execute phase with the decoded arguments.
    pub fn execute(
        self,
        phase: Phase,
        logics: &mut CpuLogics<'_>,
        x: &BitVector,
        y: &BitVector,
    ) -> Result<Effect, CommandFault> {
        tracing::debug!(target: trace::COMMANDS, "{} {:?} (x = {}, y = {})", self, phase, x, y);
        let regs = logics.regs();

        match (self, phase) {
            (Command::Noop, Phase::First) => {}

            (Command::Rst, Phase::First) => {
                logics.set_flag(&regs.terminated, true);
            }

            (Command::Clr, Phase::First) => {
                let cx = regs.general_at(x)?;
                logics.clear_register(&cx);
            }

            (Command::Inc, Phase::First) => {
                let cx = regs.general_at(x)?;
                logics.inc_register(&cx);
            }

            (Command::Sum, Phase::First) => {
                let (cx, cy) = (regs.general_at(x)?, regs.general_at(y)?);
                let (result, carry) = arith::plus(&logics.read(&cx), &logics.read(&cy));
                logics.set_overflow(carry);
                logics.write(&regs.ar, &result);
            }

            (Command::Mov, Phase::First) => {
                let (cx, cy) = (regs.general_at(x)?, regs.general_at(y)?);
                let value = logics.read(&cy);
                logics.write(&cx, &value);
            }

            (Command::Clra, Phase::First) => {
                logics.clear_register(&regs.ar);
            }

            (Command::Inca, Phase::First) => {
                logics.inc_register(&regs.ar);
            }

            (Command::Adda, Phase::First) => {
                let cx = regs.general_at(x)?;
                let value = logics.read(&cx);
                logics.add_to_register(&regs.ar, &value);
            }

            (Command::Ld, Phase::First) => {
                let (cx, _) = (regs.general_at(x)?, regs.general_at(y)?);
                let address = logics.read(&cx);
                logics.request_ram_read(&address);
                return Ok(Effect::AwaitRam);
            }

            (Command::Ld, Phase::Second) => {
                let cy = regs.general_at(y)?;
                let value = logics.read_data_bus();
                tracing::debug!(target: trace::COMMANDS, "LD loaded {}", value);
                logics.write(&cy, &value);
            }

            (Command::St, Phase::First) => {
                let (cx, cy) = (regs.general_at(x)?, regs.general_at(y)?);
                let value = logics.read(&cx);
                let address = logics.read(&cy);
                logics.request_ram_write(&address, &value);
            }

            (Command::Sub, Phase::First) => {
                let (cx, cy) = (regs.general_at(x)?, regs.general_at(y)?);
                let (result, borrow) = arith::minus(&logics.read(&cx), &logics.read(&cy));
                logics.set_overflow(borrow);
                logics.write(&regs.ar, &result);
            }

            (Command::Suba, Phase::First) => {
                let cx = regs.general_at(x)?;
                let value = logics.read(&cx);
                logics.sub_register(&regs.ar, &value);
            }

            (Command::Dec, Phase::First) => {
                let cx = regs.general_at(x)?;
                logics.dec_register(&cx);
            }

            (Command::Deca, Phase::First) => {
                logics.dec_register(&regs.ar);
            }

            (Command::Jmp, Phase::First) => {
                logics.inc_counter();
                logics.write(&regs.ip, x);
                return Ok(Effect::Complete);
            }

            (Command::Cmp, Phase::First) => {
                let (cx, cy) = (regs.general_at(x)?, regs.general_at(y)?);
                let equal = logics.read(&cx) == logics.read(&cy);
                logics.set_flag(&regs.zero, equal);
            }

            (Command::Jz, Phase::First) => {
                if logics.flag(&regs.zero) {
                    logics.inc_counter();
                    logics.write(&regs.ip, x);
                    return Ok(Effect::Complete);
                }
            }

            (_, Phase::Second) => return Err(CommandFault::NoSecondPhase(self)),
        }

        logics.set_next_operation(self.words());
        Ok(Effect::Complete)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
