//! The CPU pipeline.
//!
//! Each CPU tick advances exactly one pipeline stage. The stage is kept in
//! the `PipelineState` field of CPU memory, so the whole pipeline can be
//! saved, inspected, and resumed by copying memory alone.
//!
//! ```text
//! Fetch -> Decode -> [Read1 -> [Read2]] -> Execute1 -> [Execute2] -> Fetch
//! ```
//!
//! Every stage that needs a RAM word issues the request one tick ahead:
//! RAM serves it at the start of the next tick, before the CPU runs.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::bits::{arith, BitVector};
use crate::machine::commands::{Command, Effect, Phase};
use crate::machine::logics::CpuLogics;
use crate::machine::memory::{Buses, Memory};
use crate::machine::registers::{RegisterSet, PIPELINE_STATE_WIDTH};
use crate::trace;

/// Pipeline stage, as stored in the `PipelineState` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Fetch,
    Decode,
    Read1,
    Read2,
    Execute1,
    Execute2,
}

impl PipelineState {
    /// Decode a raw field value. Values 6 and 7 are not stages.
    pub fn from_bits(value: u64) -> Option<Self> {
        let state = match value {
            0 => PipelineState::Fetch,
            1 => PipelineState::Decode,
            2 => PipelineState::Read1,
            3 => PipelineState::Read2,
            4 => PipelineState::Execute1,
            5 => PipelineState::Execute2,
            _ => return None,
        };
        Some(state)
    }

    /// Raw field value.
    pub const fn to_bits(self) -> u64 {
        match self {
            PipelineState::Fetch => 0,
            PipelineState::Decode => 1,
            PipelineState::Read1 => 2,
            PipelineState::Read2 => 3,
            PipelineState::Execute1 => 4,
            PipelineState::Execute2 => 5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PipelineState::Fetch => "Fetch",
            PipelineState::Decode => "Decode",
            PipelineState::Read1 => "Read1",
            PipelineState::Read2 => "Read2",
            PipelineState::Execute1 => "Execute1",
            PipelineState::Execute2 => "Execute2",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives the CPU one pipeline stage per tick.
pub struct CpuRunner<'a> {
    regs: &'a RegisterSet,
    cpu: &'a mut Memory,
    buses: &'a mut Buses,
}

impl<'a> CpuRunner<'a> {
    pub fn new(regs: &'a RegisterSet, cpu: &'a mut Memory, buses: &'a mut Buses) -> Self {
        Self { regs, cpu, buses }
    }

    /// Advance one stage. Returns `false` once the machine has terminated.
    ///
    /// A terminated machine is left untouched.
    pub fn tick(&mut self) -> bool {
        let mut logics = CpuLogics::new(self.regs, self.cpu, self.buses);
        if logics.is_terminated() {
            tracing::debug!(target: trace::PIPELINE, "tick: terminated");
            return false;
        }

        logics.clear_bus_request();
        step(&mut logics);
        !logics.is_terminated()
    }
}

fn step(logics: &mut CpuLogics<'_>) {
    let regs = logics.regs();
    let raw = logics.read(&regs.pipeline_state).to_u64();

    let Some(state) = PipelineState::from_bits(raw) else {
        tracing::warn!(target: trace::PIPELINE, "invalid pipeline state {}", raw);
        logics.raise_fatal();
        return;
    };
    tracing::debug!(target: trace::PIPELINE, "stage {}", state);

    match state {
        PipelineState::Fetch => fetch(logics),
        PipelineState::Decode => decode(logics),
        PipelineState::Read1 => read1(logics),
        PipelineState::Read2 => read2(logics),
        PipelineState::Execute1 => execute(logics, Phase::First),
        PipelineState::Execute2 => execute(logics, Phase::Second),
    }
}

fn set_state(logics: &mut CpuLogics<'_>, state: PipelineState) {
    let regs = logics.regs();
    logics.write(
        &regs.pipeline_state,
        &BitVector::from_value(PIPELINE_STATE_WIDTH, state.to_bits()),
    );
}

/// Request the RAM word `offset` words past IP. Overflow is fatal.
fn request_operand(logics: &mut CpuLogics<'_>, offset: u64) -> bool {
    let regs = logics.regs();
    let ip = logics.read(&regs.ip);
    let (address, carry) = arith::plus(&ip, &BitVector::from_value(ip.width(), offset));
    if carry {
        tracing::warn!(target: trace::PIPELINE, "operand address IP+{} overflows", offset);
        logics.raise_fatal();
        return false;
    }
    logics.request_ram_read(&address);
    true
}

fn fetch(logics: &mut CpuLogics<'_>) {
    let regs = logics.regs();
    for reference in [regs.system, regs.command_code, regs.arg1, regs.arg2] {
        logics.clear_register(&reference);
    }

    let ip = logics.read(&regs.ip);
    logics.request_ram_read(&ip);
    set_state(logics, PipelineState::Decode);
}

fn decode(logics: &mut CpuLogics<'_>) {
    let regs = logics.regs();
    let code = logics.read_data_bus();
    logics.write(&regs.command_code, &code);

    let Some(command) = Command::from_code(code.to_u64()) else {
        tracing::warn!(target: trace::PIPELINE, "unknown command {:#x}", code.to_u64());
        logics.raise_fatal();
        return;
    };
    tracing::debug!(target: trace::PIPELINE, "decoded {}", command);

    if command.arity() == 0 {
        set_state(logics, PipelineState::Execute1);
        return;
    }

    logics.set_flag(&regs.argument_mode, command.arity() == 2);
    if request_operand(logics, 1) {
        set_state(logics, PipelineState::Read1);
    }
}

fn read1(logics: &mut CpuLogics<'_>) {
    let regs = logics.regs();
    let arg = logics.read_data_bus();
    logics.write(&regs.arg1, &arg);

    if !logics.flag(&regs.argument_mode) {
        set_state(logics, PipelineState::Execute1);
    } else if request_operand(logics, 2) {
        set_state(logics, PipelineState::Read2);
    }
}

fn read2(logics: &mut CpuLogics<'_>) {
    let regs = logics.regs();
    let arg = logics.read_data_bus();
    logics.write(&regs.arg2, &arg);
    set_state(logics, PipelineState::Execute1);
}

fn execute(logics: &mut CpuLogics<'_>, phase: Phase) {
    let regs = logics.regs();
    let code = logics.read(&regs.command_code).to_u64();
    let Some(command) = Command::from_code(code) else {
        tracing::warn!(target: trace::PIPELINE, "unknown command {:#x} at execute", code);
        logics.raise_fatal();
        return;
    };

    let x = logics.read(&regs.arg1);
    let y = logics.read(&regs.arg2);

    match command.execute(phase, logics, &x, &y) {
        Ok(Effect::Complete) => set_state(logics, PipelineState::Fetch),
        Ok(Effect::AwaitRam) => set_state(logics, PipelineState::Execute2),
        Err(e) => {
            tracing::warn!(target: trace::PIPELINE, "{}: {}", command, e);
            logics.raise_fatal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::config::MachineConfig;
    use crate::machine::ram::RamRunner;

    struct Fixture {
        regs: RegisterSet,
        cpu: Memory,
        ram: Memory,
        buses: Buses,
    }

    impl Fixture {
        fn new(program: &[u64]) -> Self {
            let config = MachineConfig::new(8, 10, program.len().max(1));
            Self {
                regs: RegisterSet::new(&config).unwrap(),
                cpu: Memory::new("CPU", config.cpu_bits()),
                ram: Memory::with_contents("RAM", BitVector::from_words(8, program)),
                buses: Buses::new(8),
            }
        }

        fn tick(&mut self) -> bool {
            RamRunner::new(&mut self.buses, &mut self.ram, 8).tick();
            CpuRunner::new(&self.regs, &mut self.cpu, &mut self.buses).tick()
        }

        fn state(&self) -> Option<PipelineState> {
            PipelineState::from_bits(self.cpu.get(&self.regs.pipeline_state).to_u64())
        }

        fn read(&self, pick: fn(&RegisterSet) -> crate::bits::Reference) -> u64 {
            self.cpu.get(&pick(&self.regs)).to_u64()
        }
    }

    #[test]
    fn test_state_encoding() {
        for raw in 0..6 {
            assert_eq!(PipelineState::from_bits(raw).unwrap().to_bits(), raw);
        }
        assert_eq!(PipelineState::from_bits(6), None);
        assert_eq!(PipelineState::from_bits(7), None);
    }

    #[test]
    fn test_zero_arity_stages() {
        let mut fx = Fixture::new(&[Command::Noop.code()]);
        assert_eq!(fx.state(), Some(PipelineState::Fetch));

        fx.tick();
        assert_eq!(fx.state(), Some(PipelineState::Decode));
        assert!(fx.buses.control.flag(&Buses::ENABLE));

        fx.tick();
        assert_eq!(fx.state(), Some(PipelineState::Execute1));
        assert_eq!(fx.read(|r| r.command_code), Command::Noop.code());

        fx.tick();
        assert_eq!(fx.state(), Some(PipelineState::Fetch));
        assert_eq!(fx.read(|r| r.ip), 1);
    }

    #[test]
    fn test_two_argument_stages() {
        let mut fx = Fixture::new(&[Command::Cmp.code(), 0, 1]);
        let expected = [
            PipelineState::Decode,
            PipelineState::Read1,
            PipelineState::Read2,
            PipelineState::Execute1,
            PipelineState::Fetch,
        ];
        for state in expected {
            assert!(fx.tick());
            assert_eq!(fx.state(), Some(state));
        }
        assert_eq!(fx.read(|r| r.argument_mode), 1);
        assert_eq!(fx.read(|r| r.arg1), 0);
        assert_eq!(fx.read(|r| r.arg2), 1);
    }

    #[test]
    fn test_one_argument_skips_read2() {
        let mut fx = Fixture::new(&[Command::Inc.code(), 1]);
        fx.tick();
        fx.tick();
        assert_eq!(fx.read(|r| r.argument_mode), 0);
        fx.tick();
        assert_eq!(fx.state(), Some(PipelineState::Execute1));
        assert_eq!(fx.read(|r| r.arg1), 1);
    }

    #[test]
    fn test_ld_enters_second_phase() {
        let mut fx = Fixture::new(&[Command::Ld.code(), 0, 1]);
        for _ in 0..5 {
            fx.tick();
        }
        assert_eq!(fx.state(), Some(PipelineState::Execute2));
        fx.tick();
        assert_eq!(fx.state(), Some(PipelineState::Fetch));
    }

    #[test]
    fn test_fetch_clears_decoded_fields() {
        let mut fx = Fixture::new(&[Command::Noop.code()]);
        fx.cpu.set(&fx.regs.arg1, &BitVector::from_value(8, 9));
        fx.cpu.set_flag(&fx.regs.argument_mode, true);
        fx.tick();
        assert_eq!(fx.read(|r| r.arg1), 0);
        assert_eq!(fx.read(|r| r.argument_mode), 0);
    }

    #[test]
    fn test_invalid_state_is_fatal() {
        for raw in [6, 7] {
            let mut fx = Fixture::new(&[Command::Noop.code()]);
            fx.cpu.set(&fx.regs.pipeline_state, &BitVector::from_value(3, raw));
            assert!(!fx.tick());
            assert_eq!(fx.read(|r| r.fatal), 1);
        }
    }

    #[test]
    fn test_second_phase_without_ld_is_fatal() {
        let mut fx = Fixture::new(&[Command::Noop.code()]);
        fx.cpu.set(&fx.regs.pipeline_state, &BitVector::from_value(3, 5));
        assert!(!fx.tick());
        assert_eq!(fx.read(|r| r.fatal), 1);
    }

    #[test]
    fn test_terminated_tick_is_inert() {
        let mut fx = Fixture::new(&[Command::Noop.code()]);
        fx.cpu.set_flag(&fx.regs.terminated, true);
        let before = fx.cpu.clone();

        assert!(!CpuRunner::new(&fx.regs, &mut fx.cpu, &mut fx.buses).tick());
        assert_eq!(fx.cpu, before);
    }

    #[test]
    fn test_operand_address_overflow_is_fatal() {
        let mut fx = Fixture::new(&[Command::Inc.code()]);
        fx.cpu.set(&fx.regs.ip, &BitVector::from_value(8, 255));
        // fetch asks for RAM[255], which this machine lacks
        CpuRunner::new(&fx.regs, &mut fx.cpu, &mut fx.buses).tick();
        let word = fx.buses.word();
        fx.buses.data.set(&word, &BitVector::from_value(8, Command::Inc.code()));

        assert!(!CpuRunner::new(&fx.regs, &mut fx.cpu, &mut fx.buses).tick());
        assert_eq!(fx.read(|r| r.fatal), 1);
    }
}
