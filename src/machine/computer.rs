//! The tick orchestrator.
//!
//! A [`Computer`] owns the register layout and all machine state and
//! advances it in lock-step: on every paired tick RAM serves the pending
//! bus request first, then the CPU advances one pipeline stage. The two
//! halves can also be ticked independently for debugging.

use std::fmt;
use serde::Serialize;

use crate::bits::{BitVector, Reference};
use crate::image::{format_word, RamImage};
use crate::machine::config::{ConfigError, MachineConfig};
use crate::machine::memory::{Buses, Memory};
use crate::machine::ram::RamRunner;
use crate::machine::registers::{RegisterSet, SERVICE_REGISTERS};
use crate::machine::runner::{CpuRunner, PipelineState};
use crate::trace;

/// Everything a machine remembers between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputerState {
    /// CPU-internal memory holding every register.
    pub cpu: Memory,
    /// Main memory.
    pub ram: Memory,
    pub buses: Buses,
}

impl ComputerState {
    /// Zeroed CPU and buses with RAM holding `ram`.
    pub fn new(config: &MachineConfig, ram: BitVector) -> Self {
        Self {
            cpu: Memory::new("CPU", config.cpu_bits()),
            ram: Memory::with_contents("RAM", ram),
            buses: Buses::new(config.word_width),
        }
    }
}

/// A complete machine.
#[derive(Debug, Clone)]
pub struct Computer {
    config: MachineConfig,
    regs: RegisterSet,
    state: ComputerState,
    /// RAM contents at construction, restored by [`reset`](Self::reset).
    image: BitVector,
    ticks: u64,
}

impl Computer {
    /// Build a machine with RAM initialized from `image`.
    ///
    /// An image shorter than RAM is zero-filled.
    pub fn new(config: MachineConfig, image: &RamImage) -> Result<Self, ConfigError> {
        let regs = RegisterSet::new(&config)?;

        if image.width != config.word_width {
            return Err(ConfigError::ImageWidthMismatch {
                expected: config.word_width,
                got: image.width,
            });
        }
        if image.len() > config.ram_words {
            return Err(ConfigError::ImageTooLarge {
                words: image.len(),
                capacity: config.ram_words,
            });
        }
        let width = config.word_width;
        if let Some((index, &value)) = image
            .words
            .iter()
            .enumerate()
            .find(|&(_, &v)| width < 64 && v >> width != 0)
        {
            return Err(ConfigError::ImageWordTooWide { index, value, width });
        }

        let mut words = image.words.clone();
        words.resize(config.ram_words, 0);
        let ram = BitVector::from_words(width, &words);

        tracing::info!(
            target: trace::ORCHESTRATOR,
            "new machine: {}-bit words, {} registers, {} RAM words, {} loaded",
            width,
            regs.general_count(),
            config.ram_words,
            image.len()
        );

        Ok(Self {
            state: ComputerState::new(&config, ram.clone()),
            config,
            regs,
            image: ram,
            ticks: 0,
        })
    }

    /// Build a machine from a word list.
    pub fn from_words(config: MachineConfig, words: &[u64]) -> Result<Self, ConfigError> {
        Self::new(config, &RamImage::new(config.word_width, words.to_vec()))
    }

    #[inline]
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// The register layout.
    #[inline]
    pub fn registers(&self) -> &RegisterSet {
        &self.regs
    }

    #[inline]
    pub fn state(&self) -> &ComputerState {
        &self.state
    }

    /// Paired ticks executed since construction or reset.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run `count` paired ticks: RAM first, then CPU.
    ///
    /// Stops early and returns `false` as soon as either side reports it
    /// can make no further progress.
    pub fn tick(&mut self, count: u64) -> bool {
        for _ in 0..count {
            self.ticks += 1;
            tracing::debug!(target: trace::ORCHESTRATOR, "tick {}", self.ticks);
            if !self.tick_ram() {
                tracing::warn!(target: trace::ORCHESTRATOR, "RAM bus fault at tick {}", self.ticks);
                return false;
            }
            if !self.tick_cpu() {
                tracing::debug!(target: trace::ORCHESTRATOR, "stopped at tick {}", self.ticks);
                return false;
            }
        }
        true
    }

    /// Let RAM serve the pending bus request, if any.
    pub fn tick_ram(&mut self) -> bool {
        let state = &mut self.state;
        RamRunner::new(&mut state.buses, &mut state.ram, self.config.word_width).tick()
    }

    /// Advance the CPU pipeline by one stage.
    pub fn tick_cpu(&mut self) -> bool {
        let state = &mut self.state;
        CpuRunner::new(&self.regs, &mut state.cpu, &mut state.buses).tick()
    }

    /// Check whether the CPU has not terminated.
    pub fn is_running(&self) -> bool {
        !self.state.cpu.flag(&self.regs.terminated)
    }

    /// Restore the power-on state: zeroed CPU and buses, RAM reloaded.
    pub fn reset(&mut self) {
        tracing::info!(target: trace::ORCHESTRATOR, "reset");
        self.state = ComputerState::new(&self.config, self.image.clone());
        self.ticks = 0;
    }

    /// Tick until the machine stops or `max_ticks` elapse.
    pub fn run_until_halt(&mut self, max_ticks: u64) -> RunOutcome {
        let mut ticks = 0;
        while ticks < max_ticks {
            ticks += 1;
            if !self.tick(1) {
                return RunOutcome { ticks, reason: self.stop_reason() };
            }
        }
        RunOutcome { ticks, reason: StopReason::TickLimit }
    }

    /// Why the last paired tick reported `false`.
    fn stop_reason(&self) -> StopReason {
        if self.state.cpu.flag(&self.regs.fatal) {
            StopReason::Fatal
        } else if !self.is_running() {
            StopReason::Terminated
        } else {
            StopReason::BusFault
        }
    }

    /// Read a CPU register.
    ///
    /// # Panics
    /// Panics if the reference lies outside CPU memory.
    pub fn read_cpu(&self, reference: &Reference) -> BitVector {
        self.state.cpu.get(reference)
    }

    /// Overwrite a CPU register from the host.
    ///
    /// # Panics
    /// Panics if the reference lies outside CPU memory or the width differs.
    pub fn write_cpu(&mut self, reference: &Reference, value: &BitVector) {
        self.state.cpu.set(reference, value);
    }

    /// Current pipeline stage, or `None` if the field holds an invalid value.
    pub fn pipeline_state(&self) -> Option<PipelineState> {
        PipelineState::from_bits(self.read_cpu(&self.regs.pipeline_state).to_u64())
    }

    /// Number of RAM words.
    #[inline]
    pub fn ram_len(&self) -> usize {
        self.config.ram_words
    }

    /// RAM word at `address`.
    ///
    /// # Panics
    /// Panics if `address` is outside RAM.
    pub fn ram_word(&self, address: usize) -> u64 {
        let w = self.config.word_width;
        self.state.ram.get(&Reference::new(address * w, w)).to_u64()
    }

    /// Current RAM contents as an image.
    pub fn ram_image(&self) -> RamImage {
        let w = self.config.word_width;
        RamImage::new(w, self.state.ram.get_all().to_words(w))
    }

    /// Capture every register, bus and RAM word.
    pub fn snapshot(&self) -> Snapshot {
        let regs = &self.regs;
        let cpu = self.state.cpu.get_all();
        let field = |r: &Reference| cpu.get_bits(r.address(), r.width()).to_u64();
        let flag = |r: &Reference| cpu.get(r.address());
        let buses = &self.state.buses;
        let word = buses.word();

        Snapshot {
            word_width: self.config.word_width,
            ticks: self.ticks,
            pipeline_state: PipelineState::from_bits(field(&regs.pipeline_state)),
            argument_mode: flag(&regs.argument_mode),
            command_code: field(&regs.command_code),
            arg1: field(&regs.arg1),
            arg2: field(&regs.arg2),
            flags: FlagSnapshot {
                terminated: flag(&regs.terminated),
                overflow: flag(&regs.overflow),
                fatal: flag(&regs.fatal),
                zero: flag(&regs.zero),
            },
            counter: field(&regs.counter),
            ip: field(&regs.ip),
            ar: field(&regs.ar),
            general: (0..regs.general_count())
                .map(|i| {
                    let address = (SERVICE_REGISTERS + i) * regs.word_width();
                    cpu.get_bits(address, regs.word_width()).to_u64()
                })
                .collect(),
            buses: BusSnapshot {
                enable: buses.control.get_all().get(Buses::ENABLE.address()),
                write: buses.control.get_all().get(Buses::WRITE.address()),
                address: buses.address.get_all().get_bits(0, word.width()).to_u64(),
                data: buses.data.get_all().get_bits(0, word.width()).to_u64(),
            },
            ram: self.state.ram.get_all().to_words(self.config.word_width),
        }
    }
}

/// Why [`Computer::run_until_halt`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// RST executed.
    Terminated,
    /// Fatal was raised.
    Fatal,
    /// RAM was asked for an address it does not have.
    BusFault,
    /// The tick budget ran out with the machine still going.
    TickLimit,
}

impl StopReason {
    pub const fn describe(self) -> &'static str {
        match self {
            StopReason::Terminated => "terminated",
            StopReason::Fatal => "fatal fault",
            StopReason::BusFault => "RAM bus fault",
            StopReason::TickLimit => "still running",
        }
    }
}

/// Result of [`Computer::run_until_halt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Paired ticks run, including the one that stopped the machine.
    pub ticks: u64,
    pub reason: StopReason,
}

/// The four CPU flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagSnapshot {
    pub terminated: bool,
    pub overflow: bool,
    pub fatal: bool,
    pub zero: bool,
}

/// Bus contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusSnapshot {
    pub enable: bool,
    pub write: bool,
    pub address: u64,
    pub data: u64,
}

/// A point-in-time copy of machine state, for display and comparison.
///
/// Built from raw memory, so taking a snapshot emits no memory trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub word_width: usize,
    pub ticks: u64,
    pub pipeline_state: Option<PipelineState>,
    pub argument_mode: bool,
    pub command_code: u64,
    pub arg1: u64,
    pub arg2: u64,
    pub flags: FlagSnapshot,
    pub counter: u64,
    pub ip: u64,
    pub ar: u64,
    pub general: Vec<u64>,
    pub buses: BusSnapshot,
    pub ram: Vec<u64>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.word_width;
        let stage = self.pipeline_state.map_or("invalid", PipelineState::name);

        writeln!(f, "ticks: {}  stage: {}  argument mode: {}", self.ticks, stage, u8::from(self.argument_mode))?;
        writeln!(f, "CMD  {}  ARG1 {}  ARG2 {}",
            format_word(self.command_code, w), format_word(self.arg1, w), format_word(self.arg2, w))?;
        writeln!(f, "IP   {} ({})", format_word(self.ip, w), self.ip)?;
        writeln!(f, "CNT  {} ({})", format_word(self.counter, w), self.counter)?;
        writeln!(f, "AR   {} ({})", format_word(self.ar, w), self.ar)?;
        writeln!(f, "flags: T={} O={} F={} Z={}",
            u8::from(self.flags.terminated), u8::from(self.flags.overflow),
            u8::from(self.flags.fatal), u8::from(self.flags.zero))?;
        for (i, value) in self.general.iter().enumerate() {
            writeln!(f, "CR[{}] {} ({})", i, format_word(*value, w), value)?;
        }
        writeln!(f, "bus: enable={} write={} address={} data={}",
            u8::from(self.buses.enable), u8::from(self.buses.write),
            format_word(self.buses.address, w), format_word(self.buses.data, w))?;

        let last_used = self.ram.iter().rposition(|v| *v != 0).map_or(0, |i| i + 1);
        writeln!(f, "RAM ({} of {} words shown):", last_used, self.ram.len())?;
        for (addr, value) in self.ram.iter().take(last_used).enumerate() {
            writeln!(f, "  {:03}: {}", addr, format_word(*value, w))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image;
    use crate::machine::commands::Command;

    fn config(general: usize, ram_words: usize) -> MachineConfig {
        MachineConfig::new(8, 8 + general, ram_words)
    }

    #[test]
    fn test_new_zero_fills_ram() {
        let cmp = Computer::from_words(config(2, 4), &[1, 2]).unwrap();
        assert_eq!(cmp.ram_image().words, vec![1, 2, 0, 0]);
        assert!(cmp.is_running());
        assert_eq!(cmp.pipeline_state(), Some(PipelineState::Fetch));
    }

    #[test]
    fn test_new_rejects_bad_images() {
        assert_eq!(
            Computer::from_words(config(2, 2), &[0, 0, 0]).unwrap_err(),
            ConfigError::ImageTooLarge { words: 3, capacity: 2 }
        );
        assert_eq!(
            Computer::new(config(2, 2), &RamImage::new(4, vec![0])).unwrap_err(),
            ConfigError::ImageWidthMismatch { expected: 8, got: 4 }
        );
        assert_eq!(
            Computer::from_words(config(2, 2), &[0, 0x100]).unwrap_err(),
            ConfigError::ImageWordTooWide { index: 1, value: 0x100, width: 8 }
        );
        assert!(Computer::from_words(MachineConfig::new(8, 4, 2), &[]).is_err());
    }

    #[test]
    fn test_ram_ticks_before_cpu() {
        // decode reads the word RAM placed on the bus in the same tick
        let mut cmp = Computer::from_words(config(0, 2), &[Command::Rst.code()]).unwrap();
        assert!(cmp.tick(2));
        assert_eq!(cmp.snapshot().command_code, Command::Rst.code());
    }

    #[test]
    fn test_independent_ticks() {
        let mut cmp = Computer::from_words(config(0, 2), &[Command::Inca.code()]).unwrap();

        assert!(cmp.tick_cpu()); // fetch
        assert!(cmp.tick_cpu()); // decode without RAM: sees NOOP (0) on the bus
        assert_eq!(cmp.snapshot().command_code, Command::Noop.code());

        cmp.reset();
        assert!(cmp.tick_cpu()); // fetch
        assert!(cmp.tick_ram());
        assert!(cmp.tick_cpu()); // decode
        assert!(cmp.tick_ram()); // idle
        assert!(cmp.tick_cpu()); // execute
        assert_eq!(cmp.snapshot().ar, 1);
    }

    #[test]
    fn test_tick_stops_early() {
        let mut cmp = Computer::from_words(config(0, 2), &[Command::Rst.code()]).unwrap();
        assert!(!cmp.tick(100));
        assert_eq!(cmp.ticks(), 3);
        assert!(!cmp.is_running());

        // terminated machines stay put
        let before = cmp.state().clone();
        assert!(!cmp.tick(1));
        assert!(!cmp.tick_cpu());
        assert_eq!(cmp.state(), &before);
    }

    #[test]
    fn test_bus_fault_stops_tick() {
        // ST CR[0] -> RAM[CR[1]] with CR[1] past the end of RAM
        let mut cmp = Computer::from_words(config(2, 3), &[Command::St.code(), 0, 1]).unwrap();
        let cr1 = cmp.registers().general(1).unwrap();
        cmp.write_cpu(&cr1, &BitVector::from_value(8, 200));

        assert!(cmp.tick(5));
        assert!(!cmp.tick(1));
        assert_eq!(cmp.ram_image().words, vec![Command::St.code(), 0, 1]);
    }

    #[test]
    fn test_fetch_past_ram_is_bus_fault() {
        let mut cmp = Computer::from_words(config(0, 1), &[Command::Noop.code()]).unwrap();
        assert!(cmp.tick(3));
        assert_eq!(cmp.snapshot().ip, 1);
        assert!(cmp.tick(1)); // fetch requests RAM[1]
        assert!(!cmp.tick(1));
    }

    #[test]
    fn test_reset_restores_image() {
        let mut cmp = Computer::from_words(config(2, 4), &[Command::St.code(), 0, 1]).unwrap();
        let cr1 = cmp.registers().general(1).unwrap();
        cmp.write_cpu(&cr1, &BitVector::from_value(8, 3));
        cmp.tick(6);
        assert_eq!(cmp.ram_word(0), Command::St.code());
        assert_eq!(cmp.snapshot().counter, 1);

        cmp.reset();
        let snap = cmp.snapshot();
        assert_eq!(snap.ticks, 0);
        assert_eq!(snap.counter, 0);
        assert_eq!(snap.general, vec![0, 0]);
        assert_eq!(snap.ram, vec![Command::St.code(), 0, 1, 0]);
    }

    #[test]
    fn test_overflow_not_latched() {
        let mut cmp = Computer::from_words(config(0, 2), &[Command::Noop.code()]).unwrap();
        let overflow = cmp.registers().overflow;
        cmp.write_cpu(&overflow, &BitVector::one(1));
        cmp.tick(3);
        assert!(!cmp.snapshot().flags.overflow);
    }

    #[test]
    fn test_deterministic_replay() {
        let image = image::demo();
        let config = MachineConfig::new(8, 16, 32);
        let mut a = Computer::new(config, &image).unwrap();
        let mut b = Computer::new(config, &image).unwrap();

        for _ in 0..40 {
            a.tick(1);
            b.tick(1);
            assert_eq!(a.snapshot(), b.snapshot());
        }
    }

    #[test]
    fn test_demo_program() {
        let mut cmp = Computer::new(MachineConfig::default(), &image::demo()).unwrap();
        let outcome = cmp.run_until_halt(1_000);
        let snap = cmp.snapshot();

        assert!(outcome.ticks < 1_000);
        assert_eq!(outcome.reason, StopReason::Terminated);
        assert!(!cmp.is_running());
        assert!(!snap.flags.fatal);
        assert_eq!(snap.ar, 6);
        assert_eq!(snap.general[1], 0);
        assert_eq!(snap.ip, 0x12);
    }

    #[test]
    fn test_run_until_halt_limit() {
        let mut cmp = Computer::from_words(config(0, 2), &[Command::Jmp.code(), 0]).unwrap();
        assert_eq!(
            cmp.run_until_halt(50),
            RunOutcome { ticks: 50, reason: StopReason::TickLimit }
        );
        assert!(cmp.is_running());
    }

    #[test]
    fn test_run_until_halt_reasons() {
        // RST stops on its third tick
        let mut cmp = Computer::from_words(config(0, 2), &[Command::Rst.code()]).unwrap();
        assert_eq!(
            cmp.run_until_halt(3),
            RunOutcome { ticks: 3, reason: StopReason::Terminated }
        );

        let mut cmp = Computer::from_words(config(0, 2), &[0xFF]).unwrap();
        assert_eq!(cmp.run_until_halt(10).reason, StopReason::Fatal);
    }

    #[test]
    fn test_bus_fault_on_last_allowed_tick() {
        // NOOP runs 3 ticks, fetch from RAM[1] on the 4th, bus fault on the 5th
        let mut cmp = Computer::from_words(config(0, 1), &[Command::Noop.code()]).unwrap();
        assert_eq!(
            cmp.run_until_halt(5),
            RunOutcome { ticks: 5, reason: StopReason::BusFault }
        );
        assert!(cmp.is_running());
    }

    #[test]
    fn test_huge_load_address_is_bus_fault() {
        let mut cmp = Computer::from_words(
            MachineConfig::new(64, 10, 4),
            &[Command::Ld.code(), 0, 1, 0],
        ).unwrap();
        let cr0 = cmp.registers().general(0).unwrap();
        cmp.write_cpu(&cr0, &BitVector::from_value(64, (1 << 58) - 1));

        assert!(cmp.tick(5));
        assert!(!cmp.tick(1));
        assert_eq!(cmp.snapshot().general[1], 0);
        assert_eq!(cmp.ram_image().words, vec![Command::Ld.code(), 0, 1, 0]);
    }

    #[test]
    fn test_snapshot_json() {
        let cmp = Computer::from_words(config(1, 2), &[Command::Noop.code()]).unwrap();
        let json = serde_json::to_string(&cmp.snapshot()).unwrap();
        assert!(json.contains("\"pipeline_state\":\"Fetch\""));
        assert!(json.contains("\"general\":[0]"));
    }

    #[test]
    fn test_snapshot_display() {
        let cmp = Computer::from_words(config(1, 2), &[Command::Rst.code()]).unwrap();
        let text = cmp.snapshot().to_string();
        assert!(text.contains("stage: Fetch"));
        assert!(text.contains("CR[0]"));
        assert!(text.contains("000: 0000_0001"));
    }
}
