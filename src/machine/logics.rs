//! ALU and bookkeeping primitives.
//!
//! [`CpuLogics`] borrows CPU memory and the buses for the duration of one
//! tick and performs the side-effecting micro-operations instruction
//! handlers are written in terms of.

use crate::bits::{arith, BitVector, Reference};
use crate::machine::memory::{Buses, Memory};
use crate::machine::registers::RegisterSet;
use crate::trace;

/// Micro-operations over CPU memory and the buses.
pub struct CpuLogics<'a> {
    regs: &'a RegisterSet,
    cpu: &'a mut Memory,
    buses: &'a mut Buses,
}

impl<'a> CpuLogics<'a> {
    /// Borrow the state one tick needs.
    pub fn new(regs: &'a RegisterSet, cpu: &'a mut Memory, buses: &'a mut Buses) -> Self {
        Self { regs, cpu, buses }
    }

    /// The register layout.
    #[inline]
    pub fn regs(&self) -> &'a RegisterSet {
        self.regs
    }

    /// Read a CPU register.
    #[inline]
    pub fn read(&self, reference: &Reference) -> BitVector {
        self.cpu.get(reference)
    }

    /// Overwrite a CPU register.
    #[inline]
    pub fn write(&mut self, reference: &Reference, value: &BitVector) {
        self.cpu.set(reference, value);
    }

    /// Read a CPU flag.
    #[inline]
    pub fn flag(&self, reference: &Reference) -> bool {
        self.cpu.flag(reference)
    }

    /// Overwrite a CPU flag.
    #[inline]
    pub fn set_flag(&mut self, reference: &Reference, value: bool) {
        self.cpu.set_flag(reference, value);
    }

    /// Zero a CPU register.
    pub fn clear_register(&mut self, reference: &Reference) {
        self.cpu.set(reference, &BitVector::zero(reference.width()));
    }

    /// Overwrite the Overflow flag. Overflow is never latched.
    pub fn set_overflow(&mut self, value: bool) {
        tracing::trace!(target: trace::ALU, "set_overflow({})", value);
        let overflow = self.regs.overflow;
        self.cpu.set_flag(&overflow, value);
    }

    /// `register += value`, updating Overflow. Returns the carry out.
    pub fn add_to_register(&mut self, reference: &Reference, value: &BitVector) -> bool {
        tracing::trace!(target: trace::ALU, "add_to_register({}, {})", reference, value);
        let old_value = self.cpu.get(reference);
        let (new_value, carry) = arith::plus(&old_value, value);
        self.cpu.set(reference, &new_value);
        self.set_overflow(carry);
        carry
    }

    /// `register -= value`, updating Overflow. Returns the borrow out.
    pub fn sub_register(&mut self, reference: &Reference, value: &BitVector) -> bool {
        tracing::trace!(target: trace::ALU, "sub_register({}, {})", reference, value);
        let old_value = self.cpu.get(reference);
        let (new_value, borrow) = arith::minus(&old_value, value);
        self.cpu.set(reference, &new_value);
        self.set_overflow(borrow);
        borrow
    }

    /// `register += 1`.
    pub fn inc_register(&mut self, reference: &Reference) -> bool {
        self.add_to_register(reference, &BitVector::one(reference.width()))
    }

    /// `register -= 1`.
    pub fn dec_register(&mut self, reference: &Reference) -> bool {
        self.sub_register(reference, &BitVector::one(reference.width()))
    }

    /// Set Fatal and Terminated. There is no way back.
    pub fn raise_fatal(&mut self) {
        tracing::warn!(target: trace::ALU, "fatal fault raised");
        let (fatal, terminated) = (self.regs.fatal, self.regs.terminated);
        self.cpu.set_flag(&fatal, true);
        self.cpu.set_flag(&terminated, true);
    }

    /// Check the Terminated flag.
    pub fn is_terminated(&self) -> bool {
        self.cpu.flag(&self.regs.terminated)
    }

    /// Ask RAM to put the word at `address` on the data bus next tick.
    pub fn request_ram_read(&mut self, address: &BitVector) {
        tracing::trace!(target: trace::ALU, "request_ram_read({})", address);
        let word = self.buses.word();
        self.buses.control.set_flag(&Buses::ENABLE, true);
        self.buses.control.set_flag(&Buses::WRITE, false);
        self.buses.address.set(&word, address);
    }

    /// Ask RAM to store `value` at `address` next tick.
    pub fn request_ram_write(&mut self, address: &BitVector, value: &BitVector) {
        tracing::trace!(target: trace::ALU, "request_ram_write({}, {})", address, value);
        let word = self.buses.word();
        self.buses.control.set_flag(&Buses::ENABLE, true);
        self.buses.control.set_flag(&Buses::WRITE, true);
        self.buses.address.set(&word, address);
        self.buses.data.set(&word, value);
    }

    /// Withdraw any pending bus request.
    pub fn clear_bus_request(&mut self) {
        self.buses.control.set_flag(&Buses::ENABLE, false);
    }

    /// The word RAM last placed on the data bus.
    pub fn read_data_bus(&self) -> BitVector {
        self.buses.data.get(&self.buses.word())
    }

    /// Count one executed instruction; overflow is fatal.
    pub fn inc_counter(&mut self) {
        let counter = self.regs.counter;
        if self.inc_register(&counter) {
            self.raise_fatal();
        }
    }

    /// Advance IP by `word_count` words; overflow is fatal.
    pub fn bump_ip(&mut self, word_count: usize) {
        tracing::trace!(target: trace::ALU, "bump_ip({})", word_count);
        let ip = self.regs.ip;
        let step = BitVector::from_value(ip.width(), word_count as u64);
        if self.add_to_register(&ip, &step) {
            self.raise_fatal();
        }
    }

    /// Commit an instruction of `word_count` words: bump Counter then IP.
    pub fn set_next_operation(&mut self, word_count: usize) {
        tracing::trace!(target: trace::ALU, "set_next_operation({})", word_count);
        self.inc_counter();
        self.bump_ip(word_count);
    }
}
