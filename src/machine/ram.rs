//! The RAM side of the bus handshake.

use crate::bits::Reference;
use crate::machine::memory::{Buses, Memory};
use crate::trace;

/// Serves one pending bus request per tick.
pub struct RamRunner<'a> {
    buses: &'a mut Buses,
    ram: &'a mut Memory,
    word_width: usize,
}

impl<'a> RamRunner<'a> {
    pub fn new(buses: &'a mut Buses, ram: &'a mut Memory, word_width: usize) -> Self {
        Self { buses, ram, word_width }
    }

    /// Serve the request on the buses, if any.
    ///
    /// Returns `false` only when the address bus points outside RAM; in
    /// that case nothing is read or written.
    pub fn tick(&mut self) -> bool {
        if !self.buses.control.flag(&Buses::ENABLE) {
            tracing::trace!(target: trace::RAM, "tick: idle");
            return true;
        }

        let word = self.buses.word();
        let address = self.buses.address.get(&word).to_u64();
        let Some(cell) = self.cell(address) else {
            tracing::error!(
                target: trace::RAM,
                "address {} outside RAM of {} words",
                address,
                self.ram.size() / self.word_width
            );
            return false;
        };

        if self.buses.control.flag(&Buses::WRITE) {
            let value = self.buses.data.get(&word);
            tracing::debug!(target: trace::RAM, "write [{}] = {}", address, value);
            self.ram.set(&cell, &value);
        } else {
            let value = self.ram.get(&cell);
            tracing::debug!(target: trace::RAM, "read [{}] = {}", address, value);
            self.buses.data.set(&word, &value);
        }
        true
    }

    fn cell(&self, address: u64) -> Option<Reference> {
        let offset = usize::try_from(address).ok()?.checked_mul(self.word_width)?;
        let end = offset.checked_add(self.word_width)?;
        (end <= self.ram.size()).then(|| Reference::new(offset, self.word_width))
    }
}
