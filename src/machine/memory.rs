//! Addressable memory regions.
//!
//! CPU-internal memory, RAM, and the three buses are all [`Memory`]
//! regions: a named bit array read and written only through
//! [`Reference`]s. Every access is traced under the `memory` category.

use serde::{Serialize, Deserialize};

use crate::bits::{BitVector, Reference};
use crate::trace;

/// A named, fixed-size bit array.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    name: String,
    cells: BitVector,
}

impl Memory {
    /// Create a zeroed region of `size` bits.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self::with_contents(name, BitVector::zero(size))
    }

    /// Create a region holding `contents`.
    pub fn with_contents(name: impl Into<String>, contents: BitVector) -> Self {
        Self {
            name: name.into(),
            cells: contents,
        }
    }

    /// Region name used in trace lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bits.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.width()
    }

    /// Check whether `reference` lies inside this region.
    #[inline]
    pub fn contains(&self, reference: &Reference) -> bool {
        reference.checked_end().is_some_and(|end| end <= self.size())
    }

    /// Read the field described by `reference`.
    ///
    /// # Panics
    /// Panics if the field does not lie inside the region.
    pub fn get(&self, reference: &Reference) -> BitVector {
        self.check(reference);
        let value = self.cells.get_bits(reference.address(), reference.width());
        tracing::trace!(target: trace::MEMORY, "{}", self.access_line('R', reference, &value));
        value
    }

    /// Read a single-bit field as a flag.
    ///
    /// # Panics
    /// Panics if the field does not lie inside the region.
    pub fn flag(&self, reference: &Reference) -> bool {
        self.get(reference).get(0)
    }

    /// Write `value` into the field described by `reference`.
    ///
    /// # Panics
    /// Panics if the field does not lie inside the region or the value
    /// width differs from the field width.
    pub fn set(&mut self, reference: &Reference, value: &BitVector) {
        self.check(reference);
        assert_eq!(
            value.width(),
            reference.width(),
            "{}: value width does not match {}",
            self.name, reference
        );
        tracing::trace!(target: trace::MEMORY, "{}", self.access_line('W', reference, value));
        self.cells.set_bits(reference.address(), value);
    }

    /// Trace line for one access: `<name>: R < <reference> = <value>`.
    fn access_line(&self, kind: char, reference: &Reference, value: &BitVector) -> String {
        format!("{}: {} < {} = {}", self.name, kind, reference, value)
    }

    /// Write a single-bit field.
    ///
    /// # Panics
    /// Panics if the field does not lie inside the region.
    pub fn set_flag(&mut self, reference: &Reference, value: bool) {
        let mut bits = BitVector::zero(reference.width());
        bits.set(0, value);
        self.set(reference, &bits);
    }

    /// Raw snapshot of the whole region, for display and tests.
    pub fn get_all(&self) -> &BitVector {
        &self.cells
    }

    /// Clear every bit.
    pub fn clear(&mut self) {
        self.cells = BitVector::zero(self.size());
    }

    fn check(&self, reference: &Reference) {
        assert!(
            reference.width() <= self.size() && self.contains(reference),
            "{}: reference {} out of range (0-{})",
            self.name, reference, self.size()
        );
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set_bits = self.cells.bits().iter().filter(|b| **b).count();

        f.debug_struct("Memory")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("set_bits", &set_bits)
            .finish()
    }
}

/// Size of the control bus in bits.
pub const CONTROL_BUS_SIZE: usize = 2;

/// The CPU/RAM handshake buses.
///
/// The control bus carries two flags; the address and data buses each
/// carry one word. Addresses on the address bus count words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buses {
    pub control: Memory,
    pub address: Memory,
    pub data: Memory,
}

impl Buses {
    /// Control bus bit 0: a request is pending.
    pub const ENABLE: Reference = Reference::named("Enable", 0, 1);
    /// Control bus bit 1: the pending request is a write (1) or read (0).
    pub const WRITE: Reference = Reference::named("Write", 1, 1);

    /// Create zeroed buses for `word_width`-bit words.
    pub fn new(word_width: usize) -> Self {
        Self {
            control: Memory::new("ControlBus", CONTROL_BUS_SIZE),
            address: Memory::new("AddressBus", word_width),
            data: Memory::new("DataBus", word_width),
        }
    }

    /// Reference covering the whole address or data bus.
    pub fn word(&self) -> Reference {
        Reference::named("Word", 0, self.data.size())
    }

    /// Clear every bus.
    pub fn clear(&mut self) {
        self.control.clear();
        self.address.clear();
        self.data.clear();
    }
}
