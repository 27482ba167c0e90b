//! Typed bit-field descriptors.

use std::cmp::Ordering;
use std::fmt;
use serde::{Serialize, Deserialize};

/// Identifies a bit-field `[address, address + width)` inside some
/// memory region.
///
/// References are immutable once built. They order by address, which is
/// only meaningful for layout assertions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    address: usize,
    width: usize,
    #[serde(skip)]
    name: Option<&'static str>,
}

impl Reference {
    /// Create an anonymous reference.
    ///
    /// # Panics
    /// Panics if `width` is zero.
    pub const fn new(address: usize, width: usize) -> Self {
        assert!(width > 0, "reference width must be non-zero");
        Self { address, width, name: None }
    }

    /// Create a named reference.
    ///
    /// # Panics
    /// Panics if `width` is zero.
    pub const fn named(name: &'static str, address: usize, width: usize) -> Self {
        assert!(width > 0, "reference width must be non-zero");
        Self { address, width, name: Some(name) }
    }

    /// First bit of the field.
    #[inline]
    pub const fn address(&self) -> usize {
        self.address
    }

    /// Number of bits in the field.
    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// One past the last bit of the field, or `None` if that overflows.
    #[inline]
    pub const fn checked_end(&self) -> Option<usize> {
        self.address.checked_add(self.width)
    }

    /// One past the last bit of the field, saturating at `usize::MAX`.
    #[inline]
    pub const fn end(&self) -> usize {
        self.address.saturating_add(self.width)
    }

    /// Human-readable name, if any.
    #[inline]
    pub const fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Check whether two fields share at least one bit.
    pub const fn overlaps(&self, other: &Reference) -> bool {
        self.address < other.end() && other.address < self.end()
    }

    /// Check whether `other` lies entirely inside this field.
    pub const fn contains(&self, other: &Reference) -> bool {
        self.address <= other.address && other.end() <= self.end()
    }
}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address
            .cmp(&other.address)
            .then(self.width.cmp(&other.width))
            .then(self.name.cmp(&other.name))
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name {
            write!(f, "{}@", name)?;
        }
        write!(f, "{}:{}", self.address, self.width)
    }
}
