//! Fixed-width binary containers.
//!
//! A [`BitVector`] is the single storage type of the machine: a word,
//! a bus, a flag, and a whole RAM image are all bit vectors of different
//! widths. Bits are stored from least significant (index 0) upward.

use std::fmt;
use serde::{Serialize, Deserialize};

/// An owned, fixed-width vector of bits (LSB first).
///
/// The width is chosen at construction and never changes. A width of
/// zero is rejected.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitVector {
    /// Bits stored from least significant (index 0) to most significant.
    bits: Vec<bool>,
}

impl BitVector {
    /// Create an all-zero vector.
    ///
    /// # Panics
    /// Panics if `width` is zero.
    pub fn zero(width: usize) -> Self {
        assert!(width > 0, "bit vector width must be non-zero");
        Self { bits: vec![false; width] }
    }

    /// Create a vector holding the value 1.
    ///
    /// # Panics
    /// Panics if `width` is zero.
    pub fn one(width: usize) -> Self {
        let mut result = Self::zero(width);
        result.bits[0] = true;
        result
    }

    /// Create a vector from an unsigned integer.
    ///
    /// # Panics
    /// Panics if `width` is zero or `value` does not fit in `width` bits.
    pub fn from_value(width: usize, value: u64) -> Self {
        assert!(
            width >= 64 || value >> width == 0,
            "Value {} out of range for {}-bit vector",
            value, width
        );

        let mut result = Self::zero(width);
        for i in 0..width.min(64) {
            result.bits[i] = (value >> i) & 1 == 1;
        }
        result
    }

    /// Create a vector from a bit slice (LSB first).
    ///
    /// # Panics
    /// Panics if `bits` is empty.
    pub fn from_bits(bits: &[bool]) -> Self {
        assert!(!bits.is_empty(), "bit vector width must be non-zero");
        Self { bits: bits.to_vec() }
    }

    /// Pack a sequence of `width`-bit words into one vector.
    ///
    /// Word `i` occupies bits `[i * width, (i + 1) * width)`.
    ///
    /// # Panics
    /// Panics if `words` is empty or any word does not fit in `width` bits.
    pub fn from_words(width: usize, words: &[u64]) -> Self {
        assert!(!words.is_empty(), "bit vector width must be non-zero");
        let mut bits = Vec::with_capacity(width * words.len());
        for &word in words {
            bits.extend_from_slice(Self::from_value(width, word).bits());
        }
        Self { bits }
    }

    /// Number of bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// The underlying bits (LSB first).
    #[inline]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Get a single bit by index (0 = LSB).
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// Set a single bit by index (0 = LSB).
    #[inline]
    pub fn set(&mut self, index: usize, bit: bool) {
        self.bits[index] = bit;
    }

    /// Extract `width` bits starting at `offset`.
    ///
    /// # Panics
    /// Panics if the field does not lie inside the vector.
    pub fn get_bits(&self, offset: usize, width: usize) -> BitVector {
        assert!(
            offset + width <= self.width(),
            "bit field {}:{} out of range for {}-bit vector",
            offset, width, self.width()
        );
        Self::from_bits(&self.bits[offset..offset + width])
    }

    /// Overwrite the bits starting at `offset` with `value`.
    ///
    /// # Panics
    /// Panics if the field does not lie inside the vector.
    pub fn set_bits(&mut self, offset: usize, value: &BitVector) {
        assert!(
            offset + value.width() <= self.width(),
            "bit field {}:{} out of range for {}-bit vector",
            offset, value.width(), self.width()
        );
        self.bits[offset..offset + value.width()].copy_from_slice(value.bits());
    }

    /// Convert to an unsigned integer (low 64 bits).
    pub fn to_u64(&self) -> u64 {
        self.bits
            .iter()
            .take(64)
            .enumerate()
            .fold(0, |acc, (i, &bit)| acc | (u64::from(bit) << i))
    }

    /// Split into consecutive `width`-bit words, discarding a partial tail.
    pub fn to_words(&self, width: usize) -> Vec<u64> {
        (0..self.width() / width)
            .map(|i| self.get_bits(i * width, width).to_u64())
            .collect()
    }

    /// Check if every bit is clear.
    pub fn is_zero(&self) -> bool {
        self.bits.iter().all(|b| !b)
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector(0b{}", self)?;
        if self.width() <= 64 {
            write!(f, " = {}", self.to_u64())?;
        }
        write!(f, ")")
    }
}

/// Bits are written most significant first, like a binary literal.
impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in self.bits.iter().rev() {
            write!(f, "{}", if bit { '1' } else { '0' })?;
        }
        Ok(())
    }
}
