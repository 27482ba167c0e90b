//! Multi-bit arithmetic.
//!
//! Provides addition and subtraction for bit vectors using bit-serial
//! ripple-carry and ripple-borrow algorithms. Both operations are total:
//! every bit pattern produces a result, and the final carry/borrow is
//! reported instead of trapping.

use crate::bits::BitVector;

/// Single-bit full adder, returning (sum, carry_out).
#[inline]
pub const fn full_add(a: bool, b: bool, carry: bool) -> (bool, bool) {
    let sum = a ^ b ^ carry;
    let carry_out = (a & b) | (a & carry) | (b & carry);
    (sum, carry_out)
}

/// Single-bit full subtractor computing `a - b - borrow`, returning
/// (difference, borrow_out).
#[inline]
pub const fn full_sub(a: bool, b: bool, borrow: bool) -> (bool, bool) {
    let diff = a ^ b ^ borrow;
    let borrow_out = (!a & b) | (!(a ^ b) & borrow);
    (diff, borrow_out)
}

/// Add two vectors of equal width, returning (result, carry_out).
///
/// The carry out is the unsigned overflow signal.
///
/// # Panics
/// Panics if the widths differ.
pub fn plus(a: &BitVector, b: &BitVector) -> (BitVector, bool) {
    assert_eq!(a.width(), b.width(), "operand widths differ");
    let mut result = BitVector::zero(a.width());
    let mut carry = false;

    for i in 0..a.width() {
        let (sum, new_carry) = full_add(a.get(i), b.get(i), carry);
        result.set(i, sum);
        carry = new_carry;
    }

    (result, carry)
}

/// Subtract two vectors of equal width (a - b), returning (result, borrow_out).
///
/// The borrow out is set exactly when the unsigned minuend is less than
/// the subtrahend.
///
/// # Panics
/// Panics if the widths differ.
pub fn minus(a: &BitVector, b: &BitVector) -> (BitVector, bool) {
    assert_eq!(a.width(), b.width(), "operand widths differ");
    let mut result = BitVector::zero(a.width());
    let mut borrow = false;

    for i in 0..a.width() {
        let (diff, new_borrow) = full_sub(a.get(i), b.get(i), borrow);
        result.set(i, diff);
        borrow = new_borrow;
    }

    (result, borrow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(width: usize, value: u64) -> BitVector {
        BitVector::from_value(width, value)
    }

    #[test]
    fn test_plus_single_bit() {
        assert_eq!(plus(&v(1, 0), &v(1, 0)), (v(1, 0), false));
        assert_eq!(plus(&v(1, 0), &v(1, 1)), (v(1, 1), false));
        assert_eq!(plus(&v(1, 1), &v(1, 0)), (v(1, 1), false));
        assert_eq!(plus(&v(1, 1), &v(1, 1)), (v(1, 0), true));
    }

    #[test]
    fn test_plus_nibble() {
        assert_eq!(plus(&v(4, 0b0001), &v(4, 0b0010)), (v(4, 0b0011), false));
        assert_eq!(plus(&v(4, 0b0110), &v(4, 0b0011)), (v(4, 0b1001), false));
        assert_eq!(plus(&v(4, 0b1000), &v(4, 0b0111)), (v(4, 0b1111), false));
        assert_eq!(plus(&v(4, 0b1000), &v(4, 0b1000)), (v(4, 0b0000), true));
        assert_eq!(plus(&v(4, 0b1000), &v(4, 0b1111)), (v(4, 0b0111), true));
        assert_eq!(plus(&v(4, 0b0001), &v(4, 0b1111)), (v(4, 0b0000), true));
    }

    #[test]
    fn test_minus_single_bit() {
        assert_eq!(minus(&v(1, 0), &v(1, 0)), (v(1, 0), false));
        assert_eq!(minus(&v(1, 0), &v(1, 1)), (v(1, 1), true));
        assert_eq!(minus(&v(1, 1), &v(1, 0)), (v(1, 1), false));
        assert_eq!(minus(&v(1, 1), &v(1, 1)), (v(1, 0), false));
    }

    #[test]
    fn test_minus_exhaustive() {
        for width in [1usize, 4, 8] {
            let limit = 1u64 << width;
            for i in 0..limit {
                for j in 0..=i {
                    assert_eq!(
                        minus(&v(width, i), &v(width, j)),
                        (v(width, i - j), false),
                        "{} - {} at width {}", i, j, width
                    );
                }
            }
        }
    }

    #[test]
    fn test_plus_carry_exhaustive() {
        for width in [1usize, 4, 8] {
            let limit = 1u64 << width;
            for i in 0..limit {
                for j in 0..limit {
                    let (result, carry) = plus(&v(width, i), &v(width, j));
                    assert_eq!(carry, i + j >= limit, "{} + {} at width {}", i, j, width);
                    assert_eq!(result.to_u64(), (i + j) % limit);
                }
            }
        }
    }

    #[test]
    fn test_minus_underflow_wraps() {
        assert_eq!(minus(&v(4, 0), &v(4, 1)), (v(4, 0b1111), true));
        assert_eq!(minus(&v(4, 3), &v(4, 5)), (v(4, 14), true));
    }

    proptest! {
        #[test]
        fn prop_plus_matches_modular_sum(width in 1usize..=32, a: u64, b: u64) {
            let mask = (1u64 << width) - 1;
            let (a, b) = (a & mask, b & mask);
            let (result, carry) = plus(&v(width, a), &v(width, b));
            prop_assert_eq!(result.to_u64(), (a + b) & mask);
            prop_assert_eq!(carry, a + b > mask);
        }

        #[test]
        fn prop_minus_borrow_iff_less(width in 1usize..=32, a: u64, b: u64) {
            let mask = (1u64 << width) - 1;
            let (a, b) = (a & mask, b & mask);
            let (result, borrow) = minus(&v(width, a), &v(width, b));
            prop_assert_eq!(result.to_u64(), a.wrapping_sub(b) & mask);
            prop_assert_eq!(borrow, a < b);
        }

        #[test]
        fn prop_minus_undoes_plus(width in 1usize..=32, a: u64, b: u64) {
            let mask = (1u64 << width) - 1;
            let (a, b) = (v(width, a & mask), v(width, b & mask));
            let (sum, _) = plus(&a, &b);
            let (back, _) = minus(&sum, &b);
            prop_assert_eq!(back, a);
        }
    }
}
