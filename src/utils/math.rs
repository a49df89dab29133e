// src/utils/math.rs

//! Integer helpers shared by the bitstream and transform code.
//!
//! Everything that touches picture data works on [`BigInt`] so that no
//! intermediate value is ever truncated.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

/// Number of bits needed to hold `n - 1`, i.e. `ceil(log2(n))` for `n >= 1`.
///
/// `intlog2(0)` and `intlog2(1)` are both 0.
pub fn intlog2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        64 - (n - 1).leading_zeros()
    }
}

/// Sign of `n` as -1, 0 or 1.
pub fn sign(n: &BigInt) -> i32 {
    if n.is_zero() {
        0
    } else if n.is_negative() {
        -1
    } else {
        1
    }
}

/// Clamps `n` to `[lower, upper]`.
pub fn clip(n: &BigInt, lower: &BigInt, upper: &BigInt) -> BigInt {
    if n < lower {
        lower.clone()
    } else if n > upper {
        upper.clone()
    } else {
        n.clone()
    }
}

/// Rounded mean with ties rounded up, `(sum + n/2) // n` with floor division.
pub fn mean(values: &[BigInt]) -> BigInt {
    if values.is_empty() {
        return BigInt::zero();
    }
    let n = BigInt::from(values.len());
    let sum: BigInt = values.iter().sum();
    (sum + n.div_floor(&BigInt::from(2))).div_floor(&n)
}

/// `2^exp` as a `BigInt`.
pub fn pow2(exp: u32) -> BigInt {
    BigInt::from(1) << exp
}

/// Arithmetic right shift, rounding towards negative infinity.
pub fn shr_floor(n: BigInt, shift: u32) -> BigInt {
    n.div_floor(&pow2(shift))
}

/// Converts to `u64`, returning `None` for negative or oversized values.
pub fn to_u64(n: &BigInt) -> Option<u64> {
    n.to_u64()
}

/// Number of bits in the binary representation of `n` (0 for zero).
pub fn bit_length(n: &BigInt) -> u64 {
    n.bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intlog2() {
        assert_eq!(intlog2(0), 0);
        assert_eq!(intlog2(1), 0);
        assert_eq!(intlog2(2), 1);
        assert_eq!(intlog2(3), 2);
        assert_eq!(intlog2(4), 2);
        assert_eq!(intlog2(5), 3);
        assert_eq!(intlog2(256), 8);
        assert_eq!(intlog2(257), 9);
    }

    #[test]
    fn test_mean_rounds_half_up() {
        let v = |xs: &[i64]| xs.iter().map(|&x| BigInt::from(x)).collect::<Vec<_>>();
        assert_eq!(mean(&v(&[1, 2, 3])), BigInt::from(2));
        assert_eq!(mean(&v(&[1, 2])), BigInt::from(2));
        assert_eq!(mean(&v(&[-1, -2])), BigInt::from(-1));
        assert_eq!(mean(&v(&[-1, -1, -2])), BigInt::from(-1));
        assert_eq!(mean(&v(&[0, 0, 1])), BigInt::from(0));
    }

    #[test]
    fn test_clip_and_sign() {
        let lo = BigInt::from(-128);
        let hi = BigInt::from(127);
        assert_eq!(clip(&BigInt::from(300), &lo, &hi), hi);
        assert_eq!(clip(&BigInt::from(-300), &lo, &hi), lo);
        assert_eq!(clip(&BigInt::from(5), &lo, &hi), BigInt::from(5));
        assert_eq!(sign(&BigInt::from(-7)), -1);
        assert_eq!(sign(&BigInt::zero()), 0);
        assert_eq!(sign(&pow2(100)), 1);
    }

    #[test]
    fn test_shr_floor_rounds_down() {
        assert_eq!(shr_floor(BigInt::from(-3), 1), BigInt::from(-2));
        assert_eq!(shr_floor(BigInt::from(3), 1), BigInt::from(1));
        assert_eq!(shr_floor(BigInt::from(-4), 2), BigInt::from(-1));
        assert_eq!(shr_floor(BigInt::from(7), 0), BigInt::from(7));
    }
}
