// src/transform/quantization.rs

//! Dead-zone quantiser (13.3).

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

use crate::utils::math::pow2;

/// (13.3.2) Quantisation factor, a fixed-point approximation of
/// `4 * 2^(index/4)`.
pub fn quant_factor(index: u32) -> BigInt {
    let base = pow2(index / 4);
    match index % 4 {
        0 => base * 4u32,
        1 => (base * 503829u32 + 52958u32) / 105917u32,
        2 => (base * 665857u32 + 58854u32) / 117708u32,
        _ => (base * 440253u32 + 32722u32) / 65444u32,
    }
}

/// (13.3.2) Reconstruction offset for a quantisation index.
pub fn quant_offset(index: u32) -> BigInt {
    match index {
        0 => BigInt::from(1),
        1 => BigInt::from(2),
        _ => (quant_factor(index) + 1u32).div_floor(&BigInt::from(2)),
    }
}

/// (13.3.1) Reconstructs a coefficient from its quantised value.
pub fn inverse_quant(quantized: &BigInt, index: u32) -> BigInt {
    if quantized.is_zero() {
        return BigInt::zero();
    }
    let magnitude = quantized.abs() * quant_factor(index) + quant_offset(index) + 2u32;
    let magnitude = magnitude.div_floor(&BigInt::from(4));
    if quantized.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// Quantises a coefficient, the inverse of [`inverse_quant`] up to the
/// quantiser step.
pub fn forward_quant(coefficient: &BigInt, index: u32) -> BigInt {
    let magnitude = (coefficient.abs() * 4u32).div_floor(&quant_factor(index));
    if coefficient.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}
