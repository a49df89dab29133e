// src/transform/tests.rs

use num_bigint::BigInt;
use num_traits::Zero;

use crate::tables::LIFTING_FILTERS;
use crate::transform::quantization::{forward_quant, inverse_quant};
use crate::transform::wavelet::{dwt, idwt, pad};
use crate::transform::{Orientation, WaveletConfig, subband_order};
use crate::utils::arrays::Array2D;

/// A deterministic picture with a wide spread of values.
fn test_picture(width: usize, height: usize, depth: u32) -> Array2D<BigInt> {
    let mut picture = Array2D::new(width, height, BigInt::zero());
    let range = 1i64 << depth;
    let mut seed = 12345i64;
    for y in 0..height {
        for x in 0..width {
            seed = (seed * 1103515245 + 12345) % 2147483648;
            picture[(y, x)] = BigInt::from(seed % range - range / 2);
        }
    }
    picture
}

/// Pads, transforms, inverts and crops, returning the reconstruction.
fn round_trip(picture: &Array2D<BigInt>, config: &WaveletConfig) -> Array2D<BigInt> {
    let (align_x, align_y) = config.alignment();
    let width = picture.width().div_ceil(align_x) * align_x;
    let height = picture.height().div_ceil(align_y) * align_y;
    let padded = pad(picture, width, height);
    let coeffs = dwt(&padded, config).expect("forward transform");
    let synthesized = idwt(&coeffs, config).expect("inverse transform");
    assert_eq!(synthesized, padded, "config {:?}", config);
    synthesized.crop(0, 0, picture.width(), picture.height())
}

#[test]
fn test_invertible_for_every_filter_and_depth() {
    for wavelet_index in 0..LIFTING_FILTERS.len() as u64 {
        for dwt_depth in 0..=3 {
            let config = WaveletConfig::symmetric(wavelet_index, dwt_depth);
            let picture = test_picture(16, 8, 10);
            assert_eq!(round_trip(&picture, &config), picture);
        }
    }
}

#[test]
fn test_invertible_with_odd_dimensions() {
    for wavelet_index in 0..LIFTING_FILTERS.len() as u64 {
        let config = WaveletConfig::symmetric(wavelet_index, 2);
        let picture = test_picture(13, 7, 8);
        assert_eq!(round_trip(&picture, &config), picture);
    }
}

#[test]
fn test_invertible_asymmetric() {
    let configs = [
        WaveletConfig {
            wavelet_index: 1,
            wavelet_index_ho: 4,
            dwt_depth: 1,
            dwt_depth_ho: 2,
        },
        WaveletConfig {
            wavelet_index: 6,
            wavelet_index_ho: 5,
            dwt_depth: 2,
            dwt_depth_ho: 1,
        },
        WaveletConfig {
            wavelet_index: 0,
            wavelet_index_ho: 3,
            dwt_depth: 0,
            dwt_depth_ho: 3,
        },
    ];
    for config in &configs {
        let picture = test_picture(11, 5, 12);
        assert_eq!(round_trip(&picture, config), picture);
    }
}

#[test]
fn test_large_values_are_not_truncated() {
    let mut picture = Array2D::new(4, 4, BigInt::zero());
    picture[(1, 2)] = BigInt::from(1) << 100u32;
    picture[(3, 3)] = -(BigInt::from(1) << 90u32);
    let config = WaveletConfig::symmetric(6, 2);
    assert_eq!(round_trip(&picture, &config), picture);
}

#[test]
fn test_subband_dimensions() {
    let config = WaveletConfig {
        wavelet_index: 1,
        wavelet_index_ho: 1,
        dwt_depth: 2,
        dwt_depth_ho: 1,
    };
    let coeffs = dwt(&test_picture(16, 8, 8), &config).expect("forward transform");
    let order = subband_order(2, 1);
    assert_eq!(coeffs.len(), order.len());
    let dims = |level, orientation| {
        let band = &coeffs[&(level, orientation)];
        (band.width(), band.height())
    };
    assert_eq!(dims(0, Orientation::L), (2, 2));
    assert_eq!(dims(1, Orientation::H), (2, 2));
    assert_eq!(dims(2, Orientation::HL), (4, 2));
    assert_eq!(dims(3, Orientation::HH), (8, 4));
}

#[test]
fn test_subband_order() {
    use Orientation::*;
    assert_eq!(subband_order(1, 0), vec![(0, LL), (1, HL), (1, LH), (1, HH)]);
    assert_eq!(
        subband_order(1, 2),
        vec![(0, L), (1, H), (2, H), (3, HL), (3, LH), (3, HH)]
    );
    assert_eq!(subband_order(0, 0), vec![(0, LL)]);
}

#[test]
fn test_quantizer_zero_and_monotonic() {
    for index in 0..64u32 {
        assert_eq!(inverse_quant(&forward_quant(&BigInt::zero(), index), index), BigInt::zero());
        let mut previous: Option<BigInt> = None;
        for x in -300i64..=300 {
            let y = inverse_quant(&forward_quant(&BigInt::from(x), index), index);
            if let Some(p) = &previous {
                assert!(p <= &y, "index {} not monotonic at {}", index, x);
            }
            previous = Some(y);
        }
    }
}
