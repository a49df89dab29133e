// src/transform/wavelet.rs

//! Lifting-based discrete wavelet transform (15.4).
//!
//! Synthesis applies the lifting stages of a filter in order; analysis applies
//! the same stages in reverse with additions and subtractions swapped, so the
//! two directions are exact inverses for any input.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::tables::{LiftType, LiftingFilter, LiftingStage};
use crate::transform::{Coefficients, Orientation, TransformError, WaveletConfig};
use crate::utils::arrays::Array2D;
use crate::utils::math::shr_floor;

/// (15.4.4.1) One lifting step applied in place.
fn lift(a: &mut [BigInt], stage: &LiftingStage, lift_type: LiftType) {
    let len = a.len() as i64;
    let updates_even = matches!(lift_type, LiftType::EvenAddOdd | LiftType::EvenSubtractOdd);
    for n in 0..len / 2 {
        let mut sum = BigInt::zero();
        for i in stage.d..stage.l + stage.d {
            let pos = if updates_even {
                (2 * (n + i) - 1).min(len - 1).max(1)
            } else {
                (2 * (n + i)).min(len - 2).max(0)
            };
            sum += &a[pos as usize] * BigInt::from(stage.taps[(i - stage.d) as usize]);
        }
        if stage.s > 0 {
            sum += BigInt::one() << (stage.s - 1);
        }
        let delta = shr_floor(sum, stage.s);
        let target = (if updates_even { 2 * n } else { 2 * n + 1 }) as usize;
        match lift_type {
            LiftType::EvenAddOdd | LiftType::OddAddEven => a[target] += delta,
            LiftType::EvenSubtractOdd | LiftType::OddSubtractEven => a[target] -= delta,
        }
    }
}

/// (15.4.4.1) One-dimensional synthesis, in place.
pub fn oned_synthesis(a: &mut [BigInt], filter: &LiftingFilter) {
    for stage in filter.stages {
        lift(a, stage, stage.lift_type);
    }
}

/// One-dimensional analysis, the inverse of [`oned_synthesis`].
pub fn oned_analysis(a: &mut [BigInt], filter: &LiftingFilter) {
    for stage in filter.stages.iter().rev() {
        lift(a, stage, stage.lift_type.inverse());
    }
}

fn synthesize_columns(data: &mut Array2D<BigInt>, filter: &LiftingFilter) {
    for x in 0..data.width() {
        let mut column = data.column(x);
        oned_synthesis(&mut column, filter);
        data.set_column(x, &column);
    }
}

fn analyze_columns(data: &mut Array2D<BigInt>, filter: &LiftingFilter) {
    for x in 0..data.width() {
        let mut column = data.column(x);
        oned_analysis(&mut column, filter);
        data.set_column(x, &column);
    }
}

fn round_shift(data: &mut Array2D<BigInt>, shift: u32) {
    if shift > 0 {
        for v in data.iter_mut() {
            let rounded = std::mem::take(v) + (BigInt::one() << (shift - 1));
            *v = shr_floor(rounded, shift);
        }
    }
}

fn scale_up(data: &mut Array2D<BigInt>, shift: u32) {
    if shift > 0 {
        for v in data.iter_mut() {
            *v <<= shift;
        }
    }
}

/// (15.4.2) Horizontal-only synthesis.
pub fn h_synthesis(
    l_data: &Array2D<BigInt>,
    h_data: &Array2D<BigInt>,
    filter_ho: &LiftingFilter,
) -> Array2D<BigInt> {
    let mut synth = Array2D::new(2 * l_data.width(), l_data.height(), BigInt::zero());
    for y in 0..l_data.height() {
        for x in 0..l_data.width() {
            synth[(y, 2 * x)] = l_data[(y, x)].clone();
            synth[(y, 2 * x + 1)] = h_data[(y, x)].clone();
        }
    }
    for y in 0..synth.height() {
        oned_synthesis(synth.row_mut(y), filter_ho);
    }
    round_shift(&mut synth, filter_ho.filter_bit_shift);
    synth
}

/// (15.4.3) Interleaved vertical and horizontal synthesis.
pub fn vh_synthesis(
    ll_data: &Array2D<BigInt>,
    hl_data: &Array2D<BigInt>,
    lh_data: &Array2D<BigInt>,
    hh_data: &Array2D<BigInt>,
    filter: &LiftingFilter,
    filter_ho: &LiftingFilter,
) -> Array2D<BigInt> {
    let mut synth = Array2D::new(2 * ll_data.width(), 2 * ll_data.height(), BigInt::zero());
    for y in 0..ll_data.height() {
        for x in 0..ll_data.width() {
            synth[(2 * y, 2 * x)] = ll_data[(y, x)].clone();
            synth[(2 * y, 2 * x + 1)] = hl_data[(y, x)].clone();
            synth[(2 * y + 1, 2 * x)] = lh_data[(y, x)].clone();
            synth[(2 * y + 1, 2 * x + 1)] = hh_data[(y, x)].clone();
        }
    }
    synthesize_columns(&mut synth, filter);
    for y in 0..synth.height() {
        oned_synthesis(synth.row_mut(y), filter_ho);
    }
    round_shift(&mut synth, filter_ho.filter_bit_shift);
    synth
}

/// Horizontal-only analysis, the inverse of [`h_synthesis`].
pub fn h_analysis(
    mut data: Array2D<BigInt>,
    filter_ho: &LiftingFilter,
) -> (Array2D<BigInt>, Array2D<BigInt>) {
    scale_up(&mut data, filter_ho.filter_bit_shift);
    for y in 0..data.height() {
        oned_analysis(data.row_mut(y), filter_ho);
    }
    let (w, h) = (data.width() / 2, data.height());
    let mut l_data = Array2D::new(w, h, BigInt::zero());
    let mut h_data = Array2D::new(w, h, BigInt::zero());
    for y in 0..h {
        for x in 0..w {
            l_data[(y, x)] = std::mem::take(&mut data[(y, 2 * x)]);
            h_data[(y, x)] = std::mem::take(&mut data[(y, 2 * x + 1)]);
        }
    }
    (l_data, h_data)
}

/// Interleaved analysis, the inverse of [`vh_synthesis`]. Returns the `LL`,
/// `HL`, `LH` and `HH` bands.
pub fn vh_analysis(
    mut data: Array2D<BigInt>,
    filter: &LiftingFilter,
    filter_ho: &LiftingFilter,
) -> [Array2D<BigInt>; 4] {
    scale_up(&mut data, filter_ho.filter_bit_shift);
    for y in 0..data.height() {
        oned_analysis(data.row_mut(y), filter_ho);
    }
    analyze_columns(&mut data, filter);
    let (w, h) = (data.width() / 2, data.height() / 2);
    let mut bands: [Array2D<BigInt>; 4] =
        std::array::from_fn(|_| Array2D::new(w, h, BigInt::zero()));
    for y in 0..h {
        for x in 0..w {
            bands[0][(y, x)] = std::mem::take(&mut data[(2 * y, 2 * x)]);
            bands[1][(y, x)] = std::mem::take(&mut data[(2 * y, 2 * x + 1)]);
            bands[2][(y, x)] = std::mem::take(&mut data[(2 * y + 1, 2 * x)]);
            bands[3][(y, x)] = std::mem::take(&mut data[(2 * y + 1, 2 * x + 1)]);
        }
    }
    bands
}

fn band(
    coeffs: &Coefficients,
    level: u64,
    orientation: Orientation,
) -> Result<&Array2D<BigInt>, TransformError> {
    coeffs
        .get(&(level, orientation))
        .ok_or(TransformError::MissingSubband { level, orientation })
}

/// (15.4.1) Inverse wavelet transform of a complete set of subbands.
pub fn idwt(coeffs: &Coefficients, config: &WaveletConfig) -> Result<Array2D<BigInt>, TransformError> {
    let filter = config.filter()?;
    let filter_ho = config.filter_ho()?;
    let ho = config.dwt_depth_ho;

    let mut dc_band = if ho == 0 {
        band(coeffs, 0, Orientation::LL)?.clone()
    } else {
        band(coeffs, 0, Orientation::L)?.clone()
    };
    for level in 1..=ho {
        dc_band = h_synthesis(&dc_band, band(coeffs, level, Orientation::H)?, filter_ho);
    }
    for level in ho + 1..=ho + config.dwt_depth {
        dc_band = vh_synthesis(
            &dc_band,
            band(coeffs, level, Orientation::HL)?,
            band(coeffs, level, Orientation::LH)?,
            band(coeffs, level, Orientation::HH)?,
            filter,
            filter_ho,
        );
    }
    Ok(dc_band)
}

/// Forward wavelet transform, the inverse of [`idwt`]. The picture's
/// dimensions must be multiples of [`WaveletConfig::alignment`].
pub fn dwt(picture: &Array2D<BigInt>, config: &WaveletConfig) -> Result<Coefficients, TransformError> {
    let filter = config.filter()?;
    let filter_ho = config.filter_ho()?;
    let (align_x, align_y) = config.alignment();
    if picture.width() % align_x != 0 || picture.height() % align_y != 0 {
        return Err(TransformError::BadDimensions {
            width: picture.width(),
            height: picture.height(),
            levels: config.dwt_depth + config.dwt_depth_ho,
        });
    }

    let ho = config.dwt_depth_ho;
    let mut coeffs = Coefficients::new();
    let mut dc_band = picture.clone();
    for level in (ho + 1..=ho + config.dwt_depth).rev() {
        let [ll, hl, lh, hh] = vh_analysis(dc_band, filter, filter_ho);
        coeffs.insert((level, Orientation::HL), hl);
        coeffs.insert((level, Orientation::LH), lh);
        coeffs.insert((level, Orientation::HH), hh);
        dc_band = ll;
    }
    for level in (1..=ho).rev() {
        let (l, h) = h_analysis(dc_band, filter_ho);
        coeffs.insert((level, Orientation::H), h);
        dc_band = l;
    }
    let dc_orientation = if ho == 0 { Orientation::LL } else { Orientation::L };
    coeffs.insert((0, dc_orientation), dc_band);
    Ok(coeffs)
}

/// (15.4.5) Extends a picture to `width` x `height` by repeating its last
/// column and row.
pub fn pad(picture: &Array2D<BigInt>, width: usize, height: usize) -> Array2D<BigInt> {
    let mut padded = Array2D::new(width, height, BigInt::zero());
    if picture.is_empty() {
        return padded;
    }
    for y in 0..height {
        let src_y = y.min(picture.height() - 1);
        for x in 0..width {
            let src_x = x.min(picture.width() - 1);
            padded[(y, x)] = picture[(src_y, src_x)].clone();
        }
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::LIFTING_FILTERS;

    fn ints(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn test_haar_synthesis_1d() {
        let mut a = ints(&[5, 2]);
        oned_synthesis(&mut a, &LIFTING_FILTERS[3]);
        // even -= (odd + 1) >> 1 -> 5 - 1 = 4; odd += even -> 2 + 4 = 6
        assert_eq!(a, ints(&[4, 6]));
        oned_analysis(&mut a, &LIFTING_FILTERS[3]);
        assert_eq!(a, ints(&[5, 2]));
    }

    #[test]
    fn test_oned_round_trip_every_filter() {
        let original = ints(&[10, -3, 7, 200, -128, 127, 0, 1, 55, -60, 3, 9]);
        for filter in LIFTING_FILTERS {
            let mut a = original.clone();
            oned_analysis(&mut a, filter);
            oned_synthesis(&mut a, filter);
            assert_eq!(a, original);
        }
    }

    #[test]
    fn test_pad_repeats_edges() {
        let picture = Array2D::from_rows(vec![ints(&[1, 2]), ints(&[3, 4])]).unwrap();
        let padded = pad(&picture, 4, 3);
        assert_eq!(padded.row(0), ints(&[1, 2, 2, 2]).as_slice());
        assert_eq!(padded.row(2), ints(&[3, 4, 4, 4]).as_slice());
    }

    #[test]
    fn test_dwt_rejects_unaligned_dimensions() {
        let picture = Array2D::new(6, 4, BigInt::zero());
        let config = WaveletConfig::symmetric(1, 2);
        assert!(matches!(
            dwt(&picture, &config),
            Err(TransformError::BadDimensions { .. })
        ));
        assert!(matches!(
            dwt(&picture, &WaveletConfig::symmetric(9, 1)),
            Err(TransformError::BadWaveletIndex(9))
        ));
    }
}
