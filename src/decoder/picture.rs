// src/decoder/picture.rs

//! (13, 15) Reconstructing a picture from its decoded slices.
//!
//! Slice coefficients are dequantised into their subbands, low-delay DC bands
//! are un-predicted, every component is inverse transformed and the result is
//! cropped, clipped and offset to unsigned samples.

use num_bigint::BigInt;
use num_traits::Zero;
use thiserror::Error;

use crate::bitstream::value::{Structured, Value};
use crate::decoder::state::{Component, State};
use crate::picture::PictureBuffer;
use crate::slice_sizes;
use crate::tables::{self, parse_code};
use crate::transform::quantization::inverse_quant;
use crate::transform::wavelet::idwt;
use crate::transform::{Coefficients, Orientation, TransformError, WaveletConfig, subband_order};
use crate::utils::arrays::Array2D;
use crate::utils::math::{clip, mean, pow2};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PictureError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("slice {slice} has no '{field}'")]
    MissingSliceData { slice: u64, field: &'static str },

    #[error("quantisation matrix has {found} entries but the transform has {subbands} subbands")]
    QuantMatrixMismatch { found: usize, subbands: usize },

    #[error("{found} slices supplied for a picture of {expected}")]
    WrongSliceCount { found: u64, expected: u64 },

    #[error("{width}x{height} component is too large to reconstruct")]
    TooLarge { width: u64, height: u64 },
}

/// The wavelet configuration currently in force.
pub fn wavelet_config(state: &State) -> WaveletConfig {
    WaveletConfig {
        wavelet_index: state.wavelet_index,
        wavelet_index_ho: state.wavelet_index_ho,
        dwt_depth: state.dwt_depth,
        dwt_depth_ho: state.dwt_depth_ho,
    }
}

/// Zeroed subbands for component `c`.
pub fn empty_subbands(state: &State, c: Component) -> Result<Coefficients, PictureError> {
    let (width, height) = slice_sizes::padded_dimensions(state, c);
    let too_large = PictureError::TooLarge { width, height };
    let samples = width.checked_mul(height).ok_or(too_large.clone())?;
    if samples > tables::MAX_PICTURE_SAMPLES || usize::try_from(samples).is_err() {
        return Err(too_large);
    }
    let mut coeffs = Coefficients::new();
    for (level, orientation) in subband_order(state.dwt_depth, state.dwt_depth_ho) {
        let w = slice_sizes::subband_width(state, level, c) as usize;
        let h = slice_sizes::subband_height(state, level, c) as usize;
        coeffs.insert((level, orientation), Array2D::new(w, h, BigInt::zero()));
    }
    Ok(coeffs)
}

fn block_list<'a>(
    slice: &'a Structured,
    block: &str,
    field: &'static str,
    n: u64,
) -> Result<&'a [Value], PictureError> {
    slice
        .get_struct(block)
        .and_then(|b| b.get_list(field))
        .ok_or(PictureError::MissingSliceData { slice: n, field })
}

/// The flattened coefficients of each component carried by one slice.
fn slice_components(
    state: &State,
    slice: &Structured,
    n: u64,
) -> Result<[Vec<BigInt>; 3], PictureError> {
    let ints = |values: &[Value], field: &'static str| -> Result<Vec<BigInt>, PictureError> {
        values
            .iter()
            .map(|v| v.as_int().cloned())
            .collect::<Option<Vec<_>>>()
            .ok_or(PictureError::MissingSliceData { slice: n, field })
    };
    let y = ints(block_list(slice, "y_block", "y_transform", n)?, "y_transform")?;
    if state.is_ld() {
        let c = ints(block_list(slice, "c_block", "c_transform", n)?, "c_transform")?;
        let c1 = c.iter().step_by(2).cloned().collect();
        let c2 = c.iter().skip(1).step_by(2).cloned().collect();
        Ok([y, c1, c2])
    } else {
        let c1 = ints(block_list(slice, "c1_block", "c1_transform", n)?, "c1_transform")?;
        let c2 = ints(block_list(slice, "c2_block", "c2_transform", n)?, "c2_transform")?;
        Ok([y, c1, c2])
    }
}

/// (13.5.5) Dequantises one slice's coefficients into the subbands of
/// component `c`.
fn unpack_slice(
    state: &State,
    coeffs: &mut Coefficients,
    n: u64,
    qindex: u64,
    c: Component,
    values: &[BigInt],
) -> Result<(), PictureError> {
    let (sx, sy) = slice_sizes::slice_position(state, n);
    let mut values = values.iter();
    for (i, region) in slice_sizes::slice_regions(state, sx, sy, c).iter().enumerate() {
        let qi = qindex.saturating_sub(state.quant_matrix[i]);
        let qi = u32::try_from(qi).unwrap_or(u32::MAX);
        let Some(band) = coeffs.get_mut(&(region.level, region.orientation)) else {
            continue;
        };
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                // Coefficients past the end of a block are zero
                if let Some(value) = values.next() {
                    band[(y as usize, x as usize)] = inverse_quant(value, qi);
                }
            }
        }
    }
    Ok(())
}

/// (13.4) Undoes the intra DC prediction of low-delay pictures.
pub fn dc_prediction(band: &mut Array2D<BigInt>) {
    for y in 0..band.height() {
        for x in 0..band.width() {
            let prediction = predict_dc(band, x, y);
            band[(y, x)] += prediction;
        }
    }
}

/// Prediction for `band[(y, x)]` from its already reconstructed neighbours.
pub fn predict_dc(band: &Array2D<BigInt>, x: usize, y: usize) -> BigInt {
    match (x > 0, y > 0) {
        (true, true) => mean(&[
            band[(y, x - 1)].clone(),
            band[(y - 1, x - 1)].clone(),
            band[(y - 1, x)].clone(),
        ]),
        (true, false) => band[(y, x - 1)].clone(),
        (false, true) => band[(y - 1, x)].clone(),
        (false, false) => BigInt::zero(),
    }
}

pub fn dc_orientation(state: &State) -> Orientation {
    if state.dwt_depth_ho == 0 {
        Orientation::LL
    } else {
        Orientation::L
    }
}

/// (15.5) Clips signed samples to the range of `depth` bits and offsets them
/// to unsigned values.
fn clip_and_offset(plane: &mut Array2D<BigInt>, depth: u32) {
    if depth == 0 {
        plane.iter_mut().for_each(|v| *v = BigInt::zero());
        return;
    }
    let offset = pow2(depth - 1);
    let lower = -offset.clone();
    let upper = &offset - 1;
    for v in plane.iter_mut() {
        *v = clip(v, &lower, &upper) + &offset;
    }
}

/// Decodes a complete picture. `slices` holds every slice of the picture in
/// raster order.
pub fn decode_picture(
    state: &State,
    picture_number: u64,
    slices: &[&Structured],
) -> Result<PictureBuffer, PictureError> {
    let expected = state.slices_x.saturating_mul(state.slices_y);
    if slices.len() as u64 != expected {
        return Err(PictureError::WrongSliceCount {
            found: slices.len() as u64,
            expected,
        });
    }
    let subbands = subband_order(state.dwt_depth, state.dwt_depth_ho).len();
    if state.quant_matrix.len() != subbands {
        return Err(PictureError::QuantMatrixMismatch {
            found: state.quant_matrix.len(),
            subbands,
        });
    }

    let mut coeffs = [
        empty_subbands(state, Component::Y)?,
        empty_subbands(state, Component::C1)?,
        empty_subbands(state, Component::C2)?,
    ];
    for (n, slice) in slices.iter().enumerate() {
        let n = n as u64;
        let qindex = slice.get_u64("qindex").ok_or(PictureError::MissingSliceData {
            slice: n,
            field: "qindex",
        })?;
        let components = slice_components(state, slice, n)?;
        for (i, c) in Component::ALL.into_iter().enumerate() {
            unpack_slice(state, &mut coeffs[i], n, qindex, c, &components[i])?;
        }
    }

    if parse_code::using_dc_prediction(state.parse_code) {
        let dc = (0, dc_orientation(state));
        for component in coeffs.iter_mut() {
            if let Some(band) = component.get_mut(&dc) {
                dc_prediction(band);
            }
        }
    }

    let config = wavelet_config(state);
    let mut planes = Vec::with_capacity(3);
    for (i, c) in Component::ALL.into_iter().enumerate() {
        let (width, height) = state.component_dimensions(c);
        let mut plane = idwt(&coeffs[i], &config)?.crop(0, 0, width as usize, height as usize);
        clip_and_offset(&mut plane, state.component_depth(c));
        planes.push(plane);
    }
    let [y, c1, c2]: [Array2D<BigInt>; 3] = planes
        .try_into()
        .map_err(|_| PictureError::MissingSliceData { slice: 0, field: "component" })?;

    Ok(PictureBuffer {
        picture_number,
        y,
        c1,
        c2,
        luma_depth: state.luma_depth,
        color_diff_depth: state.color_diff_depth,
    })
}
