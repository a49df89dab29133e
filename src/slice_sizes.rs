// src/slice_sizes.rs

//! Picture, subband and slice geometry (13.2, 13.5.6).
//!
//! Intermediate products are computed in `u128` so that adversarial
//! dimensions never wrap.

use crate::decoder::error::{ErrorKind, Violation};
use crate::decoder::state::{Component, State};
use crate::transform::{Orientation, subband_order};

fn narrow(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// (15.4.5) Component dimensions rounded up to a whole number of transform
/// blocks.
pub fn padded_dimensions(state: &State, c: Component) -> (u64, u64) {
    let (width, height) = state.component_dimensions(c);
    let scale_x = 1u128 << (state.dwt_depth + state.dwt_depth_ho);
    let scale_y = 1u128 << state.dwt_depth;
    (
        narrow((width as u128).div_ceil(scale_x) * scale_x),
        narrow((height as u128).div_ceil(scale_y) * scale_y),
    )
}

/// (13.2.3) Width of the subbands at `level`.
pub fn subband_width(state: &State, level: u64, c: Component) -> u64 {
    let (padded_width, _) = padded_dimensions(state, c);
    let levels = state.dwt_depth + state.dwt_depth_ho;
    if level == 0 {
        padded_width >> levels
    } else {
        padded_width >> (levels - level + 1)
    }
}

/// (13.2.3) Height of the subbands at `level`.
pub fn subband_height(state: &State, level: u64, c: Component) -> u64 {
    let (_, padded_height) = padded_dimensions(state, c);
    if level <= state.dwt_depth_ho {
        padded_height >> state.dwt_depth
    } else {
        padded_height >> (state.dwt_depth_ho + state.dwt_depth - level + 1)
    }
}

fn split(dimension: u64, index: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    narrow(dimension as u128 * index as u128 / count as u128)
}

/// (13.5.6.2) Horizontal extent `[left, right)` of slice column `sx` within a
/// subband at `level`.
pub fn slice_columns(state: &State, sx: u64, level: u64, c: Component) -> (u64, u64) {
    let width = subband_width(state, level, c);
    (
        split(width, sx, state.slices_x),
        split(width, sx + 1, state.slices_x),
    )
}

/// (13.5.6.2) Vertical extent `[top, bottom)` of slice row `sy` within a
/// subband at `level`.
pub fn slice_rows(state: &State, sy: u64, level: u64, c: Component) -> (u64, u64) {
    let height = subband_height(state, level, c);
    (
        split(height, sy, state.slices_y),
        split(height, sy + 1, state.slices_y),
    )
}

/// Slice coordinates `(sx, sy)` of the `n`th slice in raster order.
pub fn slice_position(state: &State, n: u64) -> (u64, u64) {
    if state.slices_x == 0 {
        return (0, 0);
    }
    (n % state.slices_x, n / state.slices_x)
}

/// (13.5.3.2) Bytes in low-delay slice `(sx, sy)`.
pub fn slice_bytes(state: &State, sx: u64, sy: u64) -> u64 {
    let numerator = state.slice_bytes_numerator as u128;
    let denominator = state.slice_bytes_denominator as u128;
    if denominator == 0 {
        return 0;
    }
    let n = sy as u128 * state.slices_x as u128 + sx as u128;
    narrow(((n + 1) * numerator) / denominator - (n * numerator) / denominator)
}

/// One subband's share of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRegion {
    pub level: u64,
    pub orientation: Orientation,
    pub left: u64,
    pub right: u64,
    pub top: u64,
    pub bottom: u64,
}

impl SliceRegion {
    pub fn len(&self) -> u64 {
        (self.right - self.left).saturating_mul(self.bottom - self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The regions of every subband covered by slice `(sx, sy)`, in slice order.
pub fn slice_regions(state: &State, sx: u64, sy: u64, c: Component) -> Vec<SliceRegion> {
    subband_order(state.dwt_depth, state.dwt_depth_ho)
        .into_iter()
        .map(|(level, orientation)| {
            let (left, right) = slice_columns(state, sx, level, c);
            let (top, bottom) = slice_rows(state, sy, level, c);
            SliceRegion {
                level,
                orientation,
                left,
                right,
                top,
                bottom,
            }
        })
        .collect()
}

/// Number of coefficients of component `c` carried by the `n`th slice.
pub fn slice_coefficient_count(state: &State, n: u64, c: Component) -> Result<u64, ErrorKind> {
    let (sx, sy) = slice_position(state, n);
    slice_regions(state, sx, sy, c)
        .iter()
        .try_fold(0u64, |total, region| total.checked_add(region.len()))
        .ok_or_else(|| {
            Violation::ValueTooLarge {
                field: "slice coefficient count",
                value: u64::MAX.into(),
            }
            .into()
        })
}
