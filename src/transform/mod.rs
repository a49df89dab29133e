// src/transform/mod.rs

//! Wavelet transform and quantisation (13.3, 15.4).
//!
//! All arithmetic is done on [`BigInt`](num_bigint::BigInt) values.

pub mod quantization;
pub mod wavelet;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use num_bigint::BigInt;
use thiserror::Error;

use crate::tables::{LiftingFilter, WaveletFilter};
use crate::utils::arrays::Array2D;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("unknown wavelet filter index {0}")]
    BadWaveletIndex(u64),

    #[error("{width}x{height} picture cannot be split into {levels} transform levels")]
    BadDimensions { width: usize, height: usize, levels: u64 },

    #[error("missing {orientation:?} subband at level {level}")]
    MissingSubband { level: u64, orientation: Orientation },
}

/// Subband orientations (13.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Orientation {
    LL,
    L,
    H,
    HL,
    LH,
    HH,
}

/// Transform coefficients keyed by `(level, orientation)`.
pub type Coefficients = BTreeMap<(u64, Orientation), Array2D<BigInt>>;

/// The order in which subbands appear in slices and quantisation matrices:
/// the DC band, one `H` band per horizontal-only level, then `HL`, `LH` and
/// `HH` for each 2D level.
pub fn subband_order(dwt_depth: u64, dwt_depth_ho: u64) -> Vec<(u64, Orientation)> {
    let mut order = Vec::new();
    if dwt_depth_ho == 0 {
        order.push((0, Orientation::LL));
    } else {
        order.push((0, Orientation::L));
        for level in 1..=dwt_depth_ho {
            order.push((level, Orientation::H));
        }
    }
    for level in dwt_depth_ho + 1..=dwt_depth_ho + dwt_depth {
        order.push((level, Orientation::HL));
        order.push((level, Orientation::LH));
        order.push((level, Orientation::HH));
    }
    order
}

/// Filter choice and depths of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveletConfig {
    pub wavelet_index: u64,
    pub wavelet_index_ho: u64,
    pub dwt_depth: u64,
    pub dwt_depth_ho: u64,
}

impl WaveletConfig {
    /// A symmetric transform with the same filter in both directions.
    pub fn symmetric(wavelet_index: u64, dwt_depth: u64) -> Self {
        WaveletConfig {
            wavelet_index,
            wavelet_index_ho: wavelet_index,
            dwt_depth,
            dwt_depth_ho: 0,
        }
    }

    /// Vertical (2D level) filter.
    pub fn filter(&self) -> Result<&'static LiftingFilter, TransformError> {
        WaveletFilter::from_index(self.wavelet_index)
            .map(WaveletFilter::lifting)
            .ok_or(TransformError::BadWaveletIndex(self.wavelet_index))
    }

    /// Horizontal filter, also used for the horizontal half of 2D levels.
    pub fn filter_ho(&self) -> Result<&'static LiftingFilter, TransformError> {
        WaveletFilter::from_index(self.wavelet_index_ho)
            .map(WaveletFilter::lifting)
            .ok_or(TransformError::BadWaveletIndex(self.wavelet_index_ho))
    }

    /// Dimensions must be multiples of these to be transformed.
    pub fn alignment(&self) -> (usize, usize) {
        let h = 1usize << self.dwt_depth;
        (h << self.dwt_depth_ho, h)
    }
}
