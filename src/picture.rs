// src/picture.rs

//! Decoded pictures.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::decoder::state::Component;
use crate::utils::arrays::Array2D;

/// One decoded picture: three component planes of unsigned samples, already
/// clipped and offset to the range given by each component's bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureBuffer {
    pub picture_number: u64,
    pub y: Array2D<BigInt>,
    pub c1: Array2D<BigInt>,
    pub c2: Array2D<BigInt>,
    /// Bit depth of the luma samples
    pub luma_depth: u32,
    /// Bit depth of both color difference components
    pub color_diff_depth: u32,
}

impl PictureBuffer {
    pub fn component(&self, c: Component) -> &Array2D<BigInt> {
        match c {
            Component::Y => &self.y,
            Component::C1 => &self.c1,
            Component::C2 => &self.c2,
        }
    }

    pub fn component_mut(&mut self, c: Component) -> &mut Array2D<BigInt> {
        match c {
            Component::Y => &mut self.y,
            Component::C1 => &mut self.c1,
            Component::C2 => &mut self.c2,
        }
    }

    /// `(width, height)` of a component plane.
    pub fn dimensions(&self, c: Component) -> (usize, usize) {
        let plane = self.component(c);
        (plane.width(), plane.height())
    }

    pub fn depth(&self, c: Component) -> u32 {
        if c.is_luma() {
            self.luma_depth
        } else {
            self.color_diff_depth
        }
    }

    /// Samples of a component in raster order, or `None` if any sample does
    /// not fit in a `u64`.
    pub fn samples_u64(&self, c: Component) -> Option<Vec<u64>> {
        self.component(c).iter().map(|v| v.to_u64()).collect()
    }
}
