// src/decoder/state.rs

//! Decoder state threaded through every data unit of a stream.
//!
//! The pseudocode keeps one global dictionary of state. Here the same values
//! are named fields of [`State`], owned by one decoder (or encoder) and passed
//! by reference to every hook the serdes engine runs.

use std::fmt::Write as _;

use crate::decoder::error::{ErrorKind, Violation};
use crate::tables::{self, BaseVideoFormat, parse_code};
use crate::utils::math::intlog2;

/// (11.4) Source parameters after applying the base video format and any
/// overrides from the sequence header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoParameters {
    pub frame_width: u64,
    pub frame_height: u64,
    pub color_diff_format_index: u64,
    pub source_sampling: u64,
    pub top_field_first: bool,
    pub frame_rate_numer: u64,
    pub frame_rate_denom: u64,
    pub pixel_aspect_ratio_numer: u64,
    pub pixel_aspect_ratio_denom: u64,
    pub clean_width: u64,
    pub clean_height: u64,
    pub left_offset: u64,
    pub top_offset: u64,
    pub luma_offset: u64,
    pub luma_excursion: u64,
    pub color_diff_offset: u64,
    pub color_diff_excursion: u64,
    pub color_primaries_index: u64,
    pub color_matrix_index: u64,
    pub transfer_function_index: u64,
}

impl VideoParameters {
    /// (11.4.2) `set_source_defaults`.
    pub fn from_base_video_format(format: &BaseVideoFormat) -> Self {
        let (frame_rate_numer, frame_rate_denom) =
            tables::PRESET_FRAME_RATES[format.frame_rate_index as usize];
        let (pixel_aspect_ratio_numer, pixel_aspect_ratio_denom) =
            tables::PRESET_PIXEL_ASPECT_RATIOS[format.pixel_aspect_ratio_index as usize];
        let range = tables::PRESET_SIGNAL_RANGES[format.signal_range_index as usize];
        let (primaries, matrix, transfer) =
            tables::PRESET_COLOR_SPECS[format.color_spec_index as usize];
        VideoParameters {
            frame_width: format.frame_width,
            frame_height: format.frame_height,
            color_diff_format_index: format.color_diff_format_index,
            source_sampling: format.source_sampling,
            top_field_first: format.top_field_first,
            frame_rate_numer,
            frame_rate_denom,
            pixel_aspect_ratio_numer,
            pixel_aspect_ratio_denom,
            clean_width: format.clean_width,
            clean_height: format.clean_height,
            left_offset: format.left_offset,
            top_offset: format.top_offset,
            luma_offset: range.luma_offset,
            luma_excursion: range.luma_excursion,
            color_diff_offset: range.color_diff_offset,
            color_diff_excursion: range.color_diff_excursion,
            color_primaries_index: primaries,
            color_matrix_index: matrix,
            transfer_function_index: transfer,
        }
    }

    pub fn set_signal_range(&mut self, range: &tables::SignalRange) {
        self.luma_offset = range.luma_offset;
        self.luma_excursion = range.luma_excursion;
        self.color_diff_offset = range.color_diff_offset;
        self.color_diff_excursion = range.color_diff_excursion;
    }
}

/// Picture components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Y,
    C1,
    C2,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Y, Component::C1, Component::C2];

    pub fn is_luma(self) -> bool {
        self == Component::Y
    }
}

#[derive(Debug, Clone, Default)]
pub struct State {
    // (10.5) Parse info
    pub parse_code: u8,
    pub next_parse_offset: u64,
    /// Bit offset of the current data unit's parse info prefix.
    pub unit_start: Option<u64>,
    pub previous_unit_start: Option<u64>,
    pub units_in_sequence: u64,

    // (11) Sequence header
    pub major_version: u64,
    pub minor_version: u64,
    /// Persists across sequences; the first sequence header fixes it.
    pub profile: Option<u64>,
    pub level: Option<u64>,
    pub base_video_format: u64,
    pub video_parameters: VideoParameters,
    pub picture_coding_mode: u64,
    pub luma_width: u64,
    pub luma_height: u64,
    pub color_diff_width: u64,
    pub color_diff_height: u64,
    pub luma_depth: u32,
    pub color_diff_depth: u32,
    pub sequence_header_seen: bool,

    // (12) Picture
    /// Number from the most recent picture or fragment header.
    pub picture_number: u64,
    pub last_picture_number: Option<u64>,
    pub pictures_in_sequence: u64,
    pub wavelet_index: u64,
    pub wavelet_index_ho: u64,
    pub dwt_depth: u64,
    pub dwt_depth_ho: u64,
    pub slices_x: u64,
    pub slices_y: u64,
    pub slice_bytes_numerator: u64,
    pub slice_bytes_denominator: u64,
    pub slice_prefix_bytes: u64,
    pub slice_size_scaler: u64,
    /// Quantisation matrix in subband order, see
    /// [`crate::transform::subband_order`].
    pub quant_matrix: Vec<u64>,

    // (14) Fragments
    pub fragment_slice_count: u64,
    pub fragment_slices_received: u64,
    pub fragment_slices_remaining: u64,
    /// Picture-wide index of the first slice in the slice list being read.
    pub slice_base: u64,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything but the profile and level, ready for a new
    /// sequence.
    pub fn reset_for_sequence(&mut self) {
        let profile = self.profile;
        let level = self.level;
        *self = State {
            profile,
            level,
            ..State::default()
        };
    }

    pub fn is_ld(&self) -> bool {
        parse_code::is_ld(self.parse_code)
    }

    pub fn is_hq(&self) -> bool {
        parse_code::is_hq(self.parse_code)
    }

    pub fn is_fragment(&self) -> bool {
        parse_code::is_fragment(self.parse_code)
    }

    /// True while a fragmented picture still expects slices.
    pub fn fragment_in_progress(&self) -> bool {
        self.fragment_slices_remaining > 0
    }

    /// Slices in one picture.
    pub fn slice_count(&self) -> Result<u64, ErrorKind> {
        self.slices_x.checked_mul(self.slices_y).ok_or_else(|| {
            Violation::ValueTooLarge {
                field: "slices_y",
                value: self.slices_y.into(),
            }
            .into()
        })
    }

    /// (11.6.2) Derives the component dimensions and depths from the video
    /// parameters and picture coding mode.
    pub fn set_coding_parameters(&mut self) {
        let vp = &self.video_parameters;
        self.luma_width = vp.frame_width;
        self.luma_height = vp.frame_height;
        self.color_diff_width = vp.frame_width;
        self.color_diff_height = vp.frame_height;
        match vp.color_diff_format_index {
            tables::color_difference_sampling::COLOR_4_2_2 => {
                self.color_diff_width /= 2;
            }
            tables::color_difference_sampling::COLOR_4_2_0 => {
                self.color_diff_width /= 2;
                self.color_diff_height /= 2;
            }
            _ => {}
        }
        if self.picture_coding_mode == tables::picture_coding_mode::FIELDS {
            self.luma_height /= 2;
            self.color_diff_height /= 2;
        }
        self.luma_depth = intlog2(vp.luma_excursion.saturating_add(1));
        self.color_diff_depth = intlog2(vp.color_diff_excursion.saturating_add(1));
    }

    pub fn component_dimensions(&self, c: Component) -> (u64, u64) {
        if c.is_luma() {
            (self.luma_width, self.luma_height)
        } else {
            (self.color_diff_width, self.color_diff_height)
        }
    }

    pub fn component_depth(&self, c: Component) -> u32 {
        if c.is_luma() {
            self.luma_depth
        } else {
            self.color_diff_depth
        }
    }

    /// Short human-readable summary attached to conformance errors.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = write!(s, "parse_code=0x{:02X}", self.parse_code);
        if let Some(start) = self.unit_start {
            let _ = write!(s, " data_unit_offset={}", start / 8);
        }
        if let Some(profile) = self.profile {
            let _ = write!(s, " profile={}", profile);
        }
        if let Some(level) = self.level {
            let _ = write!(s, " level={}", level);
        }
        if self.sequence_header_seen {
            let _ = write!(
                s,
                " picture={}x{} depth={} coding_mode={}",
                self.luma_width, self.luma_height, self.luma_depth, self.picture_coding_mode
            );
        }
        if let Some(n) = self.last_picture_number {
            let _ = write!(
                s,
                " picture_number={} wavelet={}/{} depth={}/{} slices={}x{}",
                n,
                self.wavelet_index,
                self.wavelet_index_ho,
                self.dwt_depth,
                self.dwt_depth_ho,
                self.slices_x,
                self.slices_y
            );
        }
        if self.fragment_in_progress() {
            let _ = write!(
                s,
                " fragment_slices_received={} fragment_slices_remaining={}",
                self.fragment_slices_received, self.fragment_slices_remaining
            );
        }
        s
    }
}
