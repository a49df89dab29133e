// src/tables.rs

//! Constant tables and enumerations from the VC-2 standard.

/// (10.5.1) The four bytes that open every parse info header, "BBCD".
pub const PARSE_INFO_PREFIX: u64 = 0x4242_4344;

/// (10.5.1) Size of a parse info header in bytes.
pub const PARSE_INFO_HEADER_BYTES: u64 = 13;

/// Largest combined transform depth accepted when sizing coefficient arrays.
pub const MAX_TRANSFORM_DEPTH: u64 = 30;

/// Largest padded component, in samples, the decoder will reconstruct.
pub const MAX_PICTURE_SAMPLES: u64 = 1 << 26;

/// (Table 10.1) Parse codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParseCode {
    SequenceHeader = 0x00,
    EndOfSequence = 0x10,
    AuxiliaryData = 0x20,
    PaddingData = 0x30,
    LowDelayPicture = 0xC8,
    HighQualityPicture = 0xE8,
    LowDelayPictureFragment = 0xCC,
    HighQualityPictureFragment = 0xEC,
}

impl ParseCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(ParseCode::SequenceHeader),
            0x10 => Some(ParseCode::EndOfSequence),
            0x20 => Some(ParseCode::AuxiliaryData),
            0x30 => Some(ParseCode::PaddingData),
            0xC8 => Some(ParseCode::LowDelayPicture),
            0xE8 => Some(ParseCode::HighQualityPicture),
            0xCC => Some(ParseCode::LowDelayPictureFragment),
            0xEC => Some(ParseCode::HighQualityPictureFragment),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Key under which a data unit's body is stored in a structured stream.
    pub fn body_name(self) -> Option<&'static str> {
        match self {
            ParseCode::SequenceHeader => Some("sequence_header"),
            ParseCode::EndOfSequence => None,
            ParseCode::AuxiliaryData => Some("auxiliary_data"),
            ParseCode::PaddingData => Some("padding"),
            ParseCode::LowDelayPicture | ParseCode::HighQualityPicture => Some("picture_parse"),
            ParseCode::LowDelayPictureFragment | ParseCode::HighQualityPictureFragment => {
                Some("fragment_parse")
            }
        }
    }
}

/// (10.5.2) Parse code predicates, evaluated on raw parse code values.
pub mod parse_code {
    pub fn is_seq_header(code: u8) -> bool {
        code == 0x00
    }

    pub fn is_end_of_sequence(code: u8) -> bool {
        code == 0x10
    }

    pub fn is_auxiliary_data(code: u8) -> bool {
        (code & 0xF8) == 0x20
    }

    pub fn is_padding_data(code: u8) -> bool {
        code == 0x30
    }

    pub fn is_picture(code: u8) -> bool {
        (code & 0x8C) == 0x88
    }

    pub fn is_ld_picture(code: u8) -> bool {
        (code & 0xFC) == 0xC8
    }

    pub fn is_hq_picture(code: u8) -> bool {
        (code & 0xFC) == 0xE8
    }

    pub fn is_fragment(code: u8) -> bool {
        (code & 0x0C) == 0x0C
    }

    pub fn is_ld_fragment(code: u8) -> bool {
        (code & 0xFC) == 0xCC
    }

    pub fn is_hq_fragment(code: u8) -> bool {
        (code & 0xFC) == 0xEC
    }

    pub fn is_ld(code: u8) -> bool {
        is_ld_picture(code) || is_ld_fragment(code)
    }

    pub fn is_hq(code: u8) -> bool {
        is_hq_picture(code) || is_hq_fragment(code)
    }

    pub fn using_dc_prediction(code: u8) -> bool {
        (code & 0x28) == 0x08
    }
}

/// (C.2) Profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    LowDelay = 0,
    HighQuality = 3,
}

impl Profile {
    pub fn from_u64(n: u64) -> Option<Self> {
        match n {
            0 => Some(Profile::LowDelay),
            3 => Some(Profile::HighQuality),
            _ => None,
        }
    }

    /// Parse codes permitted in a stream of this profile.
    pub fn allows(self, code: u8) -> bool {
        let common = [0x00, 0x10, 0x20, 0x30];
        match self {
            Profile::LowDelay => common.contains(&code) || code == 0xC8 || code == 0xCC,
            Profile::HighQuality => common.contains(&code) || code == 0xE8 || code == 0xEC,
        }
    }
}

/// (C.3) Known level numbers.
pub const LEVELS: &[u64] = &[0, 1, 2, 3, 4, 5, 6, 7, 64, 65, 66];

/// (11.4.4) Color difference sampling formats.
pub mod color_difference_sampling {
    pub const COLOR_4_4_4: u64 = 0;
    pub const COLOR_4_2_2: u64 = 1;
    pub const COLOR_4_2_0: u64 = 2;
    pub const MAX: u64 = 2;
}

/// (11.4.5) Source sampling modes.
pub const SOURCE_SAMPLING_MAX: u64 = 1;

/// (11.5) Picture coding modes.
pub mod picture_coding_mode {
    pub const FRAMES: u64 = 0;
    pub const FIELDS: u64 = 1;
}

/// (Table 11.1) Preset frame rates, indexed by preset number.
pub const PRESET_FRAME_RATES: &[(u64, u64)] = &[
    (0, 0),
    (24000, 1001),
    (24, 1),
    (25, 1),
    (30000, 1001),
    (30, 1),
    (50, 1),
    (60000, 1001),
    (60, 1),
    (15000, 1001),
    (25, 2),
    (48, 1),
    (48000, 1001),
    (96, 1),
    (100, 1),
    (120000, 1001),
    (120, 1),
];

/// (Table 11.4) Preset pixel aspect ratios, indexed by preset number.
pub const PRESET_PIXEL_ASPECT_RATIOS: &[(u64, u64)] = &[
    (0, 0),
    (1, 1),
    (10, 11),
    (12, 11),
    (40, 33),
    (16, 11),
    (4, 3),
];

/// (Table 11.5) Preset signal ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRange {
    pub luma_offset: u64,
    pub luma_excursion: u64,
    pub color_diff_offset: u64,
    pub color_diff_excursion: u64,
}

const fn range(a: u64, b: u64, c: u64, d: u64) -> SignalRange {
    SignalRange {
        luma_offset: a,
        luma_excursion: b,
        color_diff_offset: c,
        color_diff_excursion: d,
    }
}

pub const PRESET_SIGNAL_RANGES: &[SignalRange] = &[
    range(0, 0, 0, 0),
    range(0, 255, 128, 255),
    range(16, 219, 128, 224),
    range(64, 876, 512, 896),
    range(256, 3504, 2048, 3584),
    range(0, 1023, 512, 1023),
    range(0, 4095, 2048, 4095),
    range(4096, 56064, 32768, 57344),
    range(0, 65535, 32768, 65535),
];

/// (Table 11.6) Preset color specs as (primaries, matrix, transfer function).
pub const PRESET_COLOR_SPECS: &[(u64, u64, u64)] = &[
    (0, 0, 0),
    (1, 1, 0),
    (2, 1, 0),
    (0, 0, 0),
    (3, 2, 3),
    (4, 4, 0),
    (4, 4, 4),
    (4, 4, 5),
];

/// (11.4.10.2) Largest preset color primaries index.
pub const COLOR_PRIMARIES_MAX: u64 = 4;
/// (11.4.10.3) Largest preset color matrix index.
pub const COLOR_MATRICES_MAX: u64 = 4;
/// (11.4.10.4) Largest preset transfer function index.
pub const TRANSFER_FUNCTIONS_MAX: u64 = 5;

/// (Table B.1) Base video format parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseVideoFormat {
    pub name: &'static str,
    pub frame_width: u64,
    pub frame_height: u64,
    pub color_diff_format_index: u64,
    pub source_sampling: u64,
    pub top_field_first: bool,
    pub frame_rate_index: u64,
    pub pixel_aspect_ratio_index: u64,
    pub clean_width: u64,
    pub clean_height: u64,
    pub left_offset: u64,
    pub top_offset: u64,
    pub signal_range_index: u64,
    pub color_spec_index: u64,
}

#[allow(clippy::too_many_arguments)]
const fn bvf(
    name: &'static str,
    frame_width: u64,
    frame_height: u64,
    color_diff_format_index: u64,
    source_sampling: u64,
    top_field_first: bool,
    frame_rate_index: u64,
    pixel_aspect_ratio_index: u64,
    clean: (u64, u64, u64, u64),
    signal_range_index: u64,
    color_spec_index: u64,
) -> BaseVideoFormat {
    BaseVideoFormat {
        name,
        frame_width,
        frame_height,
        color_diff_format_index,
        source_sampling,
        top_field_first,
        frame_rate_index,
        pixel_aspect_ratio_index,
        clean_width: clean.0,
        clean_height: clean.1,
        left_offset: clean.2,
        top_offset: clean.3,
        signal_range_index,
        color_spec_index,
    }
}

pub const BASE_VIDEO_FORMATS: &[BaseVideoFormat] = &[
    bvf("custom_format", 640, 480, 2, 0, false, 1, 1, (640, 480, 0, 0), 1, 0),
    bvf("qsif525", 176, 120, 2, 0, false, 9, 2, (176, 120, 0, 0), 1, 1),
    bvf("qcif", 176, 144, 2, 0, true, 10, 2, (176, 144, 0, 0), 1, 2),
    bvf("sif525", 352, 240, 2, 0, false, 9, 2, (352, 240, 0, 0), 1, 1),
    bvf("cif", 352, 288, 2, 0, true, 10, 2, (352, 288, 0, 0), 1, 2),
    bvf("4sif525", 704, 480, 2, 0, false, 9, 2, (704, 480, 0, 0), 1, 1),
    bvf("4cif", 704, 576, 2, 0, true, 10, 2, (704, 576, 0, 0), 1, 2),
    bvf("sd480i_60", 720, 480, 1, 1, false, 4, 2, (704, 480, 8, 0), 3, 1),
    bvf("sd576i_50", 720, 576, 1, 1, true, 3, 2, (704, 576, 8, 0), 3, 2),
    bvf("hd720p_60", 1280, 720, 1, 0, true, 7, 1, (1280, 720, 0, 0), 3, 3),
    bvf("hd720p_50", 1280, 720, 1, 0, true, 6, 1, (1280, 720, 0, 0), 3, 3),
    bvf("hd1080i_60", 1920, 1080, 1, 1, true, 4, 1, (1920, 1080, 0, 0), 3, 3),
    bvf("hd1080i_50", 1920, 1080, 1, 1, true, 3, 1, (1920, 1080, 0, 0), 3, 3),
    bvf("hd1080p_60", 1920, 1080, 1, 0, true, 7, 1, (1920, 1080, 0, 0), 3, 3),
    bvf("hd1080p_50", 1920, 1080, 1, 0, true, 6, 1, (1920, 1080, 0, 0), 3, 3),
    bvf("dc2k", 2048, 1080, 0, 0, true, 2, 1, (2048, 1080, 0, 0), 4, 4),
    bvf("dc4k", 4096, 2160, 0, 0, true, 2, 1, (4096, 2160, 0, 0), 4, 4),
    bvf("uhdtv_4k_60", 3840, 2160, 1, 0, true, 7, 1, (3840, 2160, 0, 0), 3, 5),
    bvf("uhdtv_4k_50", 3840, 2160, 1, 0, true, 6, 1, (3840, 2160, 0, 0), 3, 5),
    bvf("uhdtv_8k_60", 7680, 4320, 1, 0, true, 7, 1, (7680, 4320, 0, 0), 3, 5),
    bvf("uhdtv_8k_50", 7680, 4320, 1, 0, true, 6, 1, (7680, 4320, 0, 0), 3, 5),
    bvf("hd1080p_24", 1920, 1080, 1, 0, true, 1, 1, (1920, 1080, 0, 0), 3, 3),
    bvf("sd_pro486", 720, 486, 1, 1, false, 4, 2, (720, 486, 0, 0), 3, 3),
];

/// (Table 12.1) Wavelet filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveletFilter {
    DeslauriersDubuc9_7 = 0,
    LeGall5_3 = 1,
    DeslauriersDubuc13_7 = 2,
    HaarNoShift = 3,
    HaarWithShift = 4,
    Fidelity = 5,
    Daubechies9_7 = 6,
}

impl WaveletFilter {
    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(WaveletFilter::DeslauriersDubuc9_7),
            1 => Some(WaveletFilter::LeGall5_3),
            2 => Some(WaveletFilter::DeslauriersDubuc13_7),
            3 => Some(WaveletFilter::HaarNoShift),
            4 => Some(WaveletFilter::HaarWithShift),
            5 => Some(WaveletFilter::Fidelity),
            6 => Some(WaveletFilter::Daubechies9_7),
            _ => None,
        }
    }

    pub fn index(self) -> u64 {
        self as u64
    }

    pub fn lifting(self) -> &'static LiftingFilter {
        &LIFTING_FILTERS[self as usize]
    }
}

/// (15.4.4.1) Lifting step kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftType {
    /// Update even samples, adding odd ones
    EvenAddOdd = 1,
    /// Update even samples, subtracting odd ones
    EvenSubtractOdd = 2,
    /// Update odd samples, adding even ones
    OddAddEven = 3,
    /// Update odd samples, subtracting even ones
    OddSubtractEven = 4,
}

impl LiftType {
    /// The step that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            LiftType::EvenAddOdd => LiftType::EvenSubtractOdd,
            LiftType::EvenSubtractOdd => LiftType::EvenAddOdd,
            LiftType::OddAddEven => LiftType::OddSubtractEven,
            LiftType::OddSubtractEven => LiftType::OddAddEven,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiftingStage {
    pub lift_type: LiftType,
    pub s: u32,
    pub l: i64,
    pub d: i64,
    pub taps: &'static [i64],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiftingFilter {
    pub stages: &'static [LiftingStage],
    pub filter_bit_shift: u32,
}

const fn stage(lift_type: LiftType, s: u32, l: i64, d: i64, taps: &'static [i64]) -> LiftingStage {
    LiftingStage {
        lift_type,
        s,
        l,
        d,
        taps,
    }
}

use LiftType::*;

/// (Tables 15.1 to 15.7) Synthesis lifting stages for each wavelet filter.
pub const LIFTING_FILTERS: &[LiftingFilter] = &[
    LiftingFilter {
        stages: &[
            stage(EvenSubtractOdd, 2, 2, 0, &[1, 1]),
            stage(OddAddEven, 4, 4, -1, &[-1, 9, 9, -1]),
        ],
        filter_bit_shift: 1,
    },
    LiftingFilter {
        stages: &[
            stage(EvenSubtractOdd, 2, 2, 0, &[1, 1]),
            stage(OddAddEven, 1, 2, 0, &[1, 1]),
        ],
        filter_bit_shift: 1,
    },
    LiftingFilter {
        stages: &[
            stage(EvenSubtractOdd, 5, 4, -1, &[-1, 9, 9, -1]),
            stage(OddAddEven, 4, 4, -1, &[-1, 9, 9, -1]),
        ],
        filter_bit_shift: 1,
    },
    LiftingFilter {
        stages: &[
            stage(EvenSubtractOdd, 1, 1, 1, &[1]),
            stage(OddAddEven, 0, 1, 0, &[1]),
        ],
        filter_bit_shift: 0,
    },
    LiftingFilter {
        stages: &[
            stage(EvenSubtractOdd, 1, 1, 1, &[1]),
            stage(OddAddEven, 0, 1, 0, &[1]),
        ],
        filter_bit_shift: 1,
    },
    LiftingFilter {
        stages: &[
            stage(OddAddEven, 8, 8, -3, &[-2, -10, -25, 81, 81, -25, 10, -2]),
            stage(EvenSubtractOdd, 8, 8, -3, &[-8, 21, -46, 161, 161, -46, 21, -8]),
        ],
        filter_bit_shift: 0,
    },
    LiftingFilter {
        stages: &[
            stage(EvenSubtractOdd, 12, 2, 0, &[1817, 1817]),
            stage(OddSubtractEven, 12, 2, 0, &[3616, 3616]),
            stage(EvenAddOdd, 12, 2, 0, &[217, 217]),
            stage(OddAddEven, 12, 2, 0, &[6497, 6497]),
        ],
        filter_bit_shift: 1,
    },
];

/// (Annex D) Default quantisation matrices as
/// `(wavelet_index_ho, wavelet_index, dwt_depth_ho, dwt_depth, values)`.
///
/// `values` holds the level 0 entry (LL or L), one H entry per
/// horizontal-only level and then HL, LH, HH for each 2D level.
const DEFAULT_QUANTISATION_MATRICES: &[(u64, u64, u64, u64, &[u64])] = &[
    (0, 0, 0, 0, &[0]),
    (0, 0, 0, 1, &[5, 3, 3, 0]),
    (0, 0, 0, 2, &[5, 3, 3, 0, 4, 4, 1]),
    (0, 0, 0, 3, &[5, 3, 3, 0, 4, 4, 1, 5, 5, 2]),
    (0, 0, 0, 4, &[5, 3, 3, 0, 4, 4, 1, 5, 5, 2, 6, 6, 3]),
    (0, 0, 1, 0, &[3, 0]),
    (0, 0, 1, 1, &[3, 0, 3, 3, 0]),
    (0, 0, 1, 2, &[3, 0, 3, 3, 0, 4, 4, 1]),
    (0, 0, 1, 3, &[3, 0, 3, 3, 0, 4, 4, 1, 5, 5, 2]),
    (0, 0, 1, 4, &[3, 0, 3, 3, 0, 4, 4, 1, 5, 5, 2, 6, 6, 3]),
    (0, 0, 2, 0, &[3, 0, 3]),
    (0, 0, 2, 1, &[3, 0, 3, 5, 5, 3]),
    (0, 0, 2, 2, &[3, 0, 3, 5, 5, 3, 6, 6, 4]),
    (0, 0, 2, 3, &[3, 0, 3, 5, 5, 3, 6, 6, 4, 7, 7, 5]),
    (0, 0, 3, 0, &[3, 0, 3, 5]),
    (0, 0, 3, 1, &[3, 0, 3, 5, 8, 8, 5]),
    (0, 0, 3, 2, &[3, 0, 3, 5, 8, 8, 5, 9, 9, 6]),
    (0, 0, 4, 0, &[3, 0, 3, 5, 8]),
    (0, 0, 4, 1, &[3, 0, 3, 5, 8, 10, 10, 8]),
    (1, 1, 0, 0, &[0]),
    (1, 1, 0, 1, &[4, 2, 2, 0]),
    (1, 1, 0, 2, &[4, 2, 2, 0, 4, 4, 2]),
    (1, 1, 0, 3, &[4, 2, 2, 0, 4, 4, 2, 5, 5, 3]),
    (1, 1, 0, 4, &[4, 2, 2, 0, 4, 4, 2, 5, 5, 3, 7, 7, 5]),
    (1, 1, 1, 0, &[2, 0]),
    (1, 1, 1, 1, &[2, 0, 3, 3, 1]),
    (1, 1, 1, 2, &[2, 0, 3, 3, 1, 4, 4, 2]),
    (1, 1, 1, 3, &[2, 0, 3, 3, 1, 4, 4, 2, 6, 6, 4]),
    (1, 1, 1, 4, &[2, 0, 3, 3, 1, 4, 4, 2, 6, 6, 4, 8, 8, 6]),
    (1, 1, 2, 0, &[2, 0, 3]),
    (1, 1, 2, 1, &[2, 0, 3, 6, 6, 4]),
    (1, 1, 2, 2, &[2, 0, 3, 6, 6, 4, 7, 7, 5]),
    (1, 1, 2, 3, &[2, 0, 3, 6, 6, 4, 7, 7, 5, 9, 9, 7]),
    (1, 1, 3, 0, &[2, 0, 3, 6]),
    (1, 1, 3, 1, &[2, 0, 3, 6, 8, 8, 6]),
    (1, 1, 3, 2, &[2, 0, 3, 6, 8, 8, 6, 10, 10, 8]),
    (1, 1, 4, 0, &[2, 0, 3, 6, 8]),
    (1, 1, 4, 1, &[2, 0, 3, 6, 8, 11, 11, 9]),
    (1, 3, 0, 0, &[0]),
    (1, 3, 0, 1, &[6, 4, 2, 0]),
    (1, 3, 0, 2, &[6, 4, 2, 0, 5, 3, 1]),
    (1, 3, 0, 3, &[6, 4, 2, 0, 5, 3, 1, 6, 4, 2]),
    (1, 3, 0, 4, &[6, 4, 2, 0, 5, 3, 1, 6, 4, 2, 6, 5, 2]),
    (1, 3, 1, 0, &[2, 0]),
    (1, 3, 1, 1, &[3, 1, 4, 2, 0]),
    (1, 3, 1, 2, &[3, 1, 4, 2, 0, 5, 3, 1]),
    (1, 3, 1, 3, &[3, 1, 4, 2, 0, 5, 3, 1, 6, 4, 2]),
    (1, 3, 1, 4, &[3, 1, 4, 2, 0, 5, 3, 1, 6, 4, 2, 6, 5, 2]),
    (1, 3, 2, 0, &[2, 0, 3]),
    (1, 3, 2, 1, &[2, 0, 3, 6, 4, 2]),
    (1, 3, 2, 2, &[2, 0, 3, 6, 4, 2, 6, 5, 2]),
    (1, 3, 2, 3, &[2, 0, 3, 6, 4, 2, 6, 5, 2, 7, 5, 3]),
    (1, 3, 3, 0, &[2, 0, 3, 6]),
    (1, 3, 3, 1, &[2, 0, 3, 6, 8, 7, 4]),
    (1, 3, 3, 2, &[2, 0, 3, 6, 8, 7, 4, 9, 7, 5]),
    (1, 3, 4, 0, &[2, 0, 3, 6, 8]),
    (1, 3, 4, 1, &[2, 0, 3, 6, 8, 11, 9, 7]),
    (2, 2, 0, 0, &[0]),
    (2, 2, 0, 1, &[5, 3, 3, 0]),
    (2, 2, 0, 2, &[5, 3, 3, 0, 4, 4, 1]),
    (2, 2, 0, 3, &[5, 3, 3, 0, 4, 4, 1, 5, 5, 2]),
    (2, 2, 0, 4, &[5, 3, 3, 0, 4, 4, 1, 5, 5, 2, 6, 6, 3]),
    (2, 2, 1, 0, &[3, 0]),
    (2, 2, 1, 1, &[3, 0, 3, 3, 0]),
    (2, 2, 1, 2, &[3, 0, 3, 3, 0, 4, 4, 1]),
    (2, 2, 1, 3, &[3, 0, 3, 3, 0, 4, 4, 1, 5, 5, 2]),
    (2, 2, 1, 4, &[3, 0, 3, 3, 0, 4, 4, 1, 5, 5, 2, 6, 6, 3]),
    (2, 2, 2, 0, &[3, 0, 3]),
    (2, 2, 2, 1, &[3, 0, 3, 5, 5, 2]),
    (2, 2, 2, 2, &[3, 0, 3, 5, 5, 2, 6, 6, 4]),
    (2, 2, 2, 3, &[3, 0, 3, 5, 5, 2, 6, 6, 4, 7, 7, 5]),
    (2, 2, 3, 0, &[3, 0, 3, 5]),
    (2, 2, 3, 1, &[3, 0, 3, 5, 8, 8, 5]),
    (2, 2, 3, 2, &[3, 0, 3, 5, 8, 8, 5, 9, 9, 6]),
    (2, 2, 4, 0, &[3, 0, 3, 5, 8]),
    (2, 2, 4, 1, &[3, 0, 3, 5, 8, 10, 10, 8]),
    (3, 3, 0, 0, &[0]),
    (3, 3, 0, 1, &[8, 4, 4, 0]),
    (3, 3, 0, 2, &[12, 8, 8, 4, 4, 4, 0]),
    (3, 3, 0, 3, &[16, 12, 12, 8, 8, 8, 4, 4, 4, 0]),
    (3, 3, 0, 4, &[20, 16, 16, 12, 12, 12, 8, 8, 8, 4, 4, 4, 0]),
    (3, 3, 1, 0, &[4, 0]),
    (3, 3, 1, 1, &[10, 6, 4, 4, 0]),
    (3, 3, 1, 2, &[14, 10, 8, 8, 4, 4, 4, 0]),
    (3, 3, 1, 3, &[18, 14, 12, 12, 8, 8, 8, 4, 4, 4, 0]),
    (3, 3, 1, 4, &[22, 18, 16, 16, 12, 12, 12, 8, 8, 8, 4, 4, 4, 0]),
    (3, 3, 2, 0, &[6, 2, 0]),
    (3, 3, 2, 1, &[12, 8, 6, 4, 4, 0]),
    (3, 3, 2, 2, &[16, 12, 10, 8, 8, 4, 4, 4, 0]),
    (3, 3, 2, 3, &[20, 16, 14, 12, 12, 8, 8, 8, 4, 4, 4, 0]),
    (3, 3, 3, 0, &[8, 4, 2, 0]),
    (3, 3, 3, 1, &[14, 10, 8, 6, 4, 4, 0]),
    (3, 3, 3, 2, &[18, 14, 12, 10, 8, 8, 4, 4, 4, 0]),
    (3, 3, 4, 0, &[10, 6, 4, 2, 0]),
    (3, 3, 4, 1, &[16, 12, 10, 8, 6, 4, 4, 0]),
    (4, 4, 0, 0, &[0]),
    (4, 4, 0, 1, &[8, 4, 4, 0]),
    (4, 4, 0, 2, &[8, 4, 4, 0, 4, 4, 0]),
    (4, 4, 0, 3, &[8, 4, 4, 0, 4, 4, 0, 4, 4, 0]),
    (4, 4, 0, 4, &[8, 4, 4, 0, 4, 4, 0, 4, 4, 0, 4, 4, 0]),
    (4, 4, 1, 0, &[4, 0]),
    (4, 4, 1, 1, &[6, 2, 4, 4, 0]),
    (4, 4, 1, 2, &[6, 2, 4, 4, 0, 4, 4, 0]),
    (4, 4, 1, 3, &[6, 2, 4, 4, 0, 4, 4, 0, 4, 4, 0]),
    (4, 4, 1, 4, &[6, 2, 4, 4, 0, 4, 4, 0, 4, 4, 0, 4, 4, 0]),
    (4, 4, 2, 0, &[4, 0, 2]),
    (4, 4, 2, 1, &[4, 0, 2, 4, 4, 0]),
    (4, 4, 2, 2, &[4, 0, 2, 4, 4, 0, 4, 4, 0]),
    (4, 4, 2, 3, &[4, 0, 2, 4, 4, 0, 4, 4, 0, 4, 4, 0]),
    (4, 4, 3, 0, &[4, 0, 2, 4]),
    (4, 4, 3, 1, &[4, 0, 2, 4, 6, 6, 2]),
    (4, 4, 3, 2, &[4, 0, 2, 4, 6, 6, 2, 6, 6, 2]),
    (4, 4, 4, 0, &[4, 0, 2, 4, 6]),
    (4, 4, 4, 1, &[4, 0, 2, 4, 6, 8, 8, 4]),
    (5, 5, 0, 0, &[0]),
    (5, 5, 0, 1, &[0, 4, 4, 8]),
    (5, 5, 0, 2, &[0, 4, 4, 8, 8, 8, 12]),
    (5, 5, 0, 3, &[0, 4, 4, 8, 8, 8, 12, 13, 13, 17]),
    (5, 5, 0, 4, &[0, 4, 4, 8, 8, 8, 12, 13, 13, 17, 17, 17, 21]),
    (5, 5, 1, 0, &[0, 4]),
    (5, 5, 1, 1, &[0, 4, 6, 6, 10]),
    (5, 5, 1, 2, &[0, 4, 6, 6, 10, 11, 11, 15]),
    (5, 5, 1, 3, &[0, 4, 6, 6, 10, 11, 11, 15, 15, 15, 19]),
    (5, 5, 1, 4, &[0, 4, 6, 6, 10, 11, 11, 15, 15, 15, 19, 19, 19, 23]),
    (5, 5, 2, 0, &[0, 4, 6]),
    (5, 5, 2, 1, &[0, 4, 6, 8, 8, 12]),
    (5, 5, 2, 2, &[0, 4, 6, 8, 8, 12, 13, 13, 17]),
    (5, 5, 2, 3, &[0, 4, 6, 8, 8, 12, 13, 13, 17, 17, 17, 21]),
    (5, 5, 3, 0, &[0, 4, 6, 8]),
    (5, 5, 3, 1, &[0, 4, 6, 8, 11, 11, 15]),
    (5, 5, 3, 2, &[0, 4, 6, 8, 11, 11, 15, 15, 15, 19]),
    (5, 5, 4, 0, &[0, 4, 6, 8, 11]),
    (6, 6, 0, 0, &[0]),
    (6, 6, 0, 1, &[3, 1, 1, 0]),
    (6, 6, 0, 2, &[3, 1, 1, 0, 4, 4, 2]),
    (6, 6, 0, 3, &[3, 1, 1, 0, 4, 4, 2, 6, 6, 5]),
    (6, 6, 0, 4, &[3, 1, 1, 0, 4, 4, 2, 6, 6, 5, 9, 9, 7]),
    (6, 6, 1, 0, &[1, 0]),
    (6, 6, 1, 1, &[1, 0, 3, 3, 2]),
    (6, 6, 1, 2, &[1, 0, 3, 3, 2, 6, 6, 4]),
    (6, 6, 1, 3, &[1, 0, 3, 3, 2, 6, 6, 4, 8, 8, 7]),
    (6, 6, 1, 4, &[1, 0, 3, 3, 2, 6, 6, 4, 8, 8, 7, 11, 11, 9]),
    (6, 6, 2, 0, &[1, 0, 3]),
    (6, 6, 2, 1, &[1, 0, 3, 6, 6, 5]),
    (6, 6, 2, 2, &[1, 0, 3, 6, 6, 5, 9, 9, 8]),
    (6, 6, 2, 3, &[1, 0, 3, 6, 6, 5, 9, 9, 8, 11, 11, 10]),
    (6, 6, 3, 0, &[1, 0, 3, 6]),
    (6, 6, 3, 1, &[1, 0, 3, 6, 10, 10, 8]),
    (6, 6, 3, 2, &[1, 0, 3, 6, 10, 10, 8, 12, 12, 11]),
    (6, 6, 4, 0, &[1, 0, 3, 6, 10]),
];

/// Looks up the default quantisation matrix for a transform configuration.
pub fn default_quantisation_matrix(
    wavelet_index: u64,
    wavelet_index_ho: u64,
    dwt_depth: u64,
    dwt_depth_ho: u64,
) -> Option<&'static [u64]> {
    DEFAULT_QUANTISATION_MATRICES
        .iter()
        .find(|(who, wi, ho, d, _)| {
            *who == wavelet_index_ho && *wi == wavelet_index && *ho == dwt_depth_ho && *d == dwt_depth
        })
        .map(|(_, _, _, _, values)| *values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_predicates() {
        use parse_code::*;
        assert!(is_picture(0xC8) && is_picture(0xE8));
        assert!(!is_picture(0xCC) && !is_picture(0x00));
        assert!(is_fragment(0xCC) && is_fragment(0xEC));
        assert!(using_dc_prediction(0xC8) && using_dc_prediction(0xCC));
        assert!(!using_dc_prediction(0xE8) && !using_dc_prediction(0xEC));
        assert!(is_ld(0xCC) && is_hq(0xE8));
        assert!(is_auxiliary_data(0x20));
        for code in [0x00u8, 0x10, 0x20, 0x30, 0xC8, 0xE8, 0xCC, 0xEC] {
            assert_eq!(ParseCode::from_u8(code).map(ParseCode::code), Some(code));
        }
        assert_eq!(ParseCode::from_u8(0x11), None);
    }

    #[test]
    fn test_profiles() {
        assert!(Profile::LowDelay.allows(0xC8));
        assert!(!Profile::LowDelay.allows(0xE8));
        assert!(Profile::HighQuality.allows(0xEC));
        assert!(!Profile::HighQuality.allows(0xCC));
        assert_eq!(Profile::from_u64(1), None);
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(BASE_VIDEO_FORMATS.len(), 23);
        assert_eq!(PRESET_FRAME_RATES.len(), 17);
        assert_eq!(PRESET_PIXEL_ASPECT_RATIOS.len(), 7);
        assert_eq!(PRESET_SIGNAL_RANGES.len(), 9);
        assert_eq!(PRESET_COLOR_SPECS.len(), 8);
        assert_eq!(LIFTING_FILTERS.len(), 7);
    }

    #[test]
    fn test_default_quantisation_matrices() {
        assert_eq!(default_quantisation_matrix(4, 4, 1, 0), Some(&[8, 4, 4, 0][..]));
        assert_eq!(default_quantisation_matrix(1, 1, 2, 0), Some(&[4, 2, 2, 0, 4, 4, 2][..]));
        assert_eq!(default_quantisation_matrix(3, 1, 0, 1), Some(&[2, 0][..]));
        assert_eq!(default_quantisation_matrix(5, 5, 1, 4), None);
        // Every entry holds one value per subband
        for (_, _, ho, d, values) in DEFAULT_QUANTISATION_MATRICES {
            assert_eq!(values.len() as u64, 1 + ho + 3 * d);
        }
    }
}
