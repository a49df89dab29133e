// src/decoder/error.rs

//! Conformance errors.
//!
//! Every failure detected while reading, checking or writing a bitstream is
//! reported as a [`ConformanceError`]. The error is created by the lowest
//! component able to observe the problem and travels up unchanged; outer
//! layers may only attach context (routine stack, decoder state summary).

use std::fmt;

use num_bigint::BigInt;
use thiserror::Error;

/// The taxonomy of conformance failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unexpected end of stream (A.2.2)")]
    EndOfStream,

    #[error("non-zero padding bits {bits} in '{field}' (A.2.4)")]
    NonCanonicalEncoding { field: &'static str, bits: String },

    #[error("{0}")]
    ConstraintViolation(Violation),

    #[error("field '{field}' holds {encoded} but {computed} was expected")]
    AutoFillMismatch {
        field: &'static str,
        computed: BigInt,
        encoded: BigInt,
    },

    #[error("{0}")]
    StructuralInconsistency(Structural),

    #[error("field '{field}' required by '{routine}' does not exist")]
    UnknownField {
        field: &'static str,
        routine: &'static str,
    },

    #[error("field '{field}' cannot be encoded: {reason}")]
    Unencodable { field: &'static str, reason: String },

    #[error("field '{field}' holds {found} where {expected} is required")]
    InvalidValue {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// A violated value constraint. The variant identifies the constraint and its
/// fields carry the offending values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    // (10) Stream syntax
    #[error("invalid parse info prefix 0x{prefix:08X}, expected 0x42424344 (10.5.1)")]
    BadParseInfoPrefix { prefix: u64 },

    #[error("unrecognised parse code 0x{parse_code:02X} (10.5.1)")]
    BadParseCode { parse_code: u64 },

    #[error("non-zero next_parse_offset {next_parse_offset} at the end of the sequence (10.5.1)")]
    NonZeroNextParseOffsetAtEndOfSequence { next_parse_offset: u64 },

    #[error("next_parse_offset of zero in a data unit with parse code 0x{parse_code:02X} (10.5.1)")]
    MissingNextParseOffset { parse_code: u8 },

    #[error("invalid next_parse_offset {next_parse_offset}, offsets 1 to 12 point into the parse info (10.5.1)")]
    InvalidNextParseOffset { next_parse_offset: u64 },

    #[error("parse code 0x{parse_code:02X} is not allowed in profile {profile} (C.2)")]
    ParseCodeNotAllowedInProfile { parse_code: u8, profile: u64 },

    // (11) Sequence header
    #[error("unsupported profile {profile} (C.2)")]
    BadProfile { profile: BigInt },

    #[error("profile changed from {previous} to {current} between sequence headers (C.2)")]
    ProfileChanged { previous: u64, current: u64 },

    #[error("unsupported level {level} (C.3)")]
    BadLevel { level: BigInt },

    #[error("level changed from {previous} to {current} between sequence headers (C.3)")]
    LevelChanged { previous: u64, current: u64 },

    #[error(
        "sequence header at bit offset {offset} differs from the one at bit offset {first_offset} (11.1)"
    )]
    SequenceHeaderChangedMidSequence { first_offset: u64, offset: u64 },

    #[error("invalid base video format index {index} (11.3)")]
    BadBaseVideoFormat { index: BigInt },

    #[error("frame size {frame_width}x{frame_height} contains no pixels (11.4.3)")]
    ZeroPixelFrameSize { frame_width: u64, frame_height: u64 },

    #[error("invalid color difference sampling format index {index} (11.4.4)")]
    BadColorDifferenceSamplingFormat { index: BigInt },

    #[error("invalid source sampling mode {index} (11.4.5)")]
    BadSourceSamplingMode { index: BigInt },

    #[error("invalid preset frame rate index {index} (11.4.6)")]
    BadPresetFrameRateIndex { index: BigInt },

    #[error("frame rate {frame_rate_numer}/{frame_rate_denom} has a zero numerator (11.4.6)")]
    FrameRateHasZeroNumerator {
        frame_rate_numer: u64,
        frame_rate_denom: u64,
    },

    #[error("frame rate {frame_rate_numer}/{frame_rate_denom} has a zero denominator (11.4.6)")]
    FrameRateHasZeroDenominator {
        frame_rate_numer: u64,
        frame_rate_denom: u64,
    },

    #[error("invalid preset pixel aspect ratio index {index} (11.4.7)")]
    BadPresetPixelAspectRatio { index: BigInt },

    #[error("invalid pixel aspect ratio {numer}:{denom} (11.4.7)")]
    PixelAspectRatioContainsZeros { numer: u64, denom: u64 },

    #[error(
        "clean area {clean_width}x{clean_height} at ({left_offset}, {top_offset}) extends beyond the {frame_width}x{frame_height} frame (11.4.8)"
    )]
    CleanAreaOutOfRange {
        clean_width: u64,
        clean_height: u64,
        left_offset: u64,
        top_offset: u64,
        frame_width: u64,
        frame_height: u64,
    },

    #[error("invalid preset signal range index {index} (11.4.9)")]
    BadPresetSignalRange { index: BigInt },

    #[error("signal excursion of zero for {component} (11.4.9)")]
    ZeroSignalExcursion { component: &'static str },

    #[error("invalid preset color spec index {index} (11.4.10.1)")]
    BadPresetColorSpec { index: BigInt },

    #[error("invalid preset color primaries index {index} (11.4.10.2)")]
    BadPresetColorPrimaries { index: BigInt },

    #[error("invalid preset color matrix index {index} (11.4.10.3)")]
    BadPresetColorMatrix { index: BigInt },

    #[error("invalid preset transfer function index {index} (11.4.10.4)")]
    BadPresetTransferFunction { index: BigInt },

    #[error("invalid picture coding mode {mode} (11.5)")]
    BadPictureCodingMode { mode: BigInt },

    #[error(
        "picture dimensions {luma_width}x{luma_height} (color difference {color_diff_width}x{color_diff_height}) do not divide the {frame_width}x{frame_height} frame (11.6.2)"
    )]
    PictureDimensionsNotMultipleOfFrameDimensions {
        luma_width: u64,
        luma_height: u64,
        color_diff_width: u64,
        color_diff_height: u64,
        frame_width: u64,
        frame_height: u64,
    },

    // (12) Picture syntax
    #[error("non-consecutive picture number, got {picture_number} after {last_picture_number} (12.2) and (14.2)")]
    NonConsecutivePictureNumbers {
        last_picture_number: u64,
        picture_number: u64,
    },

    #[error("first field in frame has an odd picture number, {picture_number} (12.2)")]
    EarliestFieldHasOddPictureNumber { picture_number: u64 },

    #[error("sequence contains a non-whole number of frames ({num_fields} fields) (10.4.3)")]
    OddNumberOfFieldsInSequence { num_fields: u64 },

    #[error("invalid wavelet index {index} (12.4.1)")]
    BadWaveletIndex { index: BigInt },

    #[error("invalid horizontal-only wavelet index {index} (12.4.4.1)")]
    BadHOWaveletIndex { index: BigInt },

    #[error("transform depth {dwt_depth} + {dwt_depth_ho} exceeds the supported maximum of {max} levels")]
    TransformDepthTooLarge {
        dwt_depth: u64,
        dwt_depth_ho: u64,
        max: u64,
    },

    #[error("zero slices in picture ({slices_x}x{slices_y}) (12.4.5.2)")]
    ZeroSlicesInCodedPicture { slices_x: u64, slices_y: u64 },

    #[error("slice bytes {slice_bytes_numerator}/0 has a zero denominator (12.4.5.2)")]
    SliceBytesHasZeroDenominator { slice_bytes_numerator: u64 },

    #[error(
        "slice bytes {slice_bytes_numerator}/{slice_bytes_denominator} is less than one byte (12.4.5.2)"
    )]
    SliceBytesIsLessThanOne {
        slice_bytes_numerator: u64,
        slice_bytes_denominator: u64,
    },

    #[error("slice size scaler of zero (12.4.5.2)")]
    SliceSizeScalerIsZero,

    #[error(
        "no default quantisation matrix for wavelet {wavelet_index}/{wavelet_index_ho} at depth {dwt_depth}/{dwt_depth_ho} (12.4.5.3)"
    )]
    NoQuantisationMatrixAvailable {
        wavelet_index: u64,
        wavelet_index_ho: u64,
        dwt_depth: u64,
        dwt_depth_ho: u64,
    },

    // (13) Transform data
    #[error("slice_y_length {slice_y_length} exceeds the {slice_bits_left} bits left in the slice (13.5.3.1)")]
    InvalidSliceYLength {
        slice_y_length: u64,
        slice_bits_left: u64,
    },

    #[error("value {value} of '{field}' is too large to be processed")]
    ValueTooLarge { field: &'static str, value: BigInt },
}

/// Inconsistencies in the sequence of data units.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Structural {
    #[error("sequence begins with parse code 0x{parse_code:02X} instead of a sequence header (10.4.1)")]
    SequenceMustStartWithSequenceHeader { parse_code: u8 },

    #[error("stream ended without an end of sequence data unit (10.4.1)")]
    MissingEndOfSequence,

    #[error(
        "fragmented picture restarted after {fragment_slices_received} slices with {fragment_slices_remaining} still outstanding (14.2)"
    )]
    FragmentedPictureRestarted {
        fragment_slices_received: u64,
        fragment_slices_remaining: u64,
    },

    #[error("picture number changed from {last_picture_number} to {picture_number} within a fragmented picture (14.2)")]
    PictureNumberChangedMidFragmentedPicture {
        last_picture_number: u64,
        picture_number: u64,
    },

    #[error(
        "fragment holds {fragment_slice_count} slices but only {fragment_slices_remaining} remain in the picture (14.2)"
    )]
    TooManySlicesInFragmentedPicture {
        fragment_slices_remaining: u64,
        fragment_slice_count: u64,
    },

    #[error(
        "fragment starts at slice ({fragment_x_offset}, {fragment_y_offset}) but ({expected_x_offset}, {expected_y_offset}) was expected (14.2)"
    )]
    FragmentSlicesNotContiguous {
        fragment_x_offset: u64,
        fragment_y_offset: u64,
        expected_x_offset: u64,
        expected_y_offset: u64,
    },

    #[error("sequence ended with {fragment_slices_remaining} slices of a fragmented picture outstanding (14.2)")]
    SequenceContainsIncompleteFragmentedPicture { fragment_slices_remaining: u64 },

    #[error(
        "picture data unit found while {fragment_slices_remaining} slices of a fragmented picture are outstanding (14.2)"
    )]
    PictureInterleavedWithFragmentedPicture { fragment_slices_remaining: u64 },
}

impl From<Violation> for ErrorKind {
    fn from(violation: Violation) -> Self {
        ErrorKind::ConstraintViolation(violation)
    }
}

impl From<Structural> for ErrorKind {
    fn from(structural: Structural) -> Self {
        ErrorKind::StructuralInconsistency(structural)
    }
}

/// A conformance failure with the context needed to locate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceError {
    pub kind: ErrorKind,
    /// Bit offset into the stream at which the failure was detected.
    pub bit_offset: u64,
    /// Bit length of the offending region starting at `bit_offset`, if known.
    pub region_bits: Option<u64>,
    /// Pseudocode routines active at the failure, outermost first.
    pub routines: Vec<&'static str>,
    /// Summary of the decoder state when the failure occurred.
    pub state: Option<String>,
}

impl ConformanceError {
    pub fn new(kind: ErrorKind, bit_offset: u64) -> Self {
        ConformanceError {
            kind,
            bit_offset,
            region_bits: None,
            routines: Vec::new(),
            state: None,
        }
    }

    pub fn end_of_stream(bit_offset: u64) -> Self {
        Self::new(ErrorKind::EndOfStream, bit_offset)
    }

    pub fn violation(violation: Violation, bit_offset: u64) -> Self {
        Self::new(ErrorKind::ConstraintViolation(violation), bit_offset)
    }

    pub fn structural(structural: Structural, bit_offset: u64) -> Self {
        Self::new(ErrorKind::StructuralInconsistency(structural), bit_offset)
    }

    pub fn with_region(mut self, bits: u64) -> Self {
        self.region_bits = Some(bits);
        self
    }

    /// Records the routine stack unless an inner layer already did.
    pub fn with_routines(mut self, routines: &[&'static str]) -> Self {
        if self.routines.is_empty() {
            self.routines = routines.to_vec();
        }
        self
    }

    /// Attaches a decoder state summary unless one is already present.
    pub fn with_state(mut self, summary: String) -> Self {
        if self.state.is_none() {
            self.state = Some(summary);
        }
        self
    }

    /// Innermost pseudocode routine active at the failure.
    pub fn routine(&self) -> Option<&'static str> {
        self.routines.last().copied()
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.kind, ErrorKind::EndOfStream)
    }

    /// Command line for a bitstream viewer that shows just the offending
    /// region. `cmd` and `file` are substituted verbatim.
    pub fn viewer_hint(&self, cmd: &str, file: &str) -> String {
        match self.region_bits {
            Some(bits) => format!(
                "{} {} --from-offset {} --to-offset {}",
                cmd,
                file,
                self.bit_offset,
                self.bit_offset + bits.saturating_sub(1)
            ),
            None => format!("{} {} --offset {}", cmd, file, self.bit_offset),
        }
    }
}

impl fmt::Display for ConformanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at bit offset {}", self.kind, self.bit_offset)?;
        if let Some(routine) = self.routine() {
            write!(f, " in {}", routine)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConformanceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ConformanceError::violation(
            Violation::NonConsecutivePictureNumbers {
                last_picture_number: 100,
                picture_number: 200,
            },
            161,
        )
        .with_routines(&["parse_sequence", "picture_parse", "picture_header"]);

        assert_eq!(
            err.to_string(),
            "non-consecutive picture number, got 200 after 100 (12.2) and (14.2) at bit offset 161 in picture_header"
        );
        assert_eq!(err.routine(), Some("picture_header"));
    }

    #[test]
    fn test_context_is_attached_once() {
        let err = ConformanceError::end_of_stream(42)
            .with_routines(&["slice"])
            .with_routines(&["parse_sequence"])
            .with_state("a".to_string())
            .with_state("b".to_string());

        assert_eq!(err.routines, vec!["slice"]);
        assert_eq!(err.state.as_deref(), Some("a"));
        assert_eq!(err.bit_offset, 42);
        assert!(err.is_end_of_stream());
    }

    #[test]
    fn test_viewer_hint() {
        let err = ConformanceError::violation(Violation::BadParseInfoPrefix { prefix: 0 }, 800)
            .with_region(144);
        assert_eq!(
            err.viewer_hint("{cmd}", "{file}"),
            "{cmd} {file} --from-offset 800 --to-offset 943"
        );
        let err = ConformanceError::end_of_stream(56);
        assert_eq!(err.viewer_hint("v", "f.vc2"), "v f.vc2 --offset 56");
    }

    #[test]
    fn test_kind_messages() {
        let kind = ErrorKind::AutoFillMismatch {
            field: "next_parse_offset",
            computed: BigInt::from(40),
            encoded: BigInt::from(41),
        };
        assert_eq!(
            kind.to_string(),
            "field 'next_parse_offset' holds 41 but 40 was expected"
        );
        let kind = ErrorKind::ConstraintViolation(Violation::BadParseCode { parse_code: 0xAB });
        assert_eq!(kind.to_string(), "unrecognised parse code 0xAB (10.5.1)");
    }
}
