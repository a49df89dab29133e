// src/decoder/checks.rs

//! Conformance predicates.
//!
//! Each function checks one constraint against decoded values and the decoder
//! state, returning the matching [`Violation`] or [`Structural`] error. The
//! syntax descriptions call these from their check hooks and the stream driver
//! calls the stream-level ones directly, so every constraint is written once.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::decoder::error::{ErrorKind, Structural, Violation};
use crate::decoder::state::{State, VideoParameters};
use crate::slice_sizes;
use crate::tables::{self, ParseCode, Profile, parse_code, picture_coding_mode};

type Check = Result<(), ErrorKind>;

/// Picture numbers are 32-bit and wrap.
const PICTURE_NUMBER_MODULUS: u64 = 1 << 32;

/// Fails with `make(index)` unless `index <= max`.
pub fn index_at_most(index: &BigInt, max: u64, make: fn(BigInt) -> Violation) -> Check {
    if *index > BigInt::from(max) {
        return Err(make(index.clone()).into());
    }
    Ok(())
}

// (10.5.1) Parse info

pub fn parse_info_prefix(prefix: u64) -> Check {
    if prefix != tables::PARSE_INFO_PREFIX {
        return Err(Violation::BadParseInfoPrefix { prefix }.into());
    }
    Ok(())
}

/// Checks a parse code against the sequence so far. `state.units_in_sequence`
/// already counts the unit being parsed.
pub fn parse_code(state: &State, code: u64) -> Check {
    let known = u8::try_from(code).ok().and_then(ParseCode::from_u8);
    let Some(known) = known else {
        return Err(Violation::BadParseCode { parse_code: code }.into());
    };
    let code = known.code();
    if state.units_in_sequence <= 1 && !parse_code::is_seq_header(code) {
        return Err(Structural::SequenceMustStartWithSequenceHeader { parse_code: code }.into());
    }
    if let Some(profile) = state.profile.and_then(Profile::from_u64) {
        if !profile.allows(code) {
            return Err(Violation::ParseCodeNotAllowedInProfile {
                parse_code: code,
                profile: profile as u64,
            }
            .into());
        }
    }
    if parse_code::is_picture(code) && state.fragment_in_progress() {
        return Err(Structural::PictureInterleavedWithFragmentedPicture {
            fragment_slices_remaining: state.fragment_slices_remaining,
        }
        .into());
    }
    Ok(())
}

pub fn next_parse_offset(parse_code: u8, next_parse_offset: u64) -> Check {
    if parse_code::is_end_of_sequence(parse_code) {
        if next_parse_offset != 0 {
            return Err(Violation::NonZeroNextParseOffsetAtEndOfSequence { next_parse_offset }.into());
        }
    } else if !(parse_code::is_picture(parse_code) || parse_code::is_fragment(parse_code))
        && next_parse_offset == 0
    {
        return Err(Violation::MissingNextParseOffset { parse_code }.into());
    }
    if (1..tables::PARSE_INFO_HEADER_BYTES).contains(&next_parse_offset) {
        return Err(Violation::InvalidNextParseOffset { next_parse_offset }.into());
    }
    Ok(())
}

// (11) Sequence header

pub fn profile(state: &State, profile: &BigInt) -> Check {
    let Some(current) = profile.to_u64().filter(|p| Profile::from_u64(*p).is_some()) else {
        return Err(Violation::BadProfile {
            profile: profile.clone(),
        }
        .into());
    };
    match state.profile {
        Some(previous) if previous != current => {
            Err(Violation::ProfileChanged { previous, current }.into())
        }
        _ => Ok(()),
    }
}

pub fn level(state: &State, level: &BigInt) -> Check {
    let Some(current) = level.to_u64().filter(|l| tables::LEVELS.contains(l)) else {
        return Err(Violation::BadLevel {
            level: level.clone(),
        }
        .into());
    };
    match state.level {
        Some(previous) if previous != current => {
            Err(Violation::LevelChanged { previous, current }.into())
        }
        _ => Ok(()),
    }
}

pub fn frame_size(frame_width: u64, frame_height: u64) -> Check {
    if frame_width == 0 || frame_height == 0 {
        return Err(Violation::ZeroPixelFrameSize {
            frame_width,
            frame_height,
        }
        .into());
    }
    Ok(())
}

pub fn frame_rate(frame_rate_numer: u64, frame_rate_denom: u64) -> Check {
    if frame_rate_numer == 0 {
        return Err(Violation::FrameRateHasZeroNumerator {
            frame_rate_numer,
            frame_rate_denom,
        }
        .into());
    }
    if frame_rate_denom == 0 {
        return Err(Violation::FrameRateHasZeroDenominator {
            frame_rate_numer,
            frame_rate_denom,
        }
        .into());
    }
    Ok(())
}

pub fn pixel_aspect_ratio(numer: u64, denom: u64) -> Check {
    if numer == 0 || denom == 0 {
        return Err(Violation::PixelAspectRatioContainsZeros { numer, denom }.into());
    }
    Ok(())
}

pub fn clean_area(vp: &VideoParameters) -> Check {
    let right = vp.clean_width.checked_add(vp.left_offset);
    let bottom = vp.clean_height.checked_add(vp.top_offset);
    let inside = matches!(right, Some(r) if r <= vp.frame_width)
        && matches!(bottom, Some(b) if b <= vp.frame_height);
    if !inside {
        return Err(Violation::CleanAreaOutOfRange {
            clean_width: vp.clean_width,
            clean_height: vp.clean_height,
            left_offset: vp.left_offset,
            top_offset: vp.top_offset,
            frame_width: vp.frame_width,
            frame_height: vp.frame_height,
        }
        .into());
    }
    Ok(())
}

pub fn signal_excursion(component: &'static str, excursion: u64) -> Check {
    if excursion == 0 {
        return Err(Violation::ZeroSignalExcursion { component }.into());
    }
    Ok(())
}

/// (11.6.2) The picture component dimensions must evenly divide the frame.
pub fn picture_dimensions(state: &State) -> Check {
    let vp = &state.video_parameters;
    let divides = |part: u64, whole: u64| part != 0 && whole % part == 0;
    let ok = divides(state.luma_width, vp.frame_width)
        && divides(state.luma_height, vp.frame_height)
        && divides(state.color_diff_width, vp.frame_width)
        && divides(state.color_diff_height, vp.frame_height);
    if !ok {
        return Err(Violation::PictureDimensionsNotMultipleOfFrameDimensions {
            luma_width: state.luma_width,
            luma_height: state.luma_height,
            color_diff_width: state.color_diff_width,
            color_diff_height: state.color_diff_height,
            frame_width: vp.frame_width,
            frame_height: vp.frame_height,
        }
        .into());
    }
    Ok(())
}

// (12) Picture syntax

/// The picture number expected after `last`, wrapping at 2^32.
pub fn next_picture_number(last: Option<u64>) -> u64 {
    last.map_or(0, |n| (n + 1) % PICTURE_NUMBER_MODULUS)
}

/// (12.2) Picture numbers increment by one and the first field of each frame
/// has an even number.
pub fn picture_number(state: &State, picture_number: u64) -> Check {
    if let Some(last_picture_number) = state.last_picture_number {
        if picture_number != next_picture_number(Some(last_picture_number)) {
            return Err(Violation::NonConsecutivePictureNumbers {
                last_picture_number,
                picture_number,
            }
            .into());
        }
    }
    if state.picture_coding_mode == picture_coding_mode::FIELDS
        && state.pictures_in_sequence % 2 == 0
        && picture_number % 2 == 1
    {
        return Err(Violation::EarliestFieldHasOddPictureNumber { picture_number }.into());
    }
    Ok(())
}

pub fn wavelet_index(index: &BigInt) -> Check {
    index_at_most(index, 6, |index| Violation::BadWaveletIndex { index })
}

pub fn wavelet_index_ho(index: &BigInt) -> Check {
    index_at_most(index, 6, |index| Violation::BadHOWaveletIndex { index })
}

/// Bounds the transform depth before any array is sized from it.
pub fn transform_depth(dwt_depth: u64, dwt_depth_ho: u64) -> Check {
    match dwt_depth.checked_add(dwt_depth_ho) {
        Some(total) if total <= tables::MAX_TRANSFORM_DEPTH => Ok(()),
        _ => Err(Violation::TransformDepthTooLarge {
            dwt_depth,
            dwt_depth_ho,
            max: tables::MAX_TRANSFORM_DEPTH,
        }
        .into()),
    }
}

pub fn slice_counts(slices_x: u64, slices_y: u64) -> Check {
    if slices_x == 0 || slices_y == 0 {
        return Err(Violation::ZeroSlicesInCodedPicture { slices_x, slices_y }.into());
    }
    Ok(())
}

pub fn slice_bytes(slice_bytes_numerator: u64, slice_bytes_denominator: u64) -> Check {
    if slice_bytes_denominator == 0 {
        return Err(Violation::SliceBytesHasZeroDenominator {
            slice_bytes_numerator,
        }
        .into());
    }
    if slice_bytes_numerator < slice_bytes_denominator {
        return Err(Violation::SliceBytesIsLessThanOne {
            slice_bytes_numerator,
            slice_bytes_denominator,
        }
        .into());
    }
    Ok(())
}

pub fn slice_size_scaler(slice_size_scaler: u64) -> Check {
    if slice_size_scaler == 0 {
        return Err(Violation::SliceSizeScalerIsZero.into());
    }
    Ok(())
}

/// (12.4.5.3) Without a custom matrix a default one must exist.
pub fn default_quant_matrix(state: &State) -> Check {
    let found = tables::default_quantisation_matrix(
        state.wavelet_index,
        state.wavelet_index_ho,
        state.dwt_depth,
        state.dwt_depth_ho,
    );
    if found.is_none() {
        return Err(Violation::NoQuantisationMatrixAvailable {
            wavelet_index: state.wavelet_index,
            wavelet_index_ho: state.wavelet_index_ho,
            dwt_depth: state.dwt_depth,
            dwt_depth_ho: state.dwt_depth_ho,
        }
        .into());
    }
    Ok(())
}

// (13) Transform data

pub fn slice_y_length(slice_y_length: u64, slice_bits_left: u64) -> Check {
    if slice_y_length > slice_bits_left {
        return Err(Violation::InvalidSliceYLength {
            slice_y_length,
            slice_bits_left,
        }
        .into());
    }
    Ok(())
}

// (14) Fragments

/// Checks a fragment header's slice count. `state.picture_number` holds the
/// number read from the same header.
pub fn fragment_slice_count(state: &State, fragment_slice_count: u64) -> Check {
    if fragment_slice_count == 0 {
        if state.fragment_in_progress() {
            return Err(Structural::FragmentedPictureRestarted {
                fragment_slices_received: state.fragment_slices_received,
                fragment_slices_remaining: state.fragment_slices_remaining,
            }
            .into());
        }
        return picture_number(state, state.picture_number);
    }
    let last_picture_number = state.last_picture_number.unwrap_or(state.picture_number);
    if state.picture_number != last_picture_number {
        return Err(Structural::PictureNumberChangedMidFragmentedPicture {
            last_picture_number,
            picture_number: state.picture_number,
        }
        .into());
    }
    if fragment_slice_count > state.fragment_slices_remaining {
        return Err(Structural::TooManySlicesInFragmentedPicture {
            fragment_slices_remaining: state.fragment_slices_remaining,
            fragment_slice_count,
        }
        .into());
    }
    Ok(())
}

/// Fragments carry the slices of a picture in raster order without gaps.
pub fn fragment_offsets(state: &State, fragment_x_offset: u64, fragment_y_offset: u64) -> Check {
    let (expected_x_offset, expected_y_offset) =
        slice_sizes::slice_position(state, state.fragment_slices_received);
    if (fragment_x_offset, fragment_y_offset) != (expected_x_offset, expected_y_offset) {
        return Err(Structural::FragmentSlicesNotContiguous {
            fragment_x_offset,
            fragment_y_offset,
            expected_x_offset,
            expected_y_offset,
        }
        .into());
    }
    Ok(())
}

// (10.4) Sequences

/// Checks run when an end of sequence data unit is reached.
pub fn end_of_sequence(state: &State) -> Check {
    if state.fragment_in_progress() {
        return Err(Structural::SequenceContainsIncompleteFragmentedPicture {
            fragment_slices_remaining: state.fragment_slices_remaining,
        }
        .into());
    }
    if state.picture_coding_mode == picture_coding_mode::FIELDS && state.pictures_in_sequence % 2 == 1
    {
        return Err(Violation::OddNumberOfFieldsInSequence {
            num_fields: state.pictures_in_sequence,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(check: Check) -> Violation {
        match check {
            Err(ErrorKind::ConstraintViolation(v)) => v,
            other => panic!("expected a violation, got {:?}", other),
        }
    }

    fn structural(check: Check) -> Structural {
        match check {
            Err(ErrorKind::StructuralInconsistency(s)) => s,
            other => panic!("expected a structural error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_code_rules() {
        let mut state = State::new();
        state.units_in_sequence = 1;
        assert_eq!(
            violation(parse_code(&state, 0x11)),
            Violation::BadParseCode { parse_code: 0x11 }
        );
        assert_eq!(
            structural(parse_code(&state, 0xE8)),
            Structural::SequenceMustStartWithSequenceHeader { parse_code: 0xE8 }
        );
        assert!(parse_code(&state, 0x00).is_ok());

        state.units_in_sequence = 2;
        state.profile = Some(3);
        assert_eq!(
            violation(parse_code(&state, 0xC8)),
            Violation::ParseCodeNotAllowedInProfile {
                parse_code: 0xC8,
                profile: 3
            }
        );
        state.fragment_slices_remaining = 2;
        assert_eq!(
            structural(parse_code(&state, 0xE8)),
            Structural::PictureInterleavedWithFragmentedPicture {
                fragment_slices_remaining: 2
            }
        );
        assert!(parse_code(&state, 0xEC).is_ok());
    }

    #[test]
    fn test_next_parse_offset_rules() {
        assert!(next_parse_offset(0x10, 0).is_ok());
        assert!(next_parse_offset(0x10, 13).is_err());
        assert!(next_parse_offset(0x00, 0).is_err());
        assert!(next_parse_offset(0xE8, 0).is_ok());
        assert_eq!(
            violation(next_parse_offset(0xE8, 12)),
            Violation::InvalidNextParseOffset {
                next_parse_offset: 12
            }
        );
        assert!(next_parse_offset(0x20, 13).is_ok());
    }

    #[test]
    fn test_picture_numbers_wrap() {
        let mut state = State::new();
        assert!(picture_number(&state, 1234).is_ok());
        state.last_picture_number = Some(u32::MAX as u64);
        assert!(picture_number(&state, 0).is_ok());
        assert_eq!(
            violation(picture_number(&state, 1)),
            Violation::NonConsecutivePictureNumbers {
                last_picture_number: u32::MAX as u64,
                picture_number: 1
            }
        );
    }

    #[test]
    fn test_fields_start_even() {
        let mut state = State::new();
        state.picture_coding_mode = picture_coding_mode::FIELDS;
        assert!(picture_number(&state, 3).is_err());
        state.last_picture_number = Some(2);
        state.pictures_in_sequence = 1;
        assert!(picture_number(&state, 3).is_ok());
        assert!(end_of_sequence(&state).is_err());
        state.pictures_in_sequence = 2;
        assert!(end_of_sequence(&state).is_ok());
    }

    #[test]
    fn test_profile_and_level() {
        let mut state = State::new();
        assert!(profile(&state, &BigInt::from(3)).is_ok());
        assert!(profile(&state, &BigInt::from(2)).is_err());
        state.profile = Some(0);
        assert_eq!(
            violation(profile(&state, &BigInt::from(3))),
            Violation::ProfileChanged {
                previous: 0,
                current: 3
            }
        );
        assert!(level(&state, &BigInt::from(64)).is_ok());
        assert!(level(&state, &BigInt::from(8)).is_err());
        assert!(level(&state, &(BigInt::from(1) << 100)).is_err());
    }

    #[test]
    fn test_fragment_rules() {
        let mut state = State::new();
        state.slices_x = 3;
        state.slices_y = 2;
        state.picture_number = 5;
        state.last_picture_number = Some(4);
        assert!(fragment_slice_count(&state, 0).is_ok());

        state.last_picture_number = Some(5);
        state.fragment_slices_remaining = 4;
        state.fragment_slices_received = 2;
        assert!(fragment_slice_count(&state, 4).is_ok());
        assert!(matches!(
            structural(fragment_slice_count(&state, 5)),
            Structural::TooManySlicesInFragmentedPicture { .. }
        ));
        assert!(matches!(
            structural(fragment_slice_count(&state, 0)),
            Structural::FragmentedPictureRestarted { .. }
        ));
        state.picture_number = 6;
        assert!(matches!(
            structural(fragment_slice_count(&state, 1)),
            Structural::PictureNumberChangedMidFragmentedPicture { .. }
        ));

        assert!(fragment_offsets(&state, 2, 0).is_ok());
        assert_eq!(
            structural(fragment_offsets(&state, 0, 1)),
            Structural::FragmentSlicesNotContiguous {
                fragment_x_offset: 0,
                fragment_y_offset: 1,
                expected_x_offset: 2,
                expected_y_offset: 0,
            }
        );
        assert!(end_of_sequence(&state).is_err());
    }

    #[test]
    fn test_slice_parameter_rules() {
        assert!(slice_counts(1, 0).is_err());
        assert!(slice_bytes(1, 0).is_err());
        assert!(slice_bytes(1, 2).is_err());
        assert!(slice_bytes(3, 2).is_ok());
        assert!(slice_size_scaler(0).is_err());
        assert!(transform_depth(20, 10).is_ok());
        assert!(transform_depth(20, 11).is_err());
        assert!(transform_depth(u64::MAX, 1).is_err());
        assert!(slice_y_length(10, 9).is_err());
    }

    #[test]
    fn test_clean_area_and_dimensions() {
        let mut state = State::new();
        state.video_parameters =
            VideoParameters::from_base_video_format(&tables::BASE_VIDEO_FORMATS[0]);
        assert!(clean_area(&state.video_parameters).is_ok());
        state.video_parameters.left_offset = 1;
        assert!(clean_area(&state.video_parameters).is_err());

        state.set_coding_parameters();
        assert!(picture_dimensions(&state).is_ok());
        state.video_parameters.frame_width = 641;
        state.set_coding_parameters();
        // 4:2:0 halves 641 to 320 which does not divide 641
        assert!(picture_dimensions(&state).is_err());
    }
}
