// src/bitstream/vc2/sequence_header.rs

//! (11) Sequence header syntax.
//!
//! Reading a sequence header fills in `state.video_parameters` starting from
//! the base video format and applying each custom override in stream order,
//! then derives the picture component dimensions.

use super::{int, uint};
use crate::bitstream::description::{Description, Field, Presence, Scope};
use crate::bitstream::value::{Structured, Value};
use crate::decoder::checks::{self, index_at_most};
use crate::decoder::error::{ErrorKind, Violation};
use crate::decoder::state::{State, VideoParameters};
use crate::tables;

type Hook = Result<(), ErrorKind>;

/// (11.1)
pub static SEQUENCE_HEADER: Description = Description {
    name: "sequence_header",
    fields: &[
        Field::byte_align("padding"),
        Field::nested("parse_parameters", &PARSE_PARAMETERS),
        Field::uint("base_video_format")
            .check(check_base_video_format)
            .update(set_base_video_format),
        Field::nested("video_parameters", &SOURCE_PARAMETERS),
        Field::uint("picture_coding_mode")
            .check(check_picture_coding_mode)
            .update(set_picture_coding_mode),
    ],
};

/// (11.2.1)
pub static PARSE_PARAMETERS: Description = Description {
    name: "parse_parameters",
    fields: &[
        Field::uint("major_version").update(set_major_version),
        Field::uint("minor_version").update(set_minor_version),
        Field::uint("profile").check(check_profile).update(set_profile),
        Field::uint("level").check(check_level).update(set_level),
    ],
};

/// (11.4.1)
pub static SOURCE_PARAMETERS: Description = Description {
    name: "source_parameters",
    fields: &[
        Field::nested("frame_size", &FRAME_SIZE),
        Field::nested("color_diff_sampling_format", &COLOR_DIFF_SAMPLING_FORMAT),
        Field::nested("scan_format", &SCAN_FORMAT),
        Field::nested("frame_rate", &FRAME_RATE),
        Field::nested("pixel_aspect_ratio", &PIXEL_ASPECT_RATIO),
        Field::nested("clean_area", &CLEAN_AREA),
        Field::nested("signal_range", &SIGNAL_RANGE),
        Field::nested("color_spec", &COLOR_SPEC),
    ],
};

/// (11.4.3)
pub static FRAME_SIZE: Description = Description {
    name: "frame_size",
    fields: &[
        Field::bool("custom_dimensions_flag"),
        Field::uint("frame_width")
            .when(Presence::IfTrue("custom_dimensions_flag"))
            .update(set_frame_width),
        Field::uint("frame_height")
            .when(Presence::IfTrue("custom_dimensions_flag"))
            .check(check_frame_size)
            .update(set_frame_height),
    ],
};

/// (11.4.4)
pub static COLOR_DIFF_SAMPLING_FORMAT: Description = Description {
    name: "color_diff_sampling_format",
    fields: &[
        Field::bool("custom_color_diff_format_flag"),
        Field::uint("color_diff_format_index")
            .when(Presence::IfTrue("custom_color_diff_format_flag"))
            .check(check_color_diff_format_index)
            .update(set_color_diff_format_index),
    ],
};

/// (11.4.5)
pub static SCAN_FORMAT: Description = Description {
    name: "scan_format",
    fields: &[
        Field::bool("custom_scan_format_flag"),
        Field::uint("source_sampling")
            .when(Presence::IfTrue("custom_scan_format_flag"))
            .check(check_source_sampling)
            .update(set_source_sampling),
    ],
};

/// (11.4.6)
pub static FRAME_RATE: Description = Description {
    name: "frame_rate",
    fields: &[
        Field::bool("custom_frame_rate_flag"),
        Field::uint("index")
            .when(Presence::IfTrue("custom_frame_rate_flag"))
            .check(check_frame_rate_index)
            .update(set_frame_rate_index),
        Field::uint("frame_rate_numer")
            .when(Presence::IfIntEq("index", 0))
            .update(set_frame_rate_numer),
        Field::uint("frame_rate_denom")
            .when(Presence::IfIntEq("index", 0))
            .check(check_frame_rate)
            .update(set_frame_rate_denom),
    ],
};

/// (11.4.7)
pub static PIXEL_ASPECT_RATIO: Description = Description {
    name: "pixel_aspect_ratio",
    fields: &[
        Field::bool("custom_pixel_aspect_ratio_flag"),
        Field::uint("index")
            .when(Presence::IfTrue("custom_pixel_aspect_ratio_flag"))
            .check(check_pixel_aspect_ratio_index)
            .update(set_pixel_aspect_ratio_index),
        Field::uint("pixel_aspect_ratio_numer")
            .when(Presence::IfIntEq("index", 0))
            .update(set_pixel_aspect_ratio_numer),
        Field::uint("pixel_aspect_ratio_denom")
            .when(Presence::IfIntEq("index", 0))
            .check(check_pixel_aspect_ratio)
            .update(set_pixel_aspect_ratio_denom),
    ],
};

/// (11.4.8)
pub static CLEAN_AREA: Description = Description {
    name: "clean_area",
    fields: &[
        Field::bool("custom_clean_area_flag"),
        Field::uint("clean_width")
            .when(Presence::IfTrue("custom_clean_area_flag"))
            .update(set_clean_width),
        Field::uint("clean_height")
            .when(Presence::IfTrue("custom_clean_area_flag"))
            .update(set_clean_height),
        Field::uint("left_offset")
            .when(Presence::IfTrue("custom_clean_area_flag"))
            .update(set_left_offset),
        Field::uint("top_offset")
            .when(Presence::IfTrue("custom_clean_area_flag"))
            .check(check_clean_area)
            .update(set_top_offset),
    ],
};

/// (11.4.9)
pub static SIGNAL_RANGE: Description = Description {
    name: "signal_range",
    fields: &[
        Field::bool("custom_signal_range_flag"),
        Field::uint("index")
            .when(Presence::IfTrue("custom_signal_range_flag"))
            .check(check_signal_range_index)
            .update(set_signal_range_index),
        Field::uint("luma_offset")
            .when(Presence::IfIntEq("index", 0))
            .update(set_luma_offset),
        Field::uint("luma_excursion")
            .when(Presence::IfIntEq("index", 0))
            .check(check_luma_excursion)
            .update(set_luma_excursion),
        Field::uint("color_diff_offset")
            .when(Presence::IfIntEq("index", 0))
            .update(set_color_diff_offset),
        Field::uint("color_diff_excursion")
            .when(Presence::IfIntEq("index", 0))
            .check(check_color_diff_excursion)
            .update(set_color_diff_excursion),
    ],
};

/// (11.4.10.1)
pub static COLOR_SPEC: Description = Description {
    name: "color_spec",
    fields: &[
        Field::bool("custom_color_spec_flag"),
        Field::uint("index")
            .when(Presence::IfTrue("custom_color_spec_flag"))
            .check(check_color_spec_index)
            .update(set_color_spec_index),
        Field::nested("color_primaries", &COLOR_PRIMARIES).when(Presence::IfIntEq("index", 0)),
        Field::nested("color_matrix", &COLOR_MATRIX).when(Presence::IfIntEq("index", 0)),
        Field::nested("transfer_function", &TRANSFER_FUNCTION)
            .when(Presence::IfIntEq("index", 0)),
    ],
};

/// (11.4.10.2)
pub static COLOR_PRIMARIES: Description = Description {
    name: "color_primaries",
    fields: &[
        Field::bool("custom_color_primaries_flag"),
        Field::uint("index")
            .when(Presence::IfTrue("custom_color_primaries_flag"))
            .check(check_color_primaries_index)
            .update(set_color_primaries_index),
    ],
};

/// (11.4.10.3)
pub static COLOR_MATRIX: Description = Description {
    name: "color_matrix",
    fields: &[
        Field::bool("custom_color_matrix_flag"),
        Field::uint("index")
            .when(Presence::IfTrue("custom_color_matrix_flag"))
            .check(check_color_matrix_index)
            .update(set_color_matrix_index),
    ],
};

/// (11.4.10.4)
pub static TRANSFER_FUNCTION: Description = Description {
    name: "transfer_function",
    fields: &[
        Field::bool("custom_transfer_function_flag"),
        Field::uint("index")
            .when(Presence::IfTrue("custom_transfer_function_flag"))
            .check(check_transfer_function_index)
            .update(set_transfer_function_index),
    ],
};

/// Entry `index` of a preset table, if there is one.
fn preset<T: Copy>(table: &[T], index: u64) -> Option<T> {
    usize::try_from(index).ok().and_then(|i| table.get(i).copied())
}

/// Applies `apply` to the video parameters with the field's value.
fn set_video_parameter(
    field: &'static str,
    state: &mut State,
    value: &Value,
    apply: fn(&mut VideoParameters, u64),
) -> Hook {
    let n = uint(field, value)?;
    apply(&mut state.video_parameters, n);
    Ok(())
}

// (11.2) Parse parameters

fn set_major_version(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.major_version = uint("major_version", value)?;
    Ok(())
}

fn set_minor_version(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.minor_version = uint("minor_version", value)?;
    Ok(())
}

fn check_profile(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::profile(state, int("profile", value)?)
}

fn set_profile(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.profile = Some(uint("profile", value)?);
    Ok(())
}

fn check_level(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::level(state, int("level", value)?)
}

fn set_level(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.level = Some(uint("level", value)?);
    Ok(())
}

// (11.3) Base video format

fn check_base_video_format(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    let max = tables::BASE_VIDEO_FORMATS.len() as u64 - 1;
    index_at_most(int("base_video_format", value)?, max, |index| {
        Violation::BadBaseVideoFormat { index }
    })
}

/// Loads the source defaults. An unknown format (only reachable with checks
/// disabled) falls back to the custom format.
fn set_base_video_format(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let index = uint("base_video_format", value)?;
    let format = preset(tables::BASE_VIDEO_FORMATS, index).unwrap_or(tables::BASE_VIDEO_FORMATS[0]);
    state.base_video_format = index;
    state.video_parameters = VideoParameters::from_base_video_format(&format);
    Ok(())
}

// (11.4.3) Frame size

fn set_frame_width(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("frame_width", state, value, |vp, n| vp.frame_width = n)
}

fn check_frame_size(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::frame_size(
        state.video_parameters.frame_width,
        uint("frame_height", value)?,
    )
}

fn set_frame_height(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("frame_height", state, value, |vp, n| vp.frame_height = n)
}

// (11.4.4) and (11.4.5) Sampling

fn check_color_diff_format_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    index_at_most(
        int("color_diff_format_index", value)?,
        tables::color_difference_sampling::MAX,
        |index| Violation::BadColorDifferenceSamplingFormat { index },
    )
}

fn set_color_diff_format_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("color_diff_format_index", state, value, |vp, n| {
        vp.color_diff_format_index = n
    })
}

fn check_source_sampling(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    index_at_most(
        int("source_sampling", value)?,
        tables::SOURCE_SAMPLING_MAX,
        |index| Violation::BadSourceSamplingMode { index },
    )
}

fn set_source_sampling(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("source_sampling", state, value, |vp, n| vp.source_sampling = n)
}

// (11.4.6) Frame rate

fn check_frame_rate_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    let max = tables::PRESET_FRAME_RATES.len() as u64 - 1;
    index_at_most(int("index", value)?, max, |index| {
        Violation::BadPresetFrameRateIndex { index }
    })
}

fn set_frame_rate_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let index = uint("index", value)?;
    if index != 0 {
        if let Some((numer, denom)) = preset(tables::PRESET_FRAME_RATES, index) {
            state.video_parameters.frame_rate_numer = numer;
            state.video_parameters.frame_rate_denom = denom;
        }
    }
    Ok(())
}

fn set_frame_rate_numer(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("frame_rate_numer", state, value, |vp, n| vp.frame_rate_numer = n)
}

fn check_frame_rate(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::frame_rate(
        state.video_parameters.frame_rate_numer,
        uint("frame_rate_denom", value)?,
    )
}

fn set_frame_rate_denom(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("frame_rate_denom", state, value, |vp, n| vp.frame_rate_denom = n)
}

// (11.4.7) Pixel aspect ratio

fn check_pixel_aspect_ratio_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    let max = tables::PRESET_PIXEL_ASPECT_RATIOS.len() as u64 - 1;
    index_at_most(int("index", value)?, max, |index| {
        Violation::BadPresetPixelAspectRatio { index }
    })
}

fn set_pixel_aspect_ratio_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let index = uint("index", value)?;
    if index != 0 {
        if let Some((numer, denom)) = preset(tables::PRESET_PIXEL_ASPECT_RATIOS, index) {
            state.video_parameters.pixel_aspect_ratio_numer = numer;
            state.video_parameters.pixel_aspect_ratio_denom = denom;
        }
    }
    Ok(())
}

fn set_pixel_aspect_ratio_numer(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("pixel_aspect_ratio_numer", state, value, |vp, n| {
        vp.pixel_aspect_ratio_numer = n
    })
}

fn check_pixel_aspect_ratio(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::pixel_aspect_ratio(
        state.video_parameters.pixel_aspect_ratio_numer,
        uint("pixel_aspect_ratio_denom", value)?,
    )
}

fn set_pixel_aspect_ratio_denom(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("pixel_aspect_ratio_denom", state, value, |vp, n| {
        vp.pixel_aspect_ratio_denom = n
    })
}

// (11.4.8) Clean area

fn set_clean_width(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("clean_width", state, value, |vp, n| vp.clean_width = n)
}

fn set_clean_height(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("clean_height", state, value, |vp, n| vp.clean_height = n)
}

fn set_left_offset(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("left_offset", state, value, |vp, n| vp.left_offset = n)
}

fn check_clean_area(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    let mut vp = state.video_parameters.clone();
    vp.top_offset = uint("top_offset", value)?;
    checks::clean_area(&vp)
}

fn set_top_offset(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("top_offset", state, value, |vp, n| vp.top_offset = n)
}

// (11.4.9) Signal range

fn check_signal_range_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    let max = tables::PRESET_SIGNAL_RANGES.len() as u64 - 1;
    index_at_most(int("index", value)?, max, |index| {
        Violation::BadPresetSignalRange { index }
    })
}

fn set_signal_range_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let index = uint("index", value)?;
    if index != 0 {
        if let Some(range) = preset(tables::PRESET_SIGNAL_RANGES, index) {
            state.video_parameters.set_signal_range(&range);
        }
    }
    Ok(())
}

fn set_luma_offset(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("luma_offset", state, value, |vp, n| vp.luma_offset = n)
}

fn check_luma_excursion(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    checks::signal_excursion("luma", uint("luma_excursion", value)?)
}

fn set_luma_excursion(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("luma_excursion", state, value, |vp, n| vp.luma_excursion = n)
}

fn set_color_diff_offset(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("color_diff_offset", state, value, |vp, n| {
        vp.color_diff_offset = n
    })
}

fn check_color_diff_excursion(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    checks::signal_excursion("color difference", uint("color_diff_excursion", value)?)
}

fn set_color_diff_excursion(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("color_diff_excursion", state, value, |vp, n| {
        vp.color_diff_excursion = n
    })
}

// (11.4.10) Color specification

fn check_color_spec_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    let max = tables::PRESET_COLOR_SPECS.len() as u64 - 1;
    index_at_most(int("index", value)?, max, |index| {
        Violation::BadPresetColorSpec { index }
    })
}

/// The preset is applied for the custom index too; its overrides follow.
fn set_color_spec_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let index = uint("index", value)?;
    if let Some((primaries, matrix, transfer)) = preset(tables::PRESET_COLOR_SPECS, index) {
        let vp = &mut state.video_parameters;
        vp.color_primaries_index = primaries;
        vp.color_matrix_index = matrix;
        vp.transfer_function_index = transfer;
    }
    Ok(())
}

fn check_color_primaries_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    index_at_most(int("index", value)?, tables::COLOR_PRIMARIES_MAX, |index| {
        Violation::BadPresetColorPrimaries { index }
    })
}

fn set_color_primaries_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("index", state, value, |vp, n| vp.color_primaries_index = n)
}

fn check_color_matrix_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    index_at_most(int("index", value)?, tables::COLOR_MATRICES_MAX, |index| {
        Violation::BadPresetColorMatrix { index }
    })
}

fn set_color_matrix_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("index", state, value, |vp, n| vp.color_matrix_index = n)
}

fn check_transfer_function_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    index_at_most(
        int("index", value)?,
        tables::TRANSFER_FUNCTIONS_MAX,
        |index| Violation::BadPresetTransferFunction { index },
    )
}

fn set_transfer_function_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    set_video_parameter("index", state, value, |vp, n| vp.transfer_function_index = n)
}

// (11.5) Picture coding mode

fn check_picture_coding_mode(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    let mode = int("picture_coding_mode", value)?;
    index_at_most(mode, tables::picture_coding_mode::FIELDS, |mode| {
        Violation::BadPictureCodingMode { mode }
    })?;
    let mut probe = state.clone();
    probe.picture_coding_mode = uint("picture_coding_mode", value)?;
    probe.set_coding_parameters();
    checks::picture_dimensions(&probe)
}

fn set_picture_coding_mode(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.picture_coding_mode = uint("picture_coding_mode", value)?;
    state.set_coding_parameters();
    state.sequence_header_seen = true;
    Ok(())
}

/// The canonical form of a sequence header that relies on a base video
/// format without any overrides.
pub fn plain(major_version: u64, profile: u64, level: u64, base_video_format: u64) -> Structured {
    let source_parameters = Structured::new()
        .with("frame_size", Structured::new().with("custom_dimensions_flag", false))
        .with(
            "color_diff_sampling_format",
            Structured::new().with("custom_color_diff_format_flag", false),
        )
        .with("scan_format", Structured::new().with("custom_scan_format_flag", false))
        .with("frame_rate", Structured::new().with("custom_frame_rate_flag", false))
        .with(
            "pixel_aspect_ratio",
            Structured::new().with("custom_pixel_aspect_ratio_flag", false),
        )
        .with("clean_area", Structured::new().with("custom_clean_area_flag", false))
        .with("signal_range", Structured::new().with("custom_signal_range_flag", false))
        .with("color_spec", Structured::new().with("custom_color_spec_flag", false));
    Structured::new()
        .with(
            "parse_parameters",
            Structured::new()
                .with("major_version", major_version)
                .with("minor_version", 0u64)
                .with("profile", profile)
                .with("level", level),
        )
        .with("base_video_format", base_video_format)
        .with("video_parameters", source_parameters)
        .with("picture_coding_mode", tables::picture_coding_mode::FRAMES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    use crate::bitstream::serdes::{SerdesOptions, deserialize, serialize};

    #[test]
    fn test_plain_header_applies_base_format() {
        let header = plain(3, 3, 0, 12);
        let (bytes, _) =
            serialize(&SEQUENCE_HEADER, &header, &mut State::new(), SerdesOptions::default())
                .unwrap();
        let mut state = State::new();
        let decoded =
            deserialize(&SEQUENCE_HEADER, &bytes, &mut state, SerdesOptions::default()).unwrap();
        assert_eq!(decoded.get_u64("base_video_format"), Some(12));
        assert!(state.sequence_header_seen);
        assert_eq!(state.major_version, 3);
        assert_eq!(state.profile, Some(3));
        assert_eq!((state.luma_width, state.luma_height), (1920, 1080));
        assert_eq!(state.video_parameters.frame_rate_numer, 25);
        assert_eq!(state.luma_depth, 10);
    }

    #[test]
    fn test_custom_overrides() {
        let mut header = plain(3, 3, 0, 0);
        let mut source = header.get_struct("video_parameters").unwrap().clone();
        source.set(
            "frame_size",
            Structured::new()
                .with("custom_dimensions_flag", true)
                .with("frame_width", 8u64)
                .with("frame_height", 4u64),
        );
        source.set(
            "clean_area",
            Structured::new()
                .with("custom_clean_area_flag", true)
                .with("clean_width", 8u64)
                .with("clean_height", 4u64)
                .with("left_offset", 0u64)
                .with("top_offset", 0u64),
        );
        source.set(
            "frame_rate",
            Structured::new()
                .with("custom_frame_rate_flag", true)
                .with("index", 0u64)
                .with("frame_rate_numer", 1u64)
                .with("frame_rate_denom", 2u64),
        );
        source.set(
            "color_spec",
            Structured::new()
                .with("custom_color_spec_flag", true)
                .with("index", 0u64)
                .with(
                    "color_primaries",
                    Structured::new()
                        .with("custom_color_primaries_flag", true)
                        .with("index", 3u64),
                )
                .with(
                    "color_matrix",
                    Structured::new().with("custom_color_matrix_flag", false),
                )
                .with(
                    "transfer_function",
                    Structured::new().with("custom_transfer_function_flag", false),
                ),
        );
        header.set("video_parameters", source);

        let mut state = State::new();
        serialize(&SEQUENCE_HEADER, &header, &mut state, SerdesOptions::default()).unwrap();
        let vp = &state.video_parameters;
        assert_eq!((vp.frame_width, vp.frame_height), (8, 4));
        assert_eq!((vp.frame_rate_numer, vp.frame_rate_denom), (1, 2));
        assert_eq!(vp.color_primaries_index, 3);
        assert_eq!(vp.color_matrix_index, 0);
        // 4:2:0 from the custom format
        assert_eq!((state.color_diff_width, state.color_diff_height), (4, 2));
    }

    #[test]
    fn test_bad_base_video_format() {
        let header = plain(3, 3, 0, 23);
        let err = serialize(&SEQUENCE_HEADER, &header, &mut State::new(), SerdesOptions::default())
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ConstraintViolation(Violation::BadBaseVideoFormat {
                index: BigInt::from(23)
            })
        );
        assert_eq!(err.routine(), Some("sequence_header"));

        // Without checks the custom format is used instead
        let mut state = State::new();
        serialize(&SEQUENCE_HEADER, &header, &mut state, SerdesOptions::unchecked()).unwrap();
        assert_eq!(state.video_parameters.frame_width, 640);
    }

    #[test]
    fn test_zero_frame_rate_denominator() {
        let mut header = plain(3, 3, 0, 0);
        let mut source = header.get_struct("video_parameters").unwrap().clone();
        source.set(
            "frame_rate",
            Structured::new()
                .with("custom_frame_rate_flag", true)
                .with("index", 0u64)
                .with("frame_rate_numer", 25u64)
                .with("frame_rate_denom", 0u64),
        );
        header.set("video_parameters", source);
        let err = serialize(&SEQUENCE_HEADER, &header, &mut State::new(), SerdesOptions::default())
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ConstraintViolation(Violation::FrameRateHasZeroDenominator {
                frame_rate_numer: 25,
                frame_rate_denom: 0,
            })
        );
        assert_eq!(err.routines.last(), Some(&"frame_rate"));
    }

    #[test]
    fn test_profile_must_not_change() {
        let mut state = State::new();
        state.profile = Some(0);
        let err = serialize(&SEQUENCE_HEADER, &plain(3, 3, 0, 1), &mut state, SerdesOptions::default())
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ConstraintViolation(Violation::ProfileChanged {
                previous: 0,
                current: 3
            })
        );
    }
}
