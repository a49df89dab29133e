// src/bitstream/vc2/picture.rs

//! (12) Picture syntax and (14) fragment syntax.

use num_bigint::BigInt;

use super::slices::{HQ_SLICE, LD_SLICE};
use super::{flag, int, uint};
use crate::bitstream::description::{AutoFill, Description, Field, Kind, Presence, Scope, Width};
use crate::bitstream::value::Value;
use crate::decoder::checks;
use crate::decoder::error::ErrorKind;
use crate::decoder::state::State;
use crate::tables;
use crate::transform::subband_order;

type Hook = Result<(), ErrorKind>;

static LD_SLICE_ELEMENT: Kind = Kind::Nested(&LD_SLICE);
static HQ_SLICE_ELEMENT: Kind = Kind::Nested(&HQ_SLICE);

/// (12.1)
pub static PICTURE_PARSE: Description = Description {
    name: "picture_parse",
    fields: &[
        Field::byte_align("padding1"),
        Field::nested("picture_header", &PICTURE_HEADER),
        Field::byte_align("padding2"),
        Field::nested("wavelet_transform", &WAVELET_TRANSFORM),
    ],
};

/// (12.2)
pub static PICTURE_HEADER: Description = Description {
    name: "picture_header",
    fields: &[Field::uint_lit("picture_number", 4)
        .autofill(AutoFill::Default(next_picture_number))
        .check(check_picture_number)
        .update(set_picture_number)],
};

/// (12.3)
pub static WAVELET_TRANSFORM: Description = Description {
    name: "wavelet_transform",
    fields: &[
        Field::nested("transform_parameters", &TRANSFORM_PARAMETERS),
        Field::byte_align("padding"),
        Field::nested("transform_data", &TRANSFORM_DATA),
    ],
};

/// (12.4.1)
pub static TRANSFORM_PARAMETERS: Description = Description {
    name: "transform_parameters",
    fields: &[
        Field::uint("wavelet_index")
            .check(check_wavelet_index)
            .update(set_wavelet_index),
        Field::uint("dwt_depth").update(set_dwt_depth),
        Field::nested("extended_transform_parameters", &EXTENDED_TRANSFORM_PARAMETERS)
            .when(Presence::IfState(has_extended_transform_parameters)),
        Field::nested("slice_parameters", &SLICE_PARAMETERS),
        Field::nested("quant_matrix", &QUANT_MATRIX),
    ],
};

/// (12.4.4)
pub static EXTENDED_TRANSFORM_PARAMETERS: Description = Description {
    name: "extended_transform_parameters",
    fields: &[
        Field::bool("asym_transform_index_flag"),
        Field::uint("wavelet_index_ho")
            .when(Presence::IfTrue("asym_transform_index_flag"))
            .check(check_wavelet_index_ho)
            .update(set_wavelet_index_ho),
        Field::bool("asym_transform_flag"),
        Field::uint("dwt_depth_ho")
            .when(Presence::IfTrue("asym_transform_flag"))
            .update(set_dwt_depth_ho),
    ],
};

/// (12.4.5.2)
pub static SLICE_PARAMETERS: Description = Description {
    name: "slice_parameters",
    fields: &[
        Field::uint("slices_x").update(set_slices_x),
        Field::uint("slices_y")
            .check(check_slice_counts)
            .update(set_slices_y),
        Field::uint("slice_bytes_numerator")
            .when(Presence::IfState(State::is_ld))
            .update(set_slice_bytes_numerator),
        Field::uint("slice_bytes_denominator")
            .when(Presence::IfState(State::is_ld))
            .check(check_slice_bytes)
            .update(set_slice_bytes_denominator),
        Field::uint("slice_prefix_bytes")
            .when(Presence::IfState(State::is_hq))
            .update(set_slice_prefix_bytes),
        Field::uint("slice_size_scaler")
            .when(Presence::IfState(State::is_hq))
            .check(check_slice_size_scaler)
            .update(set_slice_size_scaler),
    ],
};

/// (12.4.5.3)
pub static QUANT_MATRIX: Description = Description {
    name: "quant_matrix",
    fields: &[
        Field::bool("custom_quant_matrix")
            .check(check_custom_quant_matrix)
            .update(set_custom_quant_matrix),
        Field::list("matrix", Width::Computed(quant_matrix_len), &Kind::UInt)
            .when(Presence::IfTrue("custom_quant_matrix"))
            .update(set_quant_matrix),
    ],
};

/// (13.5.2) The slices of a whole picture in raster order.
pub static TRANSFORM_DATA: Description = Description {
    name: "transform_data",
    fields: &[
        Field::list("ld_slices", Width::Computed(picture_slice_count), &LD_SLICE_ELEMENT)
            .when(Presence::IfState(State::is_ld)),
        Field::list("hq_slices", Width::Computed(picture_slice_count), &HQ_SLICE_ELEMENT)
            .when(Presence::IfState(State::is_hq)),
    ],
};

/// (14.1)
pub static FRAGMENT_PARSE: Description = Description {
    name: "fragment_parse",
    fields: &[
        Field::byte_align("padding1"),
        Field::nested("fragment_header", &FRAGMENT_HEADER),
        Field::byte_align("padding2"),
        Field::nested("transform_parameters", &TRANSFORM_PARAMETERS)
            .when(Presence::IfState(starts_picture))
            .update(start_fragmented_picture),
        Field::nested("fragment_data", &FRAGMENT_DATA)
            .when(Presence::IfState(carries_slices)),
    ],
};

/// (14.2)
pub static FRAGMENT_HEADER: Description = Description {
    name: "fragment_header",
    fields: &[
        Field::uint_lit("picture_number", 4)
            .autofill(AutoFill::Default(fragment_picture_number))
            .update(set_fragment_picture_number),
        Field::uint_lit("fragment_data_length", 2).autofill(AutoFill::Stream {
            fill: None,
            verify: false,
        }),
        Field::uint_lit("fragment_slice_count", 2)
            .check(check_fragment_slice_count)
            .update(set_fragment_slice_count),
        Field::uint_lit("fragment_x_offset", 2)
            .when(Presence::IfIntNe("fragment_slice_count", 0)),
        Field::uint_lit("fragment_y_offset", 2)
            .when(Presence::IfIntNe("fragment_slice_count", 0))
            .check(check_fragment_offsets),
    ],
};

/// (14.4)
pub static FRAGMENT_DATA: Description = Description {
    name: "fragment_data",
    fields: &[
        Field::list("ld_slices", Width::Computed(fragment_slice_count), &LD_SLICE_ELEMENT)
            .when(Presence::IfState(State::is_ld))
            .update(receive_fragment_slices),
        Field::list("hq_slices", Width::Computed(fragment_slice_count), &HQ_SLICE_ELEMENT)
            .when(Presence::IfState(State::is_hq))
            .update(receive_fragment_slices),
    ],
};

// (12.2) Picture header

fn next_picture_number(_scope: &Scope<'_>, state: &State) -> Result<BigInt, ErrorKind> {
    Ok(BigInt::from(checks::next_picture_number(state.last_picture_number)))
}

fn check_picture_number(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::picture_number(state, uint("picture_number", value)?)
}

fn set_picture_number(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let n = uint("picture_number", value)?;
    state.picture_number = n;
    state.last_picture_number = Some(n);
    state.pictures_in_sequence += 1;
    state.slice_base = 0;
    Ok(())
}

// (12.4) Transform parameters

fn has_extended_transform_parameters(state: &State) -> bool {
    state.major_version >= 3
}

fn check_wavelet_index(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    checks::wavelet_index(int("wavelet_index", value)?)
}

/// Also the horizontal-only filter until extended parameters say otherwise.
fn set_wavelet_index(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let index = uint("wavelet_index", value)?;
    state.wavelet_index = index;
    state.wavelet_index_ho = index;
    Ok(())
}

/// The depth bound is enforced even with checks disabled; it sizes every
/// coefficient array that follows.
fn set_dwt_depth(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let depth = uint("dwt_depth", value)?;
    checks::transform_depth(depth, 0)?;
    state.dwt_depth = depth;
    state.dwt_depth_ho = 0;
    Ok(())
}

fn check_wavelet_index_ho(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    checks::wavelet_index_ho(int("wavelet_index_ho", value)?)
}

fn set_wavelet_index_ho(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.wavelet_index_ho = uint("wavelet_index_ho", value)?;
    Ok(())
}

fn set_dwt_depth_ho(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let depth = uint("dwt_depth_ho", value)?;
    checks::transform_depth(state.dwt_depth, depth)?;
    state.dwt_depth_ho = depth;
    Ok(())
}

fn set_slices_x(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.slices_x = uint("slices_x", value)?;
    Ok(())
}

fn check_slice_counts(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::slice_counts(state.slices_x, uint("slices_y", value)?)
}

fn set_slices_y(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.slices_y = uint("slices_y", value)?;
    Ok(())
}

fn set_slice_bytes_numerator(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.slice_bytes_numerator = uint("slice_bytes_numerator", value)?;
    Ok(())
}

fn check_slice_bytes(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::slice_bytes(
        state.slice_bytes_numerator,
        uint("slice_bytes_denominator", value)?,
    )
}

fn set_slice_bytes_denominator(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.slice_bytes_denominator = uint("slice_bytes_denominator", value)?;
    Ok(())
}

fn set_slice_prefix_bytes(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.slice_prefix_bytes = uint("slice_prefix_bytes", value)?;
    Ok(())
}

fn check_slice_size_scaler(_scope: &Scope<'_>, _state: &State, value: &Value) -> Hook {
    checks::slice_size_scaler(uint("slice_size_scaler", value)?)
}

fn set_slice_size_scaler(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.slice_size_scaler = uint("slice_size_scaler", value)?;
    Ok(())
}

fn check_custom_quant_matrix(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    if flag("custom_quant_matrix", value)? {
        return Ok(());
    }
    checks::default_quant_matrix(state)
}

/// Without a default matrix (only possible with checks disabled) the matrix
/// is left empty and pictures cannot be dequantised.
fn set_custom_quant_matrix(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    if !flag("custom_quant_matrix", value)? {
        state.quant_matrix = tables::default_quantisation_matrix(
            state.wavelet_index,
            state.wavelet_index_ho,
            state.dwt_depth,
            state.dwt_depth_ho,
        )
        .map(<[u64]>::to_vec)
        .unwrap_or_default();
    }
    Ok(())
}

fn quant_matrix_len(_scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    Ok(subband_order(state.dwt_depth, state.dwt_depth_ho).len() as u64)
}

fn set_quant_matrix(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let values = value.as_list().unwrap_or(&[]);
    state.quant_matrix = values
        .iter()
        .map(|v| uint("matrix", v))
        .collect::<Result<_, _>>()?;
    Ok(())
}

fn picture_slice_count(_scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    state.slice_count()
}

// (14) Fragments

fn starts_picture(state: &State) -> bool {
    state.fragment_slice_count == 0
}

fn carries_slices(state: &State) -> bool {
    state.fragment_slice_count != 0
}

/// Continuing fragments repeat the picture number; a new picture takes the
/// next one.
fn fragment_picture_number(_scope: &Scope<'_>, state: &State) -> Result<BigInt, ErrorKind> {
    let n = match state.last_picture_number {
        Some(last) if state.fragment_in_progress() => last,
        last => checks::next_picture_number(last),
    };
    Ok(BigInt::from(n))
}

fn set_fragment_picture_number(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    state.picture_number = uint("picture_number", value)?;
    Ok(())
}

fn check_fragment_slice_count(_scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::fragment_slice_count(state, uint("fragment_slice_count", value)?)
}

fn set_fragment_slice_count(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Hook {
    let count = uint("fragment_slice_count", value)?;
    state.fragment_slice_count = count;
    if count == 0 {
        state.last_picture_number = Some(state.picture_number);
        state.pictures_in_sequence += 1;
    }
    state.slice_base = state.fragment_slices_received;
    Ok(())
}

fn check_fragment_offsets(scope: &Scope<'_>, state: &State, value: &Value) -> Hook {
    checks::fragment_offsets(
        state,
        scope.require_u64("fragment_x_offset")?,
        uint("fragment_y_offset", value)?,
    )
}

fn start_fragmented_picture(_scope: &Scope<'_>, state: &mut State, _value: &Value) -> Hook {
    state.fragment_slices_remaining = state.slice_count()?;
    state.fragment_slices_received = 0;
    Ok(())
}

fn fragment_slice_count(_scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    Ok(state.fragment_slice_count)
}

fn receive_fragment_slices(_scope: &Scope<'_>, state: &mut State, _value: &Value) -> Hook {
    let count = state.fragment_slice_count;
    state.fragment_slices_received = state.fragment_slices_received.saturating_add(count);
    state.fragment_slices_remaining = state.fragment_slices_remaining.saturating_sub(count);
    Ok(())
}
