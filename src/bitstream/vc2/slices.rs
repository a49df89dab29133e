// src/bitstream/vc2/slices.rs

//! (13.5) Low-delay and high-quality slices.
//!
//! A slice holds the quantised coefficients of every subband region it covers,
//! flattened in subband order. Component data sits in bounded blocks; the
//! block sizes come from the slice length fields (and, for low-delay slices,
//! from the fixed slice size). Unused block bits are kept as padding so that
//! a decoded slice serializes back to the same bits.
//!
//! Slice lengths are auto-filled from the coefficients when absent and are
//! never compared: on read the encoded length is what places the blocks.

use num_bigint::BigInt;

use super::uint;
use crate::bitstream::description::{AutoFill, Description, Field, Kind, Scope, Width};
use crate::bitstream::io::sint_length;
use crate::bitstream::value::Value;
use crate::decoder::checks;
use crate::decoder::error::{ErrorKind, Violation};
use crate::decoder::state::{Component, State};
use crate::slice_sizes;
use crate::utils::math::intlog2;

/// (13.5.3.1)
pub static LD_SLICE: Description = Description {
    name: "ld_slice",
    fields: &[
        Field::nbits("qindex", Width::Fixed(7)),
        Field::nbits("slice_y_length", Width::Computed(ld_length_bits))
            .autofill(AutoFill::Default(ld_slice_y_length))
            .check(check_slice_y_length),
        Field::bounded("y_block", Width::Computed(ld_y_block_bits), &Y_BLOCK),
        Field::bounded("c_block", Width::Computed(ld_c_block_bits), &LD_C_BLOCK),
    ],
};

/// (13.5.4)
pub static HQ_SLICE: Description = Description {
    name: "hq_slice",
    fields: &[
        Field::bytes("prefix_bytes", Width::Computed(prefix_bytes)),
        Field::nbits("qindex", Width::Fixed(8)),
        Field::nbits("slice_y_length", Width::Fixed(8))
            .autofill(AutoFill::Default(hq_slice_y_length)),
        Field::bounded("y_block", Width::Computed(hq_y_block_bits), &Y_BLOCK),
        Field::nbits("slice_c1_length", Width::Fixed(8))
            .autofill(AutoFill::Default(hq_slice_c1_length)),
        Field::bounded("c1_block", Width::Computed(hq_c1_block_bits), &C1_BLOCK),
        Field::nbits("slice_c2_length", Width::Fixed(8))
            .autofill(AutoFill::Default(hq_slice_c2_length)),
        Field::bounded("c2_block", Width::Computed(hq_c2_block_bits), &C2_BLOCK),
    ],
};

pub static Y_BLOCK: Description = Description {
    name: "y_block",
    fields: &[
        Field::list("y_transform", Width::Computed(y_coefficients), &Kind::SInt),
        Field::block_padding("y_block_padding"),
    ],
};

/// Low-delay color difference samples, C1 and C2 interleaved.
pub static LD_C_BLOCK: Description = Description {
    name: "c_block",
    fields: &[
        Field::list("c_transform", Width::Computed(ld_c_coefficients), &Kind::SInt),
        Field::block_padding("c_block_padding"),
    ],
};

pub static C1_BLOCK: Description = Description {
    name: "c1_block",
    fields: &[
        Field::list("c1_transform", Width::Computed(c1_coefficients), &Kind::SInt),
        Field::block_padding("c1_block_padding"),
    ],
};

pub static C2_BLOCK: Description = Description {
    name: "c2_block",
    fields: &[
        Field::list("c2_transform", Width::Computed(c2_coefficients), &Kind::SInt),
        Field::block_padding("c2_block_padding"),
    ],
};

/// Picture-wide index of the slice being traversed.
pub fn slice_number(scope: &Scope<'_>, state: &State) -> u64 {
    state.slice_base + scope.list_index().unwrap_or(0) as u64
}

fn too_large(field: &'static str) -> ErrorKind {
    Violation::ValueTooLarge {
        field,
        value: BigInt::from(u64::MAX),
    }
    .into()
}

/// Bits taken by the coefficients and padding of a block in the value being
/// written.
fn coded_bits(scope: &Scope<'_>, block: &str, coefficients: &str, padding: &str) -> u64 {
    let Some(block) = scope.input_value(block).and_then(Value::as_struct) else {
        return 0;
    };
    let coefficient_bits: u64 = block
        .get_list(coefficients)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_int)
        .map(sint_length)
        .sum();
    let padding_bits = block
        .get(padding)
        .and_then(Value::as_bits)
        .map_or(0, |bits| bits.len() as u64);
    coefficient_bits + padding_bits
}

// (13.5.3) Low-delay slices

/// `(length_bits, slice_bits_left)` of the slice being traversed.
fn ld_slice_layout(scope: &Scope<'_>, state: &State) -> (u64, u64) {
    let (sx, sy) = slice_sizes::slice_position(state, slice_number(scope, state));
    let total = slice_sizes::slice_bytes(state, sx, sy)
        .saturating_mul(8)
        .saturating_sub(7);
    let length_bits = intlog2(total) as u64;
    (length_bits, total.saturating_sub(length_bits))
}

fn ld_length_bits(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    Ok(ld_slice_layout(scope, state).0)
}

fn ld_slice_y_length(scope: &Scope<'_>, _state: &State) -> Result<BigInt, ErrorKind> {
    Ok(BigInt::from(coded_bits(
        scope,
        "y_block",
        "y_transform",
        "y_block_padding",
    )))
}

fn check_slice_y_length(scope: &Scope<'_>, state: &State, value: &Value) -> Result<(), ErrorKind> {
    let (_, bits_left) = ld_slice_layout(scope, state);
    checks::slice_y_length(uint("slice_y_length", value)?, bits_left)
}

fn ld_y_block_bits(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    let (_, bits_left) = ld_slice_layout(scope, state);
    Ok(scope.require_u64("slice_y_length")?.min(bits_left))
}

fn ld_c_block_bits(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    let (_, bits_left) = ld_slice_layout(scope, state);
    Ok(bits_left - scope.require_u64("slice_y_length")?.min(bits_left))
}

// (13.5.4) High-quality slices

fn prefix_bytes(_scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    Ok(state.slice_prefix_bytes)
}

/// Bytes per unit of an HQ slice length field.
fn length_unit_bits(state: &State) -> Result<u64, ErrorKind> {
    if state.slice_size_scaler == 0 {
        return Err(Violation::SliceSizeScalerIsZero.into());
    }
    state
        .slice_size_scaler
        .checked_mul(8)
        .ok_or_else(|| too_large("slice_size_scaler"))
}

fn hq_length(
    scope: &Scope<'_>,
    state: &State,
    block: &str,
    coefficients: &str,
    padding: &str,
) -> Result<BigInt, ErrorKind> {
    let unit = length_unit_bits(state)?;
    let bits = coded_bits(scope, block, coefficients, padding);
    Ok(BigInt::from(bits.div_ceil(unit)))
}

fn hq_slice_y_length(scope: &Scope<'_>, state: &State) -> Result<BigInt, ErrorKind> {
    hq_length(scope, state, "y_block", "y_transform", "y_block_padding")
}

fn hq_slice_c1_length(scope: &Scope<'_>, state: &State) -> Result<BigInt, ErrorKind> {
    hq_length(scope, state, "c1_block", "c1_transform", "c1_block_padding")
}

fn hq_slice_c2_length(scope: &Scope<'_>, state: &State) -> Result<BigInt, ErrorKind> {
    hq_length(scope, state, "c2_block", "c2_transform", "c2_block_padding")
}

fn hq_block_bits(scope: &Scope<'_>, state: &State, length: &'static str) -> Result<u64, ErrorKind> {
    length_unit_bits(state)?
        .checked_mul(scope.require_u64(length)?)
        .ok_or_else(|| too_large(length))
}

fn hq_y_block_bits(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    hq_block_bits(scope, state, "slice_y_length")
}

fn hq_c1_block_bits(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    hq_block_bits(scope, state, "slice_c1_length")
}

fn hq_c2_block_bits(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    hq_block_bits(scope, state, "slice_c2_length")
}

// Coefficient counts

fn coefficients(scope: &Scope<'_>, state: &State, c: Component) -> Result<u64, ErrorKind> {
    slice_sizes::slice_coefficient_count(state, slice_number(scope, state), c)
}

fn y_coefficients(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    coefficients(scope, state, Component::Y)
}

fn ld_c_coefficients(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    coefficients(scope, state, Component::C1)?
        .checked_mul(2)
        .ok_or_else(|| too_large("c_transform"))
}

fn c1_coefficients(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    coefficients(scope, state, Component::C1)
}

fn c2_coefficients(scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    coefficients(scope, state, Component::C2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::serdes::{SerdesOptions, deserialize, serialize};
    use crate::bitstream::value::Structured;

    /// 4x2 luma, 2x2 chroma, no transform, one slice.
    fn state(parse_code: u8) -> State {
        let mut state = State::new();
        state.parse_code = parse_code;
        state.luma_width = 4;
        state.luma_height = 2;
        state.color_diff_width = 2;
        state.color_diff_height = 2;
        state.slices_x = 1;
        state.slices_y = 1;
        state.slice_bytes_numerator = 8;
        state.slice_bytes_denominator = 1;
        state.slice_size_scaler = 1;
        state
    }

    fn coefficients(values: &[i64]) -> Value {
        Value::from(values.iter().map(|&v| Value::from(v)).collect::<Vec<_>>())
    }

    #[test]
    fn test_ld_slice_layout() {
        let slice = Structured::new()
            .with("qindex", 0u64)
            .with(
                "y_block",
                Structured::new().with("y_transform", coefficients(&[1, -1, 0, 0, 2, 0, 0, 0])),
            )
            .with(
                "c_block",
                Structured::new().with("c_transform", coefficients(&[0, 0, 0, 0, 0, 0, 0, 0])),
            );
        let mut write_state = state(0xC8);
        let (bytes, filled) =
            serialize(&LD_SLICE, &slice, &mut write_state, SerdesOptions::default()).unwrap();
        assert_eq!(bytes.len(), 8);
        // 1 and -1 take 4 bits, 2 takes 4 bits, zeros one bit each
        assert_eq!(filled.get_u64("slice_y_length"), Some(4 + 4 + 4 + 5));

        let decoded =
            deserialize(&LD_SLICE, &bytes, &mut state(0xC8), SerdesOptions::default()).unwrap();
        let y = decoded.get_struct("y_block").unwrap();
        assert_eq!(y.get("y_transform"), slice.get_struct("y_block").unwrap().get("y_transform"));
        // 51 bits left after the length, 17 luma bits and 8 color difference bits
        let c = decoded.get_struct("c_block").unwrap();
        assert_eq!(c.get("c_block_padding").and_then(Value::as_bits).map(|b| b.len()), Some(26));
        assert_eq!(decoded, filled);
    }

    /// A slice of a huge picture reads no more coefficients than its bits
    /// hold.
    #[test]
    fn test_ld_slice_of_huge_picture_stops_at_block_end() {
        let huge = || {
            let mut s = state(0xC8);
            s.luma_width = 1 << 20;
            s.luma_height = 1 << 20;
            s.color_diff_width = 1 << 19;
            s.color_diff_height = 1 << 19;
            s
        };
        let slice = Structured::new()
            .with("qindex", 0u64)
            .with("y_block", Structured::new().with("y_transform", coefficients(&[1, 0])))
            .with("c_block", Structured::new().with("c_transform", coefficients(&[0; 46])));
        let (bytes, filled) =
            serialize(&LD_SLICE, &slice, &mut huge(), SerdesOptions::default()).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(filled.get_u64("slice_y_length"), Some(5));

        let decoded =
            deserialize(&LD_SLICE, &bytes, &mut huge(), SerdesOptions::default()).unwrap();
        assert_eq!(decoded, filled);
        let c = decoded.get_struct("c_block").and_then(|b| b.get_list("c_transform"));
        assert_eq!(c.map(<[Value]>::len), Some(46));

        // A block left partly unfilled cannot stand for the missing zeros
        let short = slice.with(
            "c_block",
            Structured::new().with("c_transform", coefficients(&[0; 3])),
        );
        let err =
            serialize(&LD_SLICE, &short, &mut huge(), SerdesOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Unencodable { field: "c_transform", .. }));
    }

    #[test]
    fn test_ld_slice_y_length_out_of_range() {
        let mut s = state(0xC8);
        let slice = Structured::new()
            .with("qindex", 0u64)
            .with("slice_y_length", 60u64)
            .with("y_block", Structured::new().with("y_transform", coefficients(&[0; 8])))
            .with("c_block", Structured::new().with("c_transform", coefficients(&[0; 8])));
        let err = serialize(&LD_SLICE, &slice, &mut s, SerdesOptions::default()).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ConstraintViolation(Violation::InvalidSliceYLength {
                slice_y_length: 60,
                slice_bits_left: 51,
            })
        );
    }

    #[test]
    fn test_hq_slice_round_trip() {
        let mut s = state(0xE8);
        s.slice_prefix_bytes = 1;
        let slice = Structured::new()
            .with("prefix_bytes", vec![0xAAu8])
            .with("qindex", 3u64)
            .with(
                "y_block",
                Structured::new().with("y_transform", coefficients(&[5, 0, 0, 0, 0, 0, 0, -7])),
            )
            .with("c1_block", Structured::new().with("c1_transform", coefficients(&[0; 4])))
            .with("c2_block", Structured::new().with("c2_transform", coefficients(&[1, 1, 1, 1])));
        let (bytes, filled) =
            serialize(&HQ_SLICE, &slice, &mut s, SerdesOptions::default()).unwrap();
        // 6 + 8 + 6 zeros = 20 bits -> 3 bytes
        assert_eq!(filled.get_u64("slice_y_length"), Some(3));
        assert_eq!(filled.get_u64("slice_c1_length"), Some(1));
        assert_eq!(filled.get_u64("slice_c2_length"), Some(2));
        assert_eq!(bytes.len(), 1 + 1 + 1 + 3 + 1 + 1 + 1 + 2);

        let mut read_state = state(0xE8);
        read_state.slice_prefix_bytes = 1;
        let decoded =
            deserialize(&HQ_SLICE, &bytes, &mut read_state, SerdesOptions::default()).unwrap();
        assert_eq!(decoded, filled);
        // Re-serializing the decoded value reproduces the bytes
        let (again, _) =
            serialize(&HQ_SLICE, &decoded, &mut read_state, SerdesOptions::default()).unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn test_hq_zero_scaler() {
        let mut s = state(0xE8);
        s.slice_size_scaler = 0;
        let slice = Structured::new()
            .with("prefix_bytes", Vec::<u8>::new())
            .with("qindex", 0u64)
            .with("y_block", Structured::new().with("y_transform", coefficients(&[0; 8])));
        let err = serialize(&HQ_SLICE, &slice, &mut s, SerdesOptions::unchecked()).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ConstraintViolation(Violation::SliceSizeScalerIsZero)
        );
    }
}
