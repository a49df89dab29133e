// src/bitstream/vc2/stream.rs

//! (10) Stream syntax: data units, parse info headers, auxiliary data and
//! padding.

use num_bigint::BigInt;

use super::picture::{FRAGMENT_PARSE, PICTURE_PARSE};
use super::sequence_header::SEQUENCE_HEADER;
use super::uint;
use crate::bitstream::description::{AutoFill, Description, Field, Presence, Scope, Width};
use crate::bitstream::value::Value;
use crate::decoder::checks;
use crate::decoder::error::{ErrorKind, Violation};
use crate::decoder::state::State;
use crate::tables::{self, parse_code};

/// One parse info header and the body its parse code selects.
pub static DATA_UNIT: Description = Description {
    name: "data_unit",
    fields: &[
        Field::nested("parse_info", &PARSE_INFO),
        Field::nested("sequence_header", &SEQUENCE_HEADER).when(Presence::IfState(is_seq_header)),
        Field::nested("picture_parse", &PICTURE_PARSE).when(Presence::IfState(is_picture)),
        Field::nested("fragment_parse", &FRAGMENT_PARSE).when(Presence::IfState(is_fragment)),
        Field::nested("auxiliary_data", &AUXILIARY_DATA).when(Presence::IfState(is_auxiliary_data)),
        Field::nested("padding", &PADDING).when(Presence::IfState(is_padding_data)),
    ],
};

/// (10.5.1)
pub static PARSE_INFO: Description = Description {
    name: "parse_info",
    fields: &[
        Field::byte_align("padding"),
        Field::uint_lit("parse_info_prefix", 4)
            .autofill(AutoFill::Default(prefix))
            .check(check_prefix)
            .update(start_data_unit),
        Field::uint_lit("parse_code", 1)
            .check(check_parse_code)
            .update(set_parse_code),
        Field::uint_lit("next_parse_offset", 4)
            .autofill(AutoFill::Stream {
                fill: Some(known_next_parse_offset),
                verify: false,
            })
            .check(check_next_parse_offset)
            .update(set_next_parse_offset),
        Field::uint_lit("previous_parse_offset", 4).autofill(AutoFill::Stream {
            fill: Some(known_previous_parse_offset),
            verify: true,
        }),
    ],
};

/// (10.4.4)
pub static AUXILIARY_DATA: Description = Description {
    name: "auxiliary_data",
    fields: &[
        Field::byte_align("padding"),
        Field::bytes("bytes", Width::Computed(payload_bytes)),
    ],
};

/// (10.4.5)
pub static PADDING: Description = Description {
    name: "padding",
    fields: &[
        Field::byte_align("padding"),
        Field::bytes("bytes", Width::Computed(payload_bytes)),
    ],
};

fn is_seq_header(state: &State) -> bool {
    parse_code::is_seq_header(state.parse_code)
}

fn is_picture(state: &State) -> bool {
    parse_code::is_picture(state.parse_code)
}

fn is_fragment(state: &State) -> bool {
    parse_code::is_fragment(state.parse_code)
}

fn is_auxiliary_data(state: &State) -> bool {
    parse_code::is_auxiliary_data(state.parse_code)
}

fn is_padding_data(state: &State) -> bool {
    parse_code::is_padding_data(state.parse_code)
}

fn prefix(_scope: &Scope<'_>, _state: &State) -> Result<BigInt, ErrorKind> {
    Ok(BigInt::from(tables::PARSE_INFO_PREFIX))
}

fn check_prefix(_scope: &Scope<'_>, _state: &State, value: &Value) -> Result<(), ErrorKind> {
    checks::parse_info_prefix(uint("parse_info_prefix", value)?)
}

/// The prefix marks the start of a data unit; everything measured in bytes
/// is relative to it.
fn start_data_unit(scope: &Scope<'_>, state: &mut State, _value: &Value) -> Result<(), ErrorKind> {
    state.previous_unit_start = state.unit_start;
    state.unit_start = Some(scope.offset);
    state.units_in_sequence += 1;
    Ok(())
}

fn check_parse_code(_scope: &Scope<'_>, state: &State, value: &Value) -> Result<(), ErrorKind> {
    checks::parse_code(state, uint("parse_code", value)?)
}

fn set_parse_code(_scope: &Scope<'_>, state: &mut State, value: &Value) -> Result<(), ErrorKind> {
    let code = uint("parse_code", value)?;
    state.parse_code = u8::try_from(code).map_err(|_| Violation::ValueTooLarge {
        field: "parse_code",
        value: BigInt::from(code),
    })?;
    Ok(())
}

fn known_next_parse_offset(_scope: &Scope<'_>, state: &State) -> Option<BigInt> {
    parse_code::is_end_of_sequence(state.parse_code).then(|| BigInt::from(0))
}

fn check_next_parse_offset(
    _scope: &Scope<'_>,
    state: &State,
    value: &Value,
) -> Result<(), ErrorKind> {
    checks::next_parse_offset(state.parse_code, uint("next_parse_offset", value)?)
}

fn set_next_parse_offset(
    _scope: &Scope<'_>,
    state: &mut State,
    value: &Value,
) -> Result<(), ErrorKind> {
    state.next_parse_offset = uint("next_parse_offset", value)?;
    Ok(())
}

/// (10.5.1) Zero for the first data unit of a sequence, otherwise the byte
/// distance back to the previous parse info header.
fn known_previous_parse_offset(_scope: &Scope<'_>, state: &State) -> Option<BigInt> {
    match (state.previous_unit_start, state.unit_start) {
        (Some(previous), Some(current)) => Some(BigInt::from((current - previous) / 8)),
        _ => Some(BigInt::from(0)),
    }
}

fn payload_bytes(_scope: &Scope<'_>, state: &State) -> Result<u64, ErrorKind> {
    Ok(state
        .next_parse_offset
        .saturating_sub(tables::PARSE_INFO_HEADER_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::serdes::{Serdes, SerdesOptions, deserialize, serialize};
    use crate::bitstream::value::Structured;

    fn end_of_sequence() -> Structured {
        Structured::new().with(
            "parse_info",
            Structured::new().with("parse_code", 0x10u64),
        )
    }

    #[test]
    fn test_parse_info_layout() {
        let options = SerdesOptions::unchecked();
        let (bytes, filled) =
            serialize(&DATA_UNIT, &end_of_sequence(), &mut State::new(), options).unwrap();
        assert_eq!(
            bytes,
            vec![0x42, 0x42, 0x43, 0x44, 0x10, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        let parse_info = filled.get_struct("parse_info").unwrap();
        assert_eq!(parse_info.get_u64("next_parse_offset"), Some(0));
        assert_eq!(parse_info.get_u64("previous_parse_offset"), Some(0));
        assert!(!filled.contains("sequence_header"));
    }

    #[test]
    fn test_bad_prefix_is_reported_at_its_offset() {
        let data = [0x42, 0x42, 0x43, 0x45, 0x10, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = deserialize(&DATA_UNIT, &data, &mut State::new(), SerdesOptions::default())
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ConstraintViolation(Violation::BadParseInfoPrefix { prefix: 0x42424345 })
        );
        assert_eq!(err.bit_offset, 0);
        assert_eq!(err.region_bits, Some(32));
        assert_eq!(err.routines, vec!["data_unit", "parse_info"]);
    }

    #[test]
    fn test_previous_parse_offset_is_verified() {
        let mut state = State::new();
        state.unit_start = Some(0);
        state.units_in_sequence = 1;
        // Second data unit, 20 bytes after the first
        let data = [0x42, 0x42, 0x43, 0x44, 0x10, 0, 0, 0, 0, 0, 0, 0, 19];
        let mut stream = vec![0u8; 20];
        stream.extend_from_slice(&data);
        static SKIP: Description = Description {
            name: "skip",
            fields: &[Field::bytes("skipped", Width::Fixed(20))],
        };
        let mut serdes = Serdes::reader(&stream, SerdesOptions::default());
        serdes.run(&SKIP, None, &mut state).unwrap();
        let err = serdes.run(&DATA_UNIT, None, &mut state).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::AutoFillMismatch {
                field: "previous_parse_offset",
                computed: BigInt::from(20),
                encoded: BigInt::from(19),
            }
        );
        assert_eq!(err.bit_offset, 20 * 8 + 9 * 8);
    }

    #[test]
    fn test_wide_parse_code_is_rejected() {
        let value = Structured::new();
        let scope = Scope {
            routine: "parse_info",
            value: &value,
            input: None,
            index: None,
            offset: 32,
            parent: None,
        };
        let mut state = State::new();
        let err = set_parse_code(&scope, &mut state, &Value::from(0x1C8u64)).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::ConstraintViolation(Violation::ValueTooLarge {
                field: "parse_code",
                value: BigInt::from(0x1C8),
            })
        );
        assert_eq!(state.parse_code, 0);
    }

    #[test]
    fn test_padding_payload() {
        let mut state = State::new();
        state.parse_code = 0x30;
        state.next_parse_offset = 16;
        let data = [1u8, 2, 3];
        let value = deserialize(&PADDING, &data, &mut state, SerdesOptions::default()).unwrap();
        assert_eq!(value.get("bytes").and_then(Value::as_bytes), Some(&data[..]));
    }
}
