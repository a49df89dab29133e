// src/bitstream/vc2/mod.rs

//! VC-2 syntax descriptions (10 to 14).
//!
//! Every syntactic element of a VC-2 stream is a `static` [`Description`].
//! Field hooks keep the decoder [`State`](crate::decoder::state::State) up to
//! date and run the predicates of [`crate::decoder::checks`], so reading,
//! writing and measuring a data unit apply the same rules.

pub mod picture;
pub mod sequence_header;
pub mod slices;
pub mod stream;

use num_bigint::BigInt;

use crate::bitstream::description::Description;
use crate::bitstream::serdes::to_u64;
use crate::bitstream::value::Value;
use crate::decoder::error::ErrorKind;

pub use picture::{FRAGMENT_PARSE, PICTURE_PARSE, TRANSFORM_PARAMETERS};
pub use sequence_header::SEQUENCE_HEADER;
pub use slices::{HQ_SLICE, LD_SLICE};
pub use stream::{AUXILIARY_DATA, DATA_UNIT, PADDING, PARSE_INFO};

/// Every top-level description, for consistency checks.
pub fn descriptions() -> [&'static Description; 10] {
    [
        &DATA_UNIT,
        &PARSE_INFO,
        &SEQUENCE_HEADER,
        &PICTURE_PARSE,
        &FRAGMENT_PARSE,
        &TRANSFORM_PARAMETERS,
        &LD_SLICE,
        &HQ_SLICE,
        &AUXILIARY_DATA,
        &PADDING,
    ]
}

pub(crate) fn int<'v>(field: &'static str, value: &'v Value) -> Result<&'v BigInt, ErrorKind> {
    value.as_int().ok_or(ErrorKind::InvalidValue {
        field,
        expected: "an integer",
        found: value.type_name(),
    })
}

pub(crate) fn uint(field: &'static str, value: &Value) -> Result<u64, ErrorKind> {
    to_u64(field, int(field, value)?)
}

pub(crate) fn flag(field: &'static str, value: &Value) -> Result<bool, ErrorKind> {
    value.as_bool().ok_or(ErrorKind::InvalidValue {
        field,
        expected: "a boolean",
        found: value.type_name(),
    })
}
