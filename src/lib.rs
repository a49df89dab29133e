//! # VC-2 Conformance Library
//!
//! Bit-exact reading, checking and writing of SMPTE ST 2042 (VC-2) bitstreams,
//! and reconstruction of the pictures they carry.
//!
//! This library is organized into several modules:
//! - `utils`: Error type, integer helpers and 2D arrays
//! - `bitstream`: Bit-level I/O, structured values and the serdes engine with
//!   the VC-2 syntax descriptions
//! - `tables`: Constants and lookup tables
//! - `transform`: Wavelet transforms and quantisation
//! - `decoder`: Decoder state, conformance checks and the stream decoder
//! - `encoder`: Stream serialization and picture coding

// Re-export commonly used types at the crate root
pub use utils::error::{Result, Vc2Error};

pub mod utils {
    pub mod arrays;
    pub mod error;
    pub mod math;
}

pub mod bitstream {
    pub mod description;
    pub mod index;
    pub mod io;
    pub mod serdes;
    pub mod value;
    pub mod vc2;
}

pub mod decoder {
    pub mod checks;
    pub mod error;
    pub mod fragment;
    pub mod picture;
    pub mod state;
    pub mod stream;
}

pub mod encoder;
pub mod picture;
pub mod slice_sizes;
pub mod tables;
pub mod transform;

// Public API exports
pub use bitstream::serdes::SerdesOptions;
pub use bitstream::value::{Structured, Value};
pub use decoder::error::{ConformanceError, ErrorKind, Structural, Violation};
pub use decoder::stream::{DecodeReport, Decoder, DecoderOptions};
pub use encoder::EncoderOptions;
pub use picture::PictureBuffer;

/// Decodes a stream with full checking, reconstructing every picture.
pub fn decode(data: &[u8]) -> DecodeReport {
    decoder::stream::decode_stream(data, DecoderOptions::default())
}

/// Parses and checks a stream without reconstructing pictures, returning its
/// structure for viewer tooling.
pub fn parse_structured(data: &[u8]) -> Result<Structured> {
    let options = DecoderOptions {
        reconstruct_pictures: false,
        ..DecoderOptions::default()
    };
    let report = decoder::stream::decode_stream(data, options);
    match report.error {
        Some(err) => Err(err),
        None => Ok(report.structure),
    }
}

/// Serializes `{"data_units": [...]}`, filling in every auto-fill field.
pub fn serialize(stream: &Structured) -> Result<Vec<u8>> {
    let (bytes, _) = encoder::serialize_stream(stream, EncoderOptions::default())?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_reports_errors() {
        let err = parse_structured(&[]).unwrap_err();
        assert_eq!(
            err.conformance().map(|e| &e.kind),
            Some(&ErrorKind::StructuralInconsistency(
                Structural::MissingEndOfSequence
            ))
        );
    }
}
