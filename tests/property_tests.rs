use num_bigint::BigInt;
use proptest::prelude::*;
use vc2_conformance::bitstream::io::{BitReader, BitSink, BitWriter, sint_length, uint_length};
use vc2_conformance::bitstream::vc2::sequence_header::plain;
use vc2_conformance::encoder::{
    end_of_sequence_unit, padding_unit, sequence_header_unit, serialize_stream,
};
use vc2_conformance::tables::ParseCode;
use vc2_conformance::transform::quantization::{forward_quant, inverse_quant};
use vc2_conformance::{EncoderOptions, ErrorKind, Structured, Value, decode, parse_structured};

fn floor_log2(x: u64) -> u64 {
    63 - u64::from(x.leading_zeros())
}

proptest! {
    #[test]
    fn uint_code_length(x in 0u64..u64::MAX) {
        let value = BigInt::from(x);
        let mut writer = BitWriter::new();
        writer.write_uint(&value).unwrap();
        prop_assert_eq!(writer.tell(), 2 * floor_log2(x + 1) + 1);
        prop_assert_eq!(uint_length(&value), writer.tell());

        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        prop_assert_eq!(reader.read_uint().unwrap(), value);
    }

    #[test]
    fn sint_round_trip(x in any::<i64>()) {
        let value = BigInt::from(x);
        let mut writer = BitWriter::new();
        writer.write_sint(&value).unwrap();
        prop_assert_eq!(sint_length(&value), writer.tell());
        let bytes = writer.into_bytes();
        prop_assert_eq!(BitReader::new(&bytes).read_sint().unwrap(), value);
    }

    #[test]
    fn quantiser_is_monotonic(a in -100_000i64..100_000, b in -100_000i64..100_000, index in 0u32..64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let q_lo = forward_quant(&BigInt::from(lo), index);
        let q_hi = forward_quant(&BigInt::from(hi), index);
        prop_assert!(q_lo <= q_hi);
        prop_assert!(inverse_quant(&q_lo, index) <= inverse_quant(&q_hi, index));
        // Zero is a fixed point
        prop_assert_eq!(forward_quant(&BigInt::from(0), index), BigInt::from(0));
        prop_assert_eq!(inverse_quant(&BigInt::from(0), index), BigInt::from(0));
    }

    #[test]
    fn quantiser_index_zero_is_lossless(x in -1_000_000i64..1_000_000) {
        let value = BigInt::from(x);
        prop_assert_eq!(inverse_quant(&forward_quant(&value, 0), 0), value);
    }

    /// Whatever the padding and auxiliary payloads, the filled stream is
    /// exactly what reading the bytes gives back.
    #[test]
    fn stream_round_trip(
        padding in proptest::collection::vec(any::<u8>(), 0..40),
        auxiliary in proptest::collection::vec(any::<u8>(), 0..40),
        base_video_format in 0u64..=22,
    ) {
        let auxiliary_unit = vc2_conformance::encoder::data_unit(
            ParseCode::AuxiliaryData,
            Some(Structured::new().with("bytes", auxiliary)),
        );
        let stream = Structured::new().with(
            "data_units",
            vec![
                Value::from(sequence_header_unit(plain(3, 3, 0, base_video_format))),
                Value::from(padding_unit(padding)),
                Value::from(auxiliary_unit),
                Value::from(end_of_sequence_unit()),
            ],
        );
        let (bytes, filled) = serialize_stream(&stream, EncoderOptions::default()).unwrap();
        prop_assert_eq!(parse_structured(&bytes).unwrap(), filled);
    }

    /// Cutting a stream anywhere short of its end never decodes cleanly and
    /// never reports an offset beyond the data.
    #[test]
    fn truncated_stream_is_rejected(cut_fraction in 0.0f64..1.0) {
        let stream = Structured::new().with(
            "data_units",
            vec![
                Value::from(sequence_header_unit(plain(3, 3, 0, 0))),
                Value::from(padding_unit(vec![7; 9])),
                Value::from(end_of_sequence_unit()),
            ],
        );
        let (bytes, _) = serialize_stream(&stream, EncoderOptions::default()).unwrap();
        let cut = ((bytes.len() as f64) * cut_fraction) as usize;
        let report = decode(&bytes[..cut]);
        let err = report.conformance_error().unwrap();
        prop_assert!(err.bit_offset <= cut as u64 * 8);
        if err.kind == ErrorKind::EndOfStream {
            prop_assert_eq!(err.bit_offset, cut as u64 * 8);
        }
    }
}
