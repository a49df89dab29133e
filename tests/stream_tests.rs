use num_bigint::BigInt;
use vc2_conformance::bitstream::index::index_data_units;
use vc2_conformance::bitstream::vc2::sequence_header::plain;
use vc2_conformance::decoder::picture::PictureError;
use vc2_conformance::encoder::{
    self, PictureCoding, end_of_sequence_unit, fragment_units, padding_unit, picture_unit,
    sequence_header_unit, sequence_state, serialize_stream,
};
use vc2_conformance::tables::ParseCode;
use vc2_conformance::utils::arrays::Array2D;
use vc2_conformance::{
    DecoderOptions, EncoderOptions, ErrorKind, PictureBuffer, Structural, Structured, Value,
    Violation, decode, parse_structured, serialize,
};

/// An 8x4 4:2:0 8-bit sequence header for `profile`.
fn small_header(profile: u64) -> Structured {
    let mut header = plain(3, profile, 0, 0);
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
    header.set("video_parameters", source);
    header
}

fn plane(width: usize, height: usize, f: impl Fn(usize, usize) -> u64) -> Array2D<BigInt> {
    let rows = (0..height)
        .map(|y| (0..width).map(|x| BigInt::from(f(x, y))).collect())
        .collect();
    Array2D::from_rows(rows).unwrap()
}

fn test_picture(picture_number: u64) -> PictureBuffer {
    PictureBuffer {
        picture_number,
        y: plane(8, 4, |x, y| ((x * 37 + y * 91 + 11) % 256) as u64),
        c1: plane(4, 2, |x, y| (100 + x * 9 + y * 5) as u64),
        c2: plane(4, 2, |_, _| 128),
        luma_depth: 8,
        color_diff_depth: 8,
    }
}

fn ld_haar_coding() -> PictureCoding {
    PictureCoding {
        parse_code: ParseCode::LowDelayPicture,
        wavelet_index: 3,
        wavelet_index_ho: 3,
        dwt_depth: 1,
        slices_x: 2,
        slices_y: 1,
        slice_bytes_numerator: 80,
        slice_bytes_denominator: 1,
        qindex: 0,
        ..PictureCoding::default()
    }
}

fn hq_coding(parse_code: ParseCode) -> PictureCoding {
    PictureCoding {
        parse_code,
        wavelet_index: 1,
        wavelet_index_ho: 1,
        dwt_depth: 1,
        slices_x: 3,
        slices_y: 1,
        qindex: 0,
        ..PictureCoding::default()
    }
}

fn stream(units: Vec<Structured>) -> Structured {
    Structured::new().with(
        "data_units",
        units.into_iter().map(Value::from).collect::<Vec<Value>>(),
    )
}

fn ld_picture_stream() -> Structured {
    let header = small_header(0);
    let state = sequence_state(&header).unwrap();
    let picture = picture_unit(&state, &ld_haar_coding(), &test_picture(0)).unwrap();
    stream(vec![
        sequence_header_unit(header),
        picture,
        end_of_sequence_unit(),
    ])
}

fn next_parse_offsets(filled: &Structured) -> Vec<u64> {
    filled
        .get_list("data_units")
        .unwrap()
        .iter()
        .map(|u| {
            u.as_struct()
                .and_then(|u| u.get_struct("parse_info"))
                .and_then(|p| p.get_u64("next_parse_offset"))
                .unwrap()
        })
        .collect()
}

/// A lossless low-delay Haar picture decodes back to its input samples.
#[test]
fn test_ld_haar_picture_is_lossless() {
    let options = EncoderOptions {
        check_constraints: true,
    };
    let (bytes, _) = serialize_stream(&ld_picture_stream(), options).unwrap();
    println!("Encoded low-delay stream: {} bytes", bytes.len());

    let report = decode(&bytes);
    assert!(report.is_conformant(), "unexpected error: {:?}", report.error);
    assert_eq!(report.pictures.len(), 1);
    assert_eq!(report.pictures[0], test_picture(0));
    assert_eq!(report.data_units().len(), 3);
}

/// The same picture split over three fragments reconstructs identically.
#[test]
fn test_fragmented_picture_matches_whole_picture() {
    let header = small_header(3);
    let state = sequence_state(&header).unwrap();
    let picture = test_picture(0);

    let whole = picture_unit(&state, &hq_coding(ParseCode::HighQualityPicture), &picture).unwrap();
    let whole_stream = stream(vec![
        sequence_header_unit(header.clone()),
        whole,
        end_of_sequence_unit(),
    ]);

    let fragments = fragment_units(
        &state,
        &hq_coding(ParseCode::HighQualityPictureFragment),
        &picture,
        1,
    )
    .unwrap();
    // The transform parameters fragment plus one fragment per slice
    assert_eq!(fragments.len(), 4);
    let mut units = vec![sequence_header_unit(header)];
    units.extend(fragments);
    units.push(end_of_sequence_unit());
    let fragment_stream = stream(units);

    let whole_bytes = serialize(&whole_stream).unwrap();
    let fragment_bytes = serialize(&fragment_stream).unwrap();

    let whole_report = decode(&whole_bytes);
    let fragment_report = decode(&fragment_bytes);
    assert!(whole_report.is_conformant(), "{:?}", whole_report.error);
    assert!(fragment_report.is_conformant(), "{:?}", fragment_report.error);
    assert_eq!(fragment_report.data_units().len(), 6);
    assert_eq!(fragment_report.pictures.len(), 1);
    assert_eq!(fragment_report.pictures, whole_report.pictures);
    assert_eq!(fragment_report.pictures[0], picture);
}

/// Truncating inside a picture reports the end of the data as the offset.
#[test]
fn test_truncation_reports_end_of_stream_offset() {
    let (bytes, filled) =
        serialize_stream(&ld_picture_stream(), EncoderOptions::default()).unwrap();
    let header_bytes = next_parse_offsets(&filled)[0] as usize;

    for cut in [header_bytes + 5, header_bytes + 20, bytes.len() - 20] {
        let report = decode(&bytes[..cut]);
        let err = report.conformance_error().unwrap();
        assert_eq!(err.kind, ErrorKind::EndOfStream, "cut at byte {}", cut);
        assert_eq!(err.bit_offset, cut as u64 * 8);
        assert_eq!(err.routines.first().copied(), Some("parse_sequence"));
        // Units before the damage are still reported
        assert_eq!(report.data_units().len(), 1);
        assert!(report.pictures.is_empty());
    }
}

/// A stream that stops after a whole data unit lacks its end of sequence.
#[test]
fn test_missing_end_of_sequence() {
    let header = small_header(0);
    let bytes = serialize(&stream(vec![sequence_header_unit(header)])).unwrap();
    let err = decode(&bytes).error.unwrap();
    let err = err.conformance().unwrap();
    assert_eq!(
        err.kind,
        ErrorKind::StructuralInconsistency(Structural::MissingEndOfSequence)
    );
    assert_eq!(err.bit_offset, bytes.len() as u64 * 8);
}

/// A wrong next_parse_offset is the one error reported, naming the field.
#[test]
fn test_wrong_next_parse_offset() {
    let (_, filled) = serialize_stream(&ld_picture_stream(), EncoderOptions::default()).unwrap();
    let offsets = next_parse_offsets(&filled);

    let mut units: Vec<Structured> = ld_picture_stream()
        .get_list("data_units")
        .unwrap()
        .iter()
        .map(|u| u.as_struct().unwrap().clone())
        .collect();
    let parse_info = units[1]
        .get_struct("parse_info")
        .unwrap()
        .clone()
        .with("next_parse_offset", offsets[1] + 1);
    units[1].set("parse_info", parse_info);
    let bytes = serialize(&stream(units)).unwrap();

    let report = decode(&bytes);
    let err = report.conformance_error().unwrap();
    assert_eq!(
        err.kind,
        ErrorKind::AutoFillMismatch {
            field: "next_parse_offset",
            computed: BigInt::from(offsets[1]),
            encoded: BigInt::from(offsets[1] + 1),
        }
    );
    // Four byte prefix and the parse code precede the offset
    assert_eq!(err.bit_offset, offsets[0] * 8 + 40);
    assert_eq!(err.region_bits, Some(32));
    assert!(report.pictures.is_empty());

    let hint = err.viewer_hint("vc2-bitstream-viewer", "bad.vc2");
    assert!(hint.contains(&format!("--from-offset {}", err.bit_offset)));
}

/// A fragment whose declared length disagrees with its contents.
#[test]
fn test_wrong_fragment_data_length() {
    let header = small_header(3);
    let state = sequence_state(&header).unwrap();
    let mut fragments = fragment_units(
        &state,
        &hq_coding(ParseCode::HighQualityPictureFragment),
        &test_picture(0),
        3,
    )
    .unwrap();
    assert_eq!(fragments.len(), 2);

    let mut fragment = fragments[1].get_struct("fragment_parse").unwrap().clone();
    let fragment_header = fragment
        .get_struct("fragment_header")
        .unwrap()
        .clone()
        .with("fragment_data_length", 1u64);
    fragment.set("fragment_header", fragment_header);
    fragments[1].set("fragment_parse", fragment);

    let mut units = vec![sequence_header_unit(header)];
    units.extend(fragments);
    units.push(end_of_sequence_unit());
    let bytes = serialize(&stream(units)).unwrap();

    let err = decode(&bytes).error.unwrap();
    match &err.conformance().unwrap().kind {
        ErrorKind::AutoFillMismatch {
            field,
            computed,
            encoded,
        } => {
            assert_eq!(*field, "fragment_data_length");
            assert_eq!(*encoded, BigInt::from(1));
            assert!(*computed > BigInt::from(1));
        }
        other => panic!("expected an auto-fill mismatch, got {:?}", other),
    }
}

/// Sequences may follow one another; picture numbering restarts.
#[test]
fn test_multiple_sequences() {
    let header = small_header(0);
    let state = sequence_state(&header).unwrap();
    let coding = ld_haar_coding();
    let mut units = Vec::new();
    for _ in 0..2 {
        units.push(sequence_header_unit(header.clone()));
        units.push(picture_unit(&state, &coding, &test_picture(0)).unwrap());
        units.push(padding_unit(vec![0xAA, 0x55]));
        units.push(end_of_sequence_unit());
    }
    let bytes = serialize(&stream(units)).unwrap();

    let report = decode(&bytes);
    assert!(report.is_conformant(), "{:?}", report.error);
    assert_eq!(report.pictures.len(), 2);
    assert_eq!(report.pictures[0], report.pictures[1]);

    let index = index_data_units(&bytes).unwrap();
    let codes: Vec<u8> = index.iter().map(|e| e.parse_code).collect();
    assert_eq!(codes, vec![0x00, 0xC8, 0x30, 0x10, 0x00, 0xC8, 0x30, 0x10]);
}

/// Sequence headers within one sequence must be identical.
#[test]
fn test_sequence_header_change_is_rejected() {
    let units = vec![
        sequence_header_unit(small_header(0)),
        sequence_header_unit(plain(3, 0, 0, 0)),
        end_of_sequence_unit(),
    ];
    let bytes = serialize(&stream(units)).unwrap();
    let err = decode(&bytes).error.unwrap();
    assert!(matches!(
        err.conformance().unwrap().kind,
        ErrorKind::ConstraintViolation(Violation::SequenceHeaderChangedMidSequence { .. })
    ));
}

/// The parsed structure serializes back to the identical bytes.
#[test]
fn test_parsed_structure_round_trips() {
    let bytes = serialize(&ld_picture_stream()).unwrap();
    let structure = parse_structured(&bytes).unwrap();
    assert_eq!(serialize(&structure).unwrap(), bytes);

    let checked = EncoderOptions {
        check_constraints: true,
    };
    let (again, filled) = serialize_stream(&structure, checked).unwrap();
    assert_eq!(again, bytes);
    assert_eq!(filled, structure);
}

/// Structure-only decoding skips picture reconstruction.
#[test]
fn test_structure_only_decoding() {
    let bytes = serialize(&ld_picture_stream()).unwrap();
    let options = DecoderOptions {
        reconstruct_pictures: false,
        ..DecoderOptions::default()
    };
    let report = vc2_conformance::Decoder::new(&bytes, options).decode();
    assert!(report.is_conformant());
    assert!(report.pictures.is_empty());
    assert_eq!(report.data_units().len(), 3);
}

/// Picture dimensions must match the sequence.
#[test]
fn test_encoder_rejects_wrong_picture_size() {
    let state = sequence_state(&small_header(0)).unwrap();
    let mut picture = test_picture(0);
    picture.y = plane(4, 4, |_, _| 0);
    let err = encoder::picture_unit(&state, &ld_haar_coding(), &picture).unwrap_err();
    assert!(matches!(err, vc2_conformance::Vc2Error::InvalidArg(_)));
}

/// A tiny stream declaring a 2^20 x 2^20 picture parses in time proportional
/// to its length and fails cleanly when reconstruction is attempted.
#[test]
fn test_huge_declared_picture_fails_cleanly() {
    let mut header = small_header(0);
    let mut source = header.get_struct("video_parameters").unwrap().clone();
    source.set(
        "frame_size",
        Structured::new()
            .with("custom_dimensions_flag", true)
            .with("frame_width", 1u64 << 20)
            .with("frame_height", 1u64 << 20),
    );
    header.set("video_parameters", source);

    let coding = PictureCoding {
        slices_x: 1,
        slices_y: 1,
        slice_bytes_numerator: 1,
        ..ld_haar_coding()
    };
    // One 8-bit slice: a 7-bit qindex then a single one-bit zero
    let slice = Structured::new()
        .with("qindex", 0u64)
        .with("y_block", Structured::new().with("y_transform", Vec::<Value>::new()))
        .with("c_block", Structured::new().with("c_transform", vec![Value::from(0i64)]));
    let transform = Structured::new()
        .with("transform_parameters", coding.transform_parameters(3))
        .with(
            "transform_data",
            Structured::new().with("ld_slices", vec![Value::from(slice)]),
        );
    let picture = encoder::data_unit(
        ParseCode::LowDelayPicture,
        Some(
            Structured::new()
                .with("picture_header", Structured::new().with("picture_number", 0u64))
                .with("wavelet_transform", transform),
        ),
    );
    let bytes = serialize(&stream(vec![
        sequence_header_unit(header),
        picture,
        end_of_sequence_unit(),
    ]))
    .unwrap();
    println!("Hostile stream: {} bytes", bytes.len());
    assert!(bytes.len() < 100);

    let structure = parse_structured(&bytes).unwrap();
    let slices = structure.get_list("data_units").unwrap()[1]
        .as_struct()
        .and_then(|u| u.get_struct("picture_parse"))
        .and_then(|p| p.get_struct("wavelet_transform"))
        .and_then(|w| w.get_struct("transform_data"))
        .and_then(|d| d.get_list("ld_slices"))
        .unwrap();
    let y = slices[0]
        .as_struct()
        .and_then(|s| s.get_struct("y_block"))
        .and_then(|b| b.get_list("y_transform"))
        .unwrap();
    assert!(y.is_empty());

    let report = decode(&bytes);
    assert!(matches!(
        report.error,
        Some(vc2_conformance::Vc2Error::Picture(PictureError::TooLarge {
            width: 1_048_576,
            height: 1_048_576,
        }))
    ));
}
