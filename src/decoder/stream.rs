// src/decoder/stream.rs

//! (10.4) The stream decoder.
//!
//! Reads data units one after another, dispatching on their parse code, until
//! an end of sequence data unit is reached. A stream may hold several
//! sequences back to back. Decoding stops at the first conformance error.

use log::{debug, info};

use crate::bitstream::serdes::{Serdes, SerdesOptions};
use crate::bitstream::value::{Structured, Value};
use crate::bitstream::vc2::DATA_UNIT;
use crate::decoder::checks;
use crate::decoder::error::{ConformanceError, ErrorKind, Structural, Violation};
use crate::decoder::fragment::FragmentAssembler;
use crate::decoder::picture::decode_picture;
use crate::decoder::state::{Component, State};
use crate::picture::PictureBuffer;
use crate::tables::parse_code;
use crate::{Result, Vc2Error};

/// Configuration for stream decoding
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    /// Checking behaviour of the underlying serdes engine
    pub serdes: SerdesOptions,
    /// Whether to reconstruct pictures (false only parses and checks)
    pub reconstruct_pictures: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            serdes: SerdesOptions::default(),
            reconstruct_pictures: true,
        }
    }
}

/// Everything learned from decoding a stream.
#[derive(Debug)]
pub struct DecodeReport {
    /// Pictures in decode order, up to the first error.
    pub pictures: Vec<PictureBuffer>,
    /// `{"data_units": [...]}` holding every data unit read in full.
    pub structure: Structured,
    /// The error that stopped decoding, if any.
    pub error: Option<Vc2Error>,
}

impl DecodeReport {
    pub fn is_conformant(&self) -> bool {
        self.error.is_none()
    }

    pub fn conformance_error(&self) -> Option<&ConformanceError> {
        self.error.as_ref().and_then(Vc2Error::conformance)
    }

    pub fn data_units(&self) -> &[Value] {
        self.structure.get_list("data_units").unwrap_or(&[])
    }

    pub fn into_result(self) -> Result<Vec<PictureBuffer>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.pictures),
        }
    }
}

pub struct Decoder<'a> {
    serdes: Serdes<'a>,
    state: State,
    options: DecoderOptions,
    assembler: FragmentAssembler,
    /// Bit offset and value of the first sequence header of the current
    /// sequence.
    first_sequence_header: Option<(u64, Structured)>,
    units: Vec<Value>,
    pictures: Vec<PictureBuffer>,
    sequences: u64,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], options: DecoderOptions) -> Self {
        Self {
            serdes: Serdes::reader(data, options.serdes),
            state: State::new(),
            options,
            assembler: FragmentAssembler::new(),
            first_sequence_header: None,
            units: Vec::new(),
            pictures: Vec::new(),
            sequences: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Decodes the whole stream.
    pub fn decode(mut self) -> DecodeReport {
        let result = self.decode_stream();
        if let Err(err) = &result {
            debug!("Decoding stopped: {}", err);
        }
        DecodeReport {
            pictures: self.pictures,
            structure: Structured::new().with("data_units", self.units),
            error: result.err(),
        }
    }

    fn decode_stream(&mut self) -> Result<()> {
        loop {
            self.serdes.enter("parse_sequence");
            let result = self.decode_sequence();
            self.serdes.leave();
            result?;
            if self.bits_left() == 0 {
                return Ok(());
            }
            self.state.reset_for_sequence();
            self.assembler.reset();
            self.first_sequence_header = None;
        }
    }

    /// Bits left in the stream from the next byte boundary.
    fn bits_left(&self) -> u64 {
        self.serdes.source().map_or(0, |reader| {
            let aligned = reader.tell().div_ceil(8) * 8;
            reader.len_bits().saturating_sub(aligned)
        })
    }

    fn error(&self, kind: ErrorKind, offset: u64) -> ConformanceError {
        self.serdes.error(kind, offset).with_state(self.state.summary())
    }

    fn decode_sequence(&mut self) -> Result<()> {
        self.sequences += 1;
        debug!("Sequence {} begins at byte {}", self.sequences, self.serdes.tell() / 8);
        loop {
            if self.bits_left() < 8 {
                let offset = self.serdes.tell();
                return Err(self.error(Structural::MissingEndOfSequence.into(), offset).into());
            }
            let unit = self
                .serdes
                .run(&DATA_UNIT, None, &mut self.state)
                .map_err(|err| err.with_state(self.state.summary()))?;
            let end = self.serdes.tell();
            let code = self.state.parse_code;
            let unit_start = self.state.unit_start.unwrap_or(0);
            debug!(
                "Data unit 0x{:02X} at byte {}, {} bytes",
                code,
                unit_start / 8,
                end.div_ceil(8) - unit_start / 8
            );
            #[cfg(feature = "debug-logging")]
            debug!("{}", unit);

            self.check_next_parse_offset(&unit, unit_start, end)?;
            if parse_code::is_seq_header(code) {
                self.sequence_header(&unit)?;
            } else if parse_code::is_picture(code) {
                self.picture(&unit)?;
            } else if parse_code::is_fragment(code) {
                self.check_fragment_data_length(&unit, end)?;
                self.fragment(&unit)?;
            }
            self.units.push(Value::from(unit));

            if parse_code::is_end_of_sequence(code) {
                if self.options.serdes.check_constraints {
                    checks::end_of_sequence(&self.state)
                        .map_err(|kind| self.error(kind, unit_start))?;
                }
                info!(
                    "Sequence {} complete: {} data units, {} pictures",
                    self.sequences, self.state.units_in_sequence, self.state.pictures_in_sequence
                );
                return Ok(());
            }
        }
    }

    /// (10.5.1) A non-zero next_parse_offset gives the size of its data unit.
    fn check_next_parse_offset(
        &self,
        unit: &Structured,
        unit_start: u64,
        end: u64,
    ) -> std::result::Result<(), ConformanceError> {
        if !self.options.serdes.check_autofill || parse_code::is_end_of_sequence(self.state.parse_code)
        {
            return Ok(());
        }
        let Some(parse_info) = unit.get_struct("parse_info") else {
            return Ok(());
        };
        let encoded = parse_info.get_u64("next_parse_offset").unwrap_or(0);
        let computed = end.div_ceil(8) - unit_start / 8;
        if encoded == 0 || encoded == computed {
            return Ok(());
        }
        let offset = parse_info.offset_of("next_parse_offset").unwrap_or(unit_start);
        Err(ConformanceError::new(
            ErrorKind::AutoFillMismatch {
                field: "next_parse_offset",
                computed: computed.into(),
                encoded: encoded.into(),
            },
            offset,
        )
        .with_region(32)
        .with_routines(&["parse_sequence", "data_unit", "parse_info"])
        .with_state(self.state.summary()))
    }

    /// (14.2) A non-zero fragment_data_length counts the bytes after the
    /// fragment header.
    fn check_fragment_data_length(
        &self,
        unit: &Structured,
        end: u64,
    ) -> std::result::Result<(), ConformanceError> {
        if !self.options.serdes.check_autofill {
            return Ok(());
        }
        let Some(fragment) = unit.get_struct("fragment_parse") else {
            return Ok(());
        };
        let Some(header) = fragment.get_struct("fragment_header") else {
            return Ok(());
        };
        let (Some(encoded), Some(offset), Some(data_start)) = (
            header.get_u64("fragment_data_length"),
            header.offset_of("fragment_data_length"),
            fragment.offset_of("padding2"),
        ) else {
            return Ok(());
        };
        let computed = end.div_ceil(8) - data_start / 8;
        if encoded == 0 || encoded == computed {
            return Ok(());
        }
        Err(ConformanceError::new(
            ErrorKind::AutoFillMismatch {
                field: "fragment_data_length",
                computed: computed.into(),
                encoded: encoded.into(),
            },
            offset,
        )
        .with_region(16)
        .with_routines(&["parse_sequence", "data_unit", "fragment_parse", "fragment_header"])
        .with_state(self.state.summary()))
    }

    /// (11.1) Every sequence header in a sequence repeats the first.
    fn sequence_header(&mut self, unit: &Structured) -> std::result::Result<(), ConformanceError> {
        let Some(header) = unit.get_struct("sequence_header") else {
            return Ok(());
        };
        let offset = unit.offset_of("sequence_header").unwrap_or(0);
        match &self.first_sequence_header {
            Some((first_offset, first)) => {
                if self.options.serdes.check_constraints && first != header {
                    let violation = Violation::SequenceHeaderChangedMidSequence {
                        first_offset: *first_offset,
                        offset,
                    };
                    return Err(self.error(violation.into(), offset));
                }
            }
            None => {
                info!("Sequence header: {}", self.state.summary());
                self.first_sequence_header = Some((offset, header.clone()));
            }
        }
        Ok(())
    }

    fn picture(&mut self, unit: &Structured) -> Result<()> {
        if !self.options.reconstruct_pictures {
            return Ok(());
        }
        let transform_data = unit
            .get_struct("picture_parse")
            .and_then(|p| p.get_struct("wavelet_transform"))
            .and_then(|w| w.get_struct("transform_data"));
        let slices: Vec<&Structured> = transform_data
            .and_then(|d| d.get_list("ld_slices").or_else(|| d.get_list("hq_slices")))
            .unwrap_or(&[])
            .iter()
            .filter_map(Value::as_struct)
            .collect();
        let picture = decode_picture(&self.state, self.state.picture_number, &slices)?;
        self.finish_picture(picture);
        Ok(())
    }

    fn fragment(&mut self, unit: &Structured) -> Result<()> {
        if !self.options.reconstruct_pictures {
            return Ok(());
        }
        let Some(fragment) = unit.get_struct("fragment_parse") else {
            return Ok(());
        };
        if let Some(assembled) = self.assembler.push(&self.state, fragment) {
            let picture =
                decode_picture(&self.state, assembled.picture_number, &assembled.slice_refs())?;
            self.finish_picture(picture);
        }
        Ok(())
    }

    fn finish_picture(&mut self, picture: PictureBuffer) {
        let (width, height) = picture.dimensions(Component::Y);
        info!(
            "Decoded picture {} ({}x{}, {} bit luma)",
            picture.picture_number, width, height, picture.luma_depth
        );
        self.pictures.push(picture);
    }
}

/// Decodes `data` with the given options.
pub fn decode_stream(data: &[u8], options: DecoderOptions) -> DecodeReport {
    Decoder::new(data, options).decode()
}
