// src/encoder.rs

//! Stream construction.
//!
//! [`serialize_stream`] writes a structured stream, filling in the parse
//! offsets and fragment lengths that depend on the size of each data unit.
//! The remaining functions build data units from pictures with the forward
//! transform and quantiser, for producing test streams.

use log::{debug, info};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::bitstream::serdes::{Serdes, SerdesOptions};
use crate::bitstream::value::{Structured, Value};
use crate::bitstream::vc2::{DATA_UNIT, SEQUENCE_HEADER, TRANSFORM_PARAMETERS};
use crate::decoder::error::ConformanceError;
use crate::decoder::picture::{dc_orientation, predict_dc, wavelet_config};
use crate::decoder::state::{Component, State};
use crate::picture::PictureBuffer;
use crate::slice_sizes;
use crate::tables::{ParseCode, parse_code};
use crate::transform::quantization::{forward_quant, inverse_quant};
use crate::transform::wavelet::{dwt, pad};
use crate::transform::{Coefficients, subband_order};
use crate::utils::arrays::Array2D;
use crate::utils::math::pow2;
use crate::{Result, Vc2Error};

/// Configuration for stream serialization
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderOptions {
    /// Run constraint and auto-fill checks while writing. Off by default so
    /// that deliberately non-conformant streams can be built.
    pub check_constraints: bool,
}

impl EncoderOptions {
    fn serdes(&self) -> SerdesOptions {
        SerdesOptions {
            check_constraints: self.check_constraints,
            check_autofill: self.check_constraints,
            strict_padding: false,
        }
    }
}

/// Writes `{"data_units": [...]}` to bytes. Returns the bytes and the stream
/// with every auto-filled field present.
pub fn serialize_stream(stream: &Structured, options: EncoderOptions) -> Result<(Vec<u8>, Structured)> {
    let units = stream
        .get_list("data_units")
        .ok_or_else(|| Vc2Error::InvalidArg("stream has no 'data_units' list".to_string()))?;

    let mut writer = Serdes::writer(options.serdes());
    let mut state = State::new();
    let mut filled_units = Vec::with_capacity(units.len());
    for (i, unit) in units.iter().enumerate() {
        let unit = unit
            .as_struct()
            .ok_or_else(|| Vc2Error::InvalidArg(format!("data unit {} is not a structure", i)))?;
        let unit = fill_unit_lengths(unit, &state, writer.tell())?;
        let filled = writer.run(&DATA_UNIT, Some(&unit), &mut state)?;
        debug!("Wrote data unit 0x{:02X} ending at bit {}", state.parse_code, writer.tell());
        if parse_code::is_end_of_sequence(state.parse_code) {
            state.reset_for_sequence();
        }
        filled_units.push(Value::from(filled));
    }
    let bytes = writer.into_bytes();
    info!("Serialized {} data units into {} bytes", filled_units.len(), bytes.len());
    Ok((bytes, Structured::new().with("data_units", filled_units)))
}

/// Measures a data unit starting at bit `start` and fills in any missing
/// `next_parse_offset` and `fragment_data_length`.
fn fill_unit_lengths(
    unit: &Structured,
    state: &State,
    start: u64,
) -> std::result::Result<Structured, ConformanceError> {
    let mut scratch = state.clone();
    let mut measurer = Serdes::measurer(start, SerdesOptions::unchecked());
    let measured = measurer.run(&DATA_UNIT, Some(unit), &mut scratch)?;
    let end = measurer.tell().div_ceil(8);
    let unit_start = scratch.unit_start.unwrap_or(start) / 8;

    let mut unit = unit.clone();
    if !parse_code::is_end_of_sequence(scratch.parse_code) {
        if let Some(parse_info) = unit.get_struct("parse_info") {
            if !parse_info.contains("next_parse_offset") {
                let parse_info = parse_info.clone().with("next_parse_offset", end - unit_start);
                unit.set("parse_info", parse_info);
            }
        }
    }

    let data_start = measured
        .get_struct("fragment_parse")
        .and_then(|f| f.offset_of("padding2"));
    if let (Some(fragment), Some(data_start)) = (unit.get_struct("fragment_parse"), data_start) {
        if let Some(header) = fragment.get_struct("fragment_header") {
            if !header.contains("fragment_data_length") {
                let header = header
                    .clone()
                    .with("fragment_data_length", end - data_start / 8);
                let fragment = fragment.clone().with("fragment_header", header);
                unit.set("fragment_parse", fragment);
            }
        }
    }
    Ok(unit)
}

/// A data unit with the given parse code and body.
pub fn data_unit(code: ParseCode, body: Option<Structured>) -> Structured {
    let unit = Structured::new().with(
        "parse_info",
        Structured::new().with("parse_code", u64::from(code.code())),
    );
    match (code.body_name(), body) {
        (Some(name), Some(body)) => unit.with(name, body),
        _ => unit,
    }
}

pub fn sequence_header_unit(header: Structured) -> Structured {
    data_unit(ParseCode::SequenceHeader, Some(header))
}

pub fn end_of_sequence_unit() -> Structured {
    data_unit(ParseCode::EndOfSequence, None)
}

pub fn padding_unit(bytes: Vec<u8>) -> Structured {
    data_unit(
        ParseCode::PaddingData,
        Some(Structured::new().with("bytes", bytes)),
    )
}

/// The decoder state a sequence header sets up.
pub fn sequence_state(header: &Structured) -> Result<State> {
    let mut state = State::new();
    let mut measurer = Serdes::measurer(0, SerdesOptions::unchecked());
    measurer.run(&SEQUENCE_HEADER, Some(header), &mut state)?;
    Ok(state)
}

/// Coding choices for one picture.
#[derive(Debug, Clone)]
pub struct PictureCoding {
    /// Low-delay or high-quality, picture or fragment
    pub parse_code: ParseCode,
    pub wavelet_index: u64,
    /// Horizontal-only filter, written only when it differs from
    /// `wavelet_index` (major version 3 and up)
    pub wavelet_index_ho: u64,
    pub dwt_depth: u64,
    pub dwt_depth_ho: u64,
    pub slices_x: u64,
    pub slices_y: u64,
    /// Low-delay slice size in bytes, as a fraction
    pub slice_bytes_numerator: u64,
    pub slice_bytes_denominator: u64,
    /// High-quality slice prefix length
    pub slice_prefix_bytes: u64,
    /// High-quality slice length unit in bytes
    pub slice_size_scaler: u64,
    /// `None` selects the default matrix for the transform
    pub custom_quant_matrix: Option<Vec<u64>>,
    /// Quantisation index used by every slice
    pub qindex: u64,
}

impl Default for PictureCoding {
    fn default() -> Self {
        Self {
            parse_code: ParseCode::HighQualityPicture,
            wavelet_index: 1,
            wavelet_index_ho: 1,
            dwt_depth: 1,
            dwt_depth_ho: 0,
            slices_x: 1,
            slices_y: 1,
            slice_bytes_numerator: 64,
            slice_bytes_denominator: 1,
            slice_prefix_bytes: 0,
            slice_size_scaler: 1,
            custom_quant_matrix: None,
            qindex: 0,
        }
    }
}

impl PictureCoding {
    /// (12.4) The transform parameters for a stream of `major_version`.
    pub fn transform_parameters(&self, major_version: u64) -> Structured {
        let mut params = Structured::new()
            .with("wavelet_index", self.wavelet_index)
            .with("dwt_depth", self.dwt_depth);
        if major_version >= 3 {
            let asym_index = self.wavelet_index_ho != self.wavelet_index;
            let asym_depth = self.dwt_depth_ho != 0;
            let mut extended = Structured::new().with("asym_transform_index_flag", asym_index);
            if asym_index {
                extended.set("wavelet_index_ho", self.wavelet_index_ho);
            }
            extended.set("asym_transform_flag", asym_depth);
            if asym_depth {
                extended.set("dwt_depth_ho", self.dwt_depth_ho);
            }
            params.set("extended_transform_parameters", extended);
        }

        let mut slices = Structured::new()
            .with("slices_x", self.slices_x)
            .with("slices_y", self.slices_y);
        if parse_code::is_ld(self.parse_code.code()) {
            slices.set("slice_bytes_numerator", self.slice_bytes_numerator);
            slices.set("slice_bytes_denominator", self.slice_bytes_denominator);
        } else {
            slices.set("slice_prefix_bytes", self.slice_prefix_bytes);
            slices.set("slice_size_scaler", self.slice_size_scaler);
        }
        params.set("slice_parameters", slices);

        let quant_matrix = match &self.custom_quant_matrix {
            Some(matrix) => Structured::new().with("custom_quant_matrix", true).with(
                "matrix",
                matrix.iter().map(|&q| Value::from(q)).collect::<Vec<_>>(),
            ),
            None => Structured::new().with("custom_quant_matrix", false),
        };
        params.with("quant_matrix", quant_matrix)
    }

    /// `state` with the picture's transform parameters applied.
    fn apply(&self, state: &State) -> Result<State> {
        let mut state = state.clone();
        state.parse_code = self.parse_code.code();
        let params = self.transform_parameters(state.major_version);
        let mut measurer = Serdes::measurer(0, SerdesOptions::unchecked());
        measurer.run(&TRANSFORM_PARAMETERS, Some(&params), &mut state)?;
        Ok(state)
    }
}

/// Forward transform of one component with the offset removed.
fn analyse(state: &State, picture: &PictureBuffer, c: Component) -> Result<Coefficients> {
    let (width, height) = state.component_dimensions(c);
    if picture.dimensions(c) != (width as usize, height as usize) {
        return Err(Vc2Error::InvalidArg(format!(
            "{:?} plane is {:?}, the sequence requires {}x{}",
            c,
            picture.dimensions(c),
            width,
            height
        )));
    }
    let depth = state.component_depth(c);
    let offset = if depth == 0 { BigInt::zero() } else { pow2(depth - 1) };
    let signed = picture.component(c).map(|v| v - &offset);
    let (padded_width, padded_height) = slice_sizes::padded_dimensions(state, c);
    let padded = pad(&signed, padded_width as usize, padded_height as usize);
    Ok(dwt(&padded, &wavelet_config(state))?)
}

/// Quantises every subband with `qindex`, applying intra DC prediction
/// where the parse code calls for it.
fn quantise(state: &State, coeffs: &Coefficients, qindex: u64) -> Result<Coefficients> {
    let order = subband_order(state.dwt_depth, state.dwt_depth_ho);
    if state.quant_matrix.len() != order.len() {
        return Err(Vc2Error::InvalidArg(
            "no quantisation matrix for this transform".to_string(),
        ));
    }
    let dc = (0, dc_orientation(state));
    let predict = parse_code::using_dc_prediction(state.parse_code);
    let mut quantised = Coefficients::new();
    for (i, key) in order.into_iter().enumerate() {
        let Some(band) = coeffs.get(&key) else {
            continue;
        };
        let qi = u32::try_from(qindex.saturating_sub(state.quant_matrix[i])).unwrap_or(u32::MAX);
        let band = if predict && key == dc {
            quantise_predicted(band, qi)
        } else {
            band.map(|v| forward_quant(v, qi))
        };
        quantised.insert(key, band);
    }
    Ok(quantised)
}

/// (13.4) The DC band is predicted from its reconstructed neighbours in
/// raster order, mirroring the decoder.
fn quantise_predicted(band: &Array2D<BigInt>, qi: u32) -> Array2D<BigInt> {
    let mut quantised = Array2D::new(band.width(), band.height(), BigInt::zero());
    let mut reconstructed = quantised.clone();
    for y in 0..band.height() {
        for x in 0..band.width() {
            let prediction = predict_dc(&reconstructed, x, y);
            let q = forward_quant(&(&band[(y, x)] - &prediction), qi);
            reconstructed[(y, x)] = inverse_quant(&q, qi) + prediction;
            quantised[(y, x)] = q;
        }
    }
    quantised
}

fn slice_values(state: &State, bands: &Coefficients, n: u64, c: Component) -> Vec<Value> {
    let (sx, sy) = slice_sizes::slice_position(state, n);
    let mut values = Vec::new();
    for region in slice_sizes::slice_regions(state, sx, sy, c) {
        let Some(band) = bands.get(&(region.level, region.orientation)) else {
            continue;
        };
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                values.push(Value::from(band[(y as usize, x as usize)].clone()));
            }
        }
    }
    values
}

/// Codes `picture` into slices for the transform described by `state`.
pub fn picture_slices(state: &State, picture: &PictureBuffer, qindex: u64) -> Result<Vec<Structured>> {
    let mut bands = Vec::with_capacity(3);
    for c in Component::ALL {
        let coeffs = analyse(state, picture, c)?;
        bands.push(quantise(state, &coeffs, qindex)?);
    }
    let slice_count = state.slice_count().map_err(|kind| ConformanceError::new(kind, 0))?;
    let mut slices = Vec::new();
    for n in 0..slice_count {
        let y = slice_values(state, &bands[0], n, Component::Y);
        let c1 = slice_values(state, &bands[1], n, Component::C1);
        let c2 = slice_values(state, &bands[2], n, Component::C2);
        let slice = if state.is_ld() {
            let c: Vec<Value> = c1
                .into_iter()
                .zip(c2)
                .flat_map(|(a, b)| [a, b])
                .collect();
            Structured::new()
                .with("qindex", qindex)
                .with("y_block", Structured::new().with("y_transform", y))
                .with("c_block", Structured::new().with("c_transform", c))
        } else {
            let prefix = vec![0u8; usize::try_from(state.slice_prefix_bytes).unwrap_or(0)];
            Structured::new()
                .with("prefix_bytes", prefix)
                .with("qindex", qindex)
                .with("y_block", Structured::new().with("y_transform", y))
                .with("c1_block", Structured::new().with("c1_transform", c1))
                .with("c2_block", Structured::new().with("c2_transform", c2))
        };
        slices.push(slice);
    }
    Ok(slices)
}

fn slice_list_name(state: &State) -> &'static str {
    if state.is_ld() { "ld_slices" } else { "hq_slices" }
}

/// A complete picture data unit. `state` is the state after the sequence
/// header.
pub fn picture_unit(state: &State, coding: &PictureCoding, picture: &PictureBuffer) -> Result<Structured> {
    let coded = coding.apply(state)?;
    let slices: Vec<Value> = picture_slices(&coded, picture, coding.qindex)?
        .into_iter()
        .map(Value::from)
        .collect();
    let transform = Structured::new()
        .with("transform_parameters", coding.transform_parameters(state.major_version))
        .with(
            "transform_data",
            Structured::new().with(slice_list_name(&coded), slices),
        );
    let body = Structured::new()
        .with(
            "picture_header",
            Structured::new().with("picture_number", picture.picture_number),
        )
        .with("wavelet_transform", transform);
    Ok(data_unit(coding.parse_code, Some(body)))
}

/// The fragment data units of one picture: a transform parameters fragment
/// followed by fragments of at most `slices_per_fragment` slices.
pub fn fragment_units(
    state: &State,
    coding: &PictureCoding,
    picture: &PictureBuffer,
    slices_per_fragment: usize,
) -> Result<Vec<Structured>> {
    if slices_per_fragment == 0 {
        return Err(Vc2Error::InvalidArg("fragments must hold at least one slice".to_string()));
    }
    let coded = coding.apply(state)?;
    let slices = picture_slices(&coded, picture, coding.qindex)?;
    let header = |count: usize| {
        Structured::new()
            .with("picture_number", picture.picture_number)
            .with("fragment_slice_count", count as u64)
    };

    let mut units = vec![data_unit(
        coding.parse_code,
        Some(
            Structured::new()
                .with("fragment_header", header(0))
                .with("transform_parameters", coding.transform_parameters(state.major_version)),
        ),
    )];
    for (i, chunk) in slices.chunks(slices_per_fragment).enumerate() {
        let first = (i * slices_per_fragment) as u64;
        let (x, y) = slice_sizes::slice_position(&coded, first);
        let list: Vec<Value> = chunk.iter().cloned().map(Value::from).collect();
        let body = Structured::new()
            .with(
                "fragment_header",
                header(chunk.len())
                    .with("fragment_x_offset", x)
                    .with("fragment_y_offset", y),
            )
            .with(
                "fragment_data",
                Structured::new().with(slice_list_name(&coded), list),
            );
        units.push(data_unit(coding.parse_code, Some(body)));
    }
    Ok(units)
}
