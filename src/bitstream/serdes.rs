// src/bitstream/serdes.rs

//! The serdes engine.
//!
//! [`Serdes`] walks a [`Description`] in one of three modes:
//!
//! - `Deserialize` reads every field from a [`BitReader`] into a new
//!   [`Structured`] value.
//! - `Serialize` takes a populated value, fills in absent auto-fill fields and
//!   writes the result through a [`BitWriter`].
//! - `Measure` does the same as `Serialize` against a [`BitCounter`], which
//!   only advances a cursor.
//!
//! In every mode the engine returns the structured value it traversed, so the
//! caller of a write sees the auto-filled fields too. Check hooks run when
//! constraint checking is enabled; update hooks always run so that the state
//! evolves identically whichever way a stream is being traversed.

use bitvec::prelude::*;
#[cfg(feature = "serdes-trace")]
use log::trace;
use num_bigint::BigInt;
use num_traits::Zero;

use crate::bitstream::description::{AutoFill, Description, Field, Kind, Scope, Width};
use crate::bitstream::io::{BitCounter, BitIoError, BitReader, BitSink, BitWriter, Bits};
use crate::bitstream::value::{Structured, Value};
use crate::decoder::error::{ConformanceError, ErrorKind, Violation};
use crate::decoder::state::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Deserialize,
    Serialize,
    Measure,
}

/// Checking behaviour of the serdes engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerdesOptions {
    /// Run the constraint checks attached to fields.
    pub check_constraints: bool,
    /// Compare explicitly supplied (or decoded) auto-fill fields against their
    /// computed values.
    pub check_autofill: bool,
    /// Reject non-zero byte alignment padding.
    pub strict_padding: bool,
}

impl Default for SerdesOptions {
    fn default() -> Self {
        SerdesOptions {
            check_constraints: true,
            check_autofill: true,
            strict_padding: true,
        }
    }
}

impl SerdesOptions {
    /// No checks at all, used when only sizes are wanted.
    pub fn unchecked() -> Self {
        SerdesOptions {
            check_constraints: false,
            check_autofill: false,
            strict_padding: false,
        }
    }
}

enum Cursor<'a> {
    Read(BitReader<'a>),
    Write(BitWriter),
    Measure(BitCounter),
}

pub struct Serdes<'a> {
    cursor: Cursor<'a>,
    options: SerdesOptions,
    routines: Vec<&'static str>,
}

impl<'a> Serdes<'a> {
    pub fn reader(data: &'a [u8], options: SerdesOptions) -> Self {
        Serdes {
            cursor: Cursor::Read(BitReader::new(data)),
            options,
            routines: Vec::new(),
        }
    }

    pub fn writer(options: SerdesOptions) -> Self {
        Serdes {
            cursor: Cursor::Write(BitWriter::new()),
            options,
            routines: Vec::new(),
        }
    }

    /// A measuring engine whose virtual cursor starts at bit `start`.
    pub fn measurer(start: u64, options: SerdesOptions) -> Self {
        Serdes {
            cursor: Cursor::Measure(BitCounter::starting_at(start)),
            options,
            routines: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        match self.cursor {
            Cursor::Read(_) => Mode::Deserialize,
            Cursor::Write(_) => Mode::Serialize,
            Cursor::Measure(_) => Mode::Measure,
        }
    }

    pub fn options(&self) -> &SerdesOptions {
        &self.options
    }

    /// Current bit offset.
    pub fn tell(&self) -> u64 {
        match &self.cursor {
            Cursor::Read(r) => r.tell(),
            Cursor::Write(w) => w.tell(),
            Cursor::Measure(c) => c.tell(),
        }
    }

    /// The underlying reader, in `Deserialize` mode.
    pub fn source(&self) -> Option<&BitReader<'a>> {
        match &self.cursor {
            Cursor::Read(r) => Some(r),
            _ => None,
        }
    }

    /// The bytes written so far, padded to a whole byte. Empty unless in
    /// `Serialize` mode.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.cursor {
            Cursor::Write(w) => w.into_bytes(),
            _ => Vec::new(),
        }
    }

    /// Pushes a routine name for error context, for callers driving the
    /// engine from outside a description.
    pub fn enter(&mut self, routine: &'static str) {
        self.routines.push(routine);
    }

    pub fn leave(&mut self) {
        self.routines.pop();
    }

    pub fn routines(&self) -> &[&'static str] {
        &self.routines
    }

    /// Creates an error at `offset` carrying the current routine stack.
    pub fn error(&self, kind: ErrorKind, offset: u64) -> ConformanceError {
        ConformanceError::new(kind, offset).with_routines(&self.routines)
    }

    /// Traverses `description`. `input` is required when writing or
    /// measuring and ignored when reading.
    pub fn run(
        &mut self,
        description: &'static Description,
        input: Option<&Structured>,
        state: &mut State,
    ) -> Result<Structured, ConformanceError> {
        let depth = self.routines.len();
        let input = match self.mode() {
            Mode::Deserialize => None,
            _ => Some(input.ok_or_else(|| {
                self.error(
                    ErrorKind::InvalidValue {
                        field: description.name,
                        expected: "a structure",
                        found: "nothing",
                    },
                    self.tell(),
                )
            })?),
        };
        let result = self.traverse(description, input, state, None, None);
        self.routines.truncate(depth);
        result
    }

    fn traverse(
        &mut self,
        description: &'static Description,
        input: Option<&Structured>,
        state: &mut State,
        parent: Option<&Scope<'_>>,
        index: Option<usize>,
    ) -> Result<Structured, ConformanceError> {
        self.routines.push(description.name);
        let mut out = Structured::new();
        for field in description.fields {
            let start = self.tell();
            let value = {
                let scope = Scope {
                    routine: description.name,
                    value: &out,
                    input,
                    index,
                    offset: start,
                    parent,
                };
                if let Some(presence) = &field.presence {
                    if !presence.evaluate(&scope, state) {
                        continue;
                    }
                }
                let value = self.field(field, &scope, state)?;
                #[cfg(feature = "serdes-trace")]
                trace!("{:>8} {}.{} = {:?}", start, description.name, field.name, value);
                self.run_hooks(field, &scope, state, &value, start)?;
                value
            };
            out.set_at(field.name, value, start);
        }
        self.routines.pop();
        Ok(out)
    }

    fn run_hooks(
        &self,
        field: &Field,
        scope: &Scope<'_>,
        state: &mut State,
        value: &Value,
        start: u64,
    ) -> Result<(), ConformanceError> {
        let len = self.tell() - start;
        if self.options.check_constraints {
            if let Some(check) = field.check {
                check(scope, state, value).map_err(|k| self.error(k, start).with_region(len))?;
            }
        }
        if let Some(update) = field.update {
            update(scope, state, value).map_err(|k| self.error(k, start).with_region(len))?;
        }
        Ok(())
    }

    fn field(
        &mut self,
        field: &Field,
        scope: &Scope<'_>,
        state: &mut State,
    ) -> Result<Value, ConformanceError> {
        if self.mode() == Mode::Deserialize {
            let value = self.read_kind(field.name, &field.kind, scope, state)?;
            if let Some(AutoFill::Stream {
                fill: Some(fill),
                verify: true,
            }) = field.autofill
            {
                if self.options.check_autofill {
                    if let Some(expected) = fill(scope, state) {
                        self.compare_autofill(field.name, expected, &value, scope.offset)?;
                    }
                }
            }
            return Ok(value);
        }

        let computed;
        let value = match (scope.input_value(field.name), field.autofill) {
            (Some(given), Some(autofill)) => {
                if self.options.check_autofill {
                    if let Some(expected) = self.expected_value(autofill, scope, state)? {
                        self.compare_autofill(field.name, expected, given, scope.offset)?;
                    }
                }
                Some(given)
            }
            (Some(given), None) => Some(given),
            (None, Some(autofill)) => {
                computed = self.autofill_value(field.name, autofill, scope, state)?;
                Some(&computed)
            }
            (None, None) if field.kind.is_padding() => None,
            (None, None) => return Err(self.missing(field.name, scope, scope.offset)),
        };
        self.write_kind(field.name, &field.kind, value, scope, state)
    }

    /// The value an explicitly supplied auto-fill field must agree with.
    fn expected_value(
        &self,
        autofill: AutoFill,
        scope: &Scope<'_>,
        state: &State,
    ) -> Result<Option<BigInt>, ConformanceError> {
        match autofill {
            AutoFill::Derived(derive) => derive(scope, state)
                .map(Some)
                .map_err(|k| self.error(k, scope.offset)),
            AutoFill::Default(_) => Ok(None),
            AutoFill::Stream { fill, verify } => {
                Ok(fill.filter(|_| verify).and_then(|f| f(scope, state)))
            }
        }
    }

    fn autofill_value(
        &self,
        name: &'static str,
        autofill: AutoFill,
        scope: &Scope<'_>,
        state: &State,
    ) -> Result<Value, ConformanceError> {
        match autofill {
            AutoFill::Derived(derive) | AutoFill::Default(derive) => derive(scope, state)
                .map(Value::Int)
                .map_err(|k| self.error(k, scope.offset)),
            AutoFill::Stream { fill, .. } => {
                match fill.and_then(|f| f(scope, state)) {
                    Some(v) => Ok(Value::Int(v)),
                    // Placeholder with the same width; the stream driver
                    // measures before it writes.
                    None if self.mode() == Mode::Measure => Ok(Value::Int(BigInt::from(0))),
                    None => Err(self.error(
                        ErrorKind::UnknownField {
                            field: name,
                            routine: scope.routine,
                        },
                        scope.offset,
                    )),
                }
            }
        }
    }

    fn compare_autofill(
        &self,
        name: &'static str,
        expected: BigInt,
        given: &Value,
        offset: u64,
    ) -> Result<(), ConformanceError> {
        let encoded = given
            .as_int()
            .ok_or_else(|| self.invalid(name, "an integer", given, offset))?;
        if *encoded != expected {
            return Err(self.error(
                ErrorKind::AutoFillMismatch {
                    field: name,
                    computed: expected,
                    encoded: encoded.clone(),
                },
                offset,
            ));
        }
        Ok(())
    }

    fn invalid(
        &self,
        name: &'static str,
        expected: &'static str,
        found: &Value,
        offset: u64,
    ) -> ConformanceError {
        self.error(
            ErrorKind::InvalidValue {
                field: name,
                expected,
                found: found.type_name(),
            },
            offset,
        )
    }

    fn io_error(&self, err: BitIoError, name: &'static str) -> ConformanceError {
        match err {
            BitIoError::EndOfStream { bit_offset } => self.error(ErrorKind::EndOfStream, bit_offset),
            other => self.error(
                ErrorKind::Unencodable {
                    field: name,
                    reason: other.to_string(),
                },
                self.tell(),
            ),
        }
    }

    fn width(
        &self,
        width: Width,
        scope: &Scope<'_>,
        state: &State,
    ) -> Result<u64, ConformanceError> {
        match width {
            Width::Fixed(n) => Ok(n),
            Width::Field(name) => scope
                .require_u64(name)
                .map_err(|k| self.error(k, scope.offset)),
            Width::Computed(compute) => {
                compute(scope, state).map_err(|k| self.error(k, scope.offset))
            }
        }
    }

    /// True inside a bounded block with no bits left. Exp-Golomb values read
    /// there are zero and zeros written there are dropped.
    fn block_exhausted(&mut self) -> bool {
        match &mut self.cursor {
            Cursor::Read(r) => r.block_exhausted(),
            Cursor::Write(w) => w.block_exhausted(),
            Cursor::Measure(c) => c.block_exhausted(),
        }
    }

    /// Runs a read primitive against the reader.
    fn read_with<T>(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&mut BitReader<'a>) -> Result<T, BitIoError>,
    ) -> Result<T, ConformanceError> {
        let offset = self.tell();
        let result = match &mut self.cursor {
            Cursor::Read(r) => op(r),
            _ => Err(BitIoError::EndOfStream { bit_offset: offset }),
        };
        result.map_err(|e| self.io_error(e, name))
    }

    /// Runs a write primitive against the writer or counter.
    fn write_with<T>(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&mut dyn BitSink) -> Result<T, BitIoError>,
    ) -> Result<T, ConformanceError> {
        let result = match &mut self.cursor {
            Cursor::Write(w) => op(w),
            Cursor::Measure(c) => op(c),
            Cursor::Read(r) => Err(BitIoError::EndOfStream {
                bit_offset: r.tell(),
            }),
        };
        result.map_err(|e| self.io_error(e, name))
    }

    fn read_kind(
        &mut self,
        name: &'static str,
        kind: &Kind,
        scope: &Scope<'_>,
        state: &mut State,
    ) -> Result<Value, ConformanceError> {
        let value = match *kind {
            Kind::Bool => Value::Bool(self.read_with(name, |r| r.read_bool())?),
            Kind::UInt => Value::Int(self.read_with(name, |r| r.read_uint())?),
            Kind::SInt => Value::Int(self.read_with(name, |r| r.read_sint())?),
            Kind::NBits(width) => {
                let bits = self.width(width, scope, state)?;
                Value::Int(self.read_with(name, |r| r.read_nbits(bits))?)
            }
            Kind::UIntLit(num_bytes) => {
                Value::Int(self.read_with(name, |r| r.read_uint_lit(num_bytes))?)
            }
            Kind::Bytes(width) => {
                let count = self.width(width, scope, state)?;
                Value::Bytes(self.read_with(name, |r| r.read_bytes(count))?)
            }
            Kind::ByteAlign => {
                let offset = self.tell();
                let bits = self.read_with(name, |r| Ok(r.byte_align()))?;
                if self.options.strict_padding && bits.any() {
                    return Err(self.error(
                        ErrorKind::NonCanonicalEncoding {
                            field: name,
                            bits: bits_to_string(&bits),
                        },
                        offset,
                    )
                    .with_region(bits.len() as u64));
                }
                Value::Bits(bits)
            }
            Kind::BlockPadding => Value::Bits(self.read_with(name, |r| r.flush_block())?),
            Kind::Nested(description) => {
                Value::Struct(self.traverse(description, None, state, Some(scope), None)?)
            }
            Kind::List { count, element } => {
                let count = self.width(count, scope, state)?;
                let implicit_zeros = matches!(element, Kind::UInt | Kind::SInt);
                let mut items = Vec::new();
                for i in 0..count {
                    // The rest of the list lies past the end of the block
                    if implicit_zeros && self.block_exhausted() {
                        break;
                    }
                    let element_scope = Scope {
                        index: Some(i as usize),
                        ..*scope
                    };
                    items.push(self.read_kind(name, element, &element_scope, state)?);
                }
                Value::List(items)
            }
            Kind::Bounded { bits, body } => {
                let bits = self.width(bits, scope, state)?;
                self.read_with(name, |r| {
                    r.bounded_block_begin(bits);
                    Ok(())
                })?;
                let value = self.traverse(body, None, state, Some(scope), None)?;
                self.read_with(name, |r| {
                    r.bounded_block_end();
                    Ok(())
                })?;
                Value::Struct(value)
            }
        };
        Ok(value)
    }

    fn write_kind(
        &mut self,
        name: &'static str,
        kind: &Kind,
        value: Option<&Value>,
        scope: &Scope<'_>,
        state: &mut State,
    ) -> Result<Value, ConformanceError> {
        let offset = self.tell();
        let expect_int = |v: Option<&Value>| -> Result<BigInt, ConformanceError> {
            match v {
                Some(Value::Int(n)) => Ok(n.clone()),
                Some(other) => Err(self.invalid(name, "an integer", other, offset)),
                None => Err(self.missing(name, scope, offset)),
            }
        };
        let written = match *kind {
            Kind::Bool => match value {
                Some(Value::Bool(b)) => {
                    let b = *b;
                    self.write_with(name, |w| w.write_bool(b))?;
                    Value::Bool(b)
                }
                Some(other) => return Err(self.invalid(name, "a boolean", other, offset)),
                None => return Err(self.missing(name, scope, offset)),
            },
            Kind::UInt => {
                let n = expect_int(value)?;
                self.write_with(name, |w| w.write_uint(&n))?;
                Value::Int(n)
            }
            Kind::SInt => {
                let n = expect_int(value)?;
                self.write_with(name, |w| w.write_sint(&n))?;
                Value::Int(n)
            }
            Kind::NBits(width) => {
                let n = expect_int(value)?;
                let bits = self.width(width, scope, state)?;
                self.write_with(name, |w| w.write_nbits(bits, &n))?;
                Value::Int(n)
            }
            Kind::UIntLit(num_bytes) => {
                let n = expect_int(value)?;
                self.write_with(name, |w| w.write_uint_lit(num_bytes, &n))?;
                Value::Int(n)
            }
            Kind::Bytes(_) => match value {
                Some(Value::Bytes(bytes)) => {
                    self.write_with(name, |w| w.write_bytes(bytes))?;
                    Value::Bytes(bytes.clone())
                }
                Some(other) => return Err(self.invalid(name, "a byte string", other, offset)),
                None => return Err(self.missing(name, scope, offset)),
            },
            Kind::ByteAlign => {
                let needed = self.write_with(name, |w| Ok(w.bits_to_byte_boundary()))?;
                let bits = padding_bits(value, needed).map_err(|found| {
                    self.invalid(name, "a bit string", found, offset)
                })?;
                self.write_with(name, |w| {
                    w.write_bits(&bits);
                    Ok(())
                })?;
                Value::Bits(bits)
            }
            Kind::BlockPadding => {
                let left = self.write_with(name, |w| Ok(w.bits_left().unwrap_or(0)))?;
                let bits = padding_bits(value, left).map_err(|found| {
                    self.invalid(name, "a bit string", found, offset)
                })?;
                self.write_with(name, |w| {
                    for bit in bits.iter().by_vals() {
                        w.write_bit(bit)?;
                    }
                    Ok(())
                })?;
                Value::Bits(bits)
            }
            Kind::Nested(description) => {
                let input = self.expect_struct(name, value, scope, offset)?;
                Value::Struct(self.traverse(description, Some(input), state, Some(scope), None)?)
            }
            Kind::List { count, element } => {
                let items = match value {
                    Some(Value::List(items)) => items,
                    Some(other) => return Err(self.invalid(name, "a list", other, offset)),
                    None => return Err(self.missing(name, scope, offset)),
                };
                let count = self.width(count, scope, state)?;
                let implicit_zeros = matches!(element, Kind::UInt | Kind::SInt);
                let wrong_length = |given: usize| ErrorKind::Unencodable {
                    field: name,
                    reason: format!("{given} elements given where {count} are read"),
                };
                if items.len() as u64 > count {
                    return Err(self.error(wrong_length(items.len()), offset));
                }
                let mut written = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if implicit_zeros
                        && self.block_exhausted()
                        && items[i..].iter().all(|v| v.as_int().is_some_and(Zero::is_zero))
                    {
                        break;
                    }
                    let element_scope = Scope {
                        index: Some(i),
                        ..*scope
                    };
                    written.push(self.write_kind(name, element, Some(item), &element_scope, state)?);
                }
                // Zeros past the end of a bounded block carry no bits
                if (written.len() as u64) < count && !(implicit_zeros && self.block_exhausted()) {
                    return Err(self.error(wrong_length(items.len()), offset));
                }
                Value::List(written)
            }
            Kind::Bounded { bits, body } => {
                let input = self.expect_struct(name, value, scope, offset)?;
                let bits = self.width(bits, scope, state)?;
                self.write_with(name, |w| {
                    w.bounded_block_begin(bits);
                    Ok(())
                })?;
                let out = self.traverse(body, Some(input), state, Some(scope), None)?;
                self.write_with(name, |w| {
                    // Keep the block's full width even if the body did not fill it
                    for _ in 0..w.bounded_block_end() {
                        w.push_bit(false);
                    }
                    Ok(())
                })?;
                Value::Struct(out)
            }
        };
        Ok(written)
    }

    fn expect_struct<'v>(
        &self,
        name: &'static str,
        value: Option<&'v Value>,
        scope: &Scope<'_>,
        offset: u64,
    ) -> Result<&'v Structured, ConformanceError> {
        match value {
            Some(Value::Struct(s)) => Ok(s),
            Some(other) => Err(self.invalid(name, "a structure", other, offset)),
            None => Err(self.missing(name, scope, offset)),
        }
    }

    fn missing(&self, name: &'static str, scope: &Scope<'_>, offset: u64) -> ConformanceError {
        self.error(
            ErrorKind::UnknownField {
                field: name,
                routine: scope.routine,
            },
            offset,
        )
    }
}

/// The padding bits to write: the supplied bits when they have the right
/// length, zeros otherwise.
fn padding_bits<'v>(value: Option<&'v Value>, len: u64) -> Result<Bits, &'v Value> {
    match value {
        Some(Value::Bits(bits)) if bits.len() as u64 == len => Ok(bits.clone()),
        Some(Value::Bits(_)) | None => Ok(bitvec![u8, Msb0; 0; len as usize]),
        Some(other) => Err(other),
    }
}

fn bits_to_string(bits: &BitSlice<u8, Msb0>) -> String {
    bits.iter().by_vals().map(|b| if b { '1' } else { '0' }).collect()
}

/// Reads one structure from `data`.
pub fn deserialize(
    description: &'static Description,
    data: &[u8],
    state: &mut State,
    options: SerdesOptions,
) -> Result<Structured, ConformanceError> {
    Serdes::reader(data, options).run(description, None, state)
}

/// Writes one structure, returning its bytes and the auto-filled value.
pub fn serialize(
    description: &'static Description,
    value: &Structured,
    state: &mut State,
    options: SerdesOptions,
) -> Result<(Vec<u8>, Structured), ConformanceError> {
    let mut serdes = Serdes::writer(options);
    let filled = serdes.run(description, Some(value), state)?;
    Ok((serdes.into_bytes(), filled))
}

/// Length in bits of a structure when written from bit offset 0.
pub fn measure(
    description: &'static Description,
    value: &Structured,
    state: &mut State,
    options: SerdesOptions,
) -> Result<u64, ConformanceError> {
    let mut serdes = Serdes::measurer(0, options);
    serdes.run(description, Some(value), state)?;
    Ok(serdes.tell())
}

/// Converts an integer to `u64` or reports it as too large.
pub fn to_u64(field: &'static str, value: &BigInt) -> Result<u64, ErrorKind> {
    u64::try_from(value).map_err(|_| {
        Violation::ValueTooLarge {
            field,
            value: value.clone(),
        }
        .into()
    })
}
