// src/bitstream/io.rs

//! Bit-level cursors over byte buffers (A.2, A.3, A.4).
//!
//! [`BitReader`] consumes a byte slice MSB first. [`BitWriter`] produces
//! bytes and [`BitCounter`] only advances a virtual cursor; both implement
//! [`BitSink`] so that writing and measuring share one code path.
//!
//! Variable-length integers use the interleaved exp-Golomb code of (A.4.3):
//! the binary digits of `value + 1` after the leading one are each preceded
//! by a `0` flag bit and the code is terminated by a `1`.
//!
//! Bounded blocks (A.4.2) restrict a reader or writer to a fixed number of
//! bits. Reading past the end of a block yields `1` bits without consuming
//! input; writing a `1` past the end is dropped while writing a `0` fails.

use bitvec::prelude::*;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed, Zero};
use thiserror::Error;

pub type Bits = BitVec<u8, Msb0>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitIoError {
    #[error("read past the end of the stream at bit {bit_offset}")]
    EndOfStream { bit_offset: u64 },

    #[error("cannot write a 0 bit past the end of a bounded block at bit {bit_offset}")]
    BoundedBlockOverrun { bit_offset: u64 },

    #[error("value {value} does not fit in {bits} bits")]
    ValueTooWide { value: BigInt, bits: u64 },

    #[error("negative value {value} cannot be written as an unsigned code")]
    NegativeValue { value: BigInt },
}

/// Length in bits of the unsigned exp-Golomb code for `value`.
pub fn uint_length(value: &BigInt) -> u64 {
    let v: BigInt = value.abs() + 1u32;
    2 * (v.bits() - 1) + 1
}

/// Length in bits of the signed exp-Golomb code for `value`.
pub fn sint_length(value: &BigInt) -> u64 {
    if value.is_zero() {
        1
    } else {
        uint_length(value) + 1
    }
}

/// Bit `index` (0 = least significant) of a non-negative integer.
fn bit_of(bytes_be: &[u8], index: u64) -> bool {
    let byte = (index / 8) as usize;
    if byte >= bytes_be.len() {
        return false;
    }
    (bytes_be[bytes_be.len() - 1 - byte] >> (index % 8)) & 1 == 1
}

fn magnitude_bytes(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

/// Reads bits MSB-first from a byte slice.
pub struct BitReader<'a> {
    data: &'a [u8],
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
    bits_left: Option<u64>,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            bits: data.view_bits::<Msb0>(),
            pos: 0,
            bits_left: None,
        }
    }

    /// Current absolute bit offset.
    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    pub fn len_bits(&self) -> u64 {
        self.bits.len() as u64
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// True once every bit of the buffer has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.bits.len()
    }

    /// Bits left in the active bounded block, or in the buffer otherwise.
    pub fn bits_remaining(&self) -> u64 {
        match self.bits_left {
            Some(left) => left,
            None => self.len_bits().saturating_sub(self.tell()),
        }
    }

    /// True while a bounded block is active and has no bits left.
    pub fn block_exhausted(&self) -> bool {
        self.bits_left == Some(0)
    }

    /// The raw bytes between two byte offsets, clamped to the buffer.
    pub fn bytes(&self, start: u64, end: u64) -> &'a [u8] {
        let len = self.data.len();
        let start = (start as usize).min(len);
        let end = (end as usize).clamp(start, len);
        &self.data[start..end]
    }

    fn read_raw_bit(&mut self) -> Result<bool, BitIoError> {
        match self.bits.get(self.pos) {
            Some(bit) => {
                let bit = *bit;
                self.pos += 1;
                Ok(bit)
            }
            None => Err(BitIoError::EndOfStream {
                bit_offset: self.tell(),
            }),
        }
    }

    /// (A.3.2) / (A.4.2) Reads one bit, honouring any active bounded block.
    pub fn read_bit(&mut self) -> Result<bool, BitIoError> {
        if self.bits_left == Some(0) {
            return Ok(true);
        }
        let bit = self.read_raw_bit()?;
        if let Some(left) = self.bits_left.as_mut() {
            *left -= 1;
        }
        Ok(bit)
    }

    pub fn read_bool(&mut self) -> Result<bool, BitIoError> {
        self.read_bit()
    }

    /// (A.3.3) Reads an `n`-bit unsigned integer, MSB first.
    pub fn read_nbits(&mut self, n: u64) -> Result<BigInt, BitIoError> {
        let mut value = BigInt::zero();
        for _ in 0..n {
            value <<= 1u32;
            if self.read_bit()? {
                value += 1u32;
            }
        }
        Ok(value)
    }

    /// (A.3.4) Reads an `n`-byte unsigned integer.
    pub fn read_uint_lit(&mut self, num_bytes: u64) -> Result<BigInt, BitIoError> {
        self.read_nbits(8 * num_bytes)
    }

    /// (A.4.3) Reads an unsigned interleaved exp-Golomb code.
    pub fn read_uint(&mut self) -> Result<BigInt, BitIoError> {
        let mut value = BigInt::one();
        while !self.read_bit()? {
            value <<= 1u32;
            if self.read_bit()? {
                value += 1u32;
            }
        }
        Ok(value - 1u32)
    }

    /// (A.4.4) Reads a signed interleaved exp-Golomb code.
    pub fn read_sint(&mut self) -> Result<BigInt, BitIoError> {
        let value = self.read_uint()?;
        if !value.is_zero() && self.read_bit()? {
            Ok(-value)
        } else {
            Ok(value)
        }
    }

    /// Reads `count` whole bytes. The result grows as bytes arrive so that a
    /// bogus count fails at the end of the stream rather than allocating.
    pub fn read_bytes(&mut self, count: u64) -> Result<Vec<u8>, BitIoError> {
        let mut bytes = Vec::new();
        for _ in 0..count {
            let mut byte = 0u8;
            for _ in 0..8 {
                byte = (byte << 1) | u8::from(self.read_bit()?);
            }
            bytes.push(byte);
        }
        Ok(bytes)
    }

    /// (A.2.4) Advances to the next byte boundary and returns the skipped
    /// bits so the caller can validate them.
    pub fn byte_align(&mut self) -> Bits {
        let mut skipped = Bits::new();
        while !self.is_byte_aligned() {
            // Never past the end: the buffer is a whole number of bytes.
            match self.read_raw_bit() {
                Ok(bit) => skipped.push(bit),
                Err(_) => break,
            }
        }
        skipped
    }

    /// Reads `n` raw bits, ignoring bounded blocks.
    pub fn read_bits(&mut self, n: u64) -> Result<Bits, BitIoError> {
        let mut bits = Bits::new();
        for _ in 0..n {
            bits.push(self.read_raw_bit()?);
        }
        Ok(bits)
    }

    /// (A.4.2) Starts a bounded block of `bits` bits.
    pub fn bounded_block_begin(&mut self, bits: u64) {
        self.bits_left = Some(bits);
    }

    /// Reads all bits remaining in the active block (`flush_inputb`).
    pub fn flush_block(&mut self) -> Result<Bits, BitIoError> {
        let left = self.bits_left.unwrap_or(0);
        let mut bits = Bits::new();
        for _ in 0..left {
            bits.push(self.read_raw_bit()?);
            if let Some(l) = self.bits_left.as_mut() {
                *l -= 1;
            }
        }
        Ok(bits)
    }

    /// Ends the active bounded block.
    pub fn bounded_block_end(&mut self) {
        self.bits_left = None;
    }
}

/// A destination for bits: either a real buffer or a counter.
pub trait BitSink {
    /// Current absolute bit offset.
    fn tell(&self) -> u64;

    /// Appends one bit, ignoring bounded blocks.
    fn push_bit(&mut self, bit: bool);

    /// Bits left in the active bounded block, if one is active.
    fn bits_left(&mut self) -> &mut Option<u64>;

    fn block_exhausted(&mut self) -> bool {
        *self.bits_left() == Some(0)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), BitIoError> {
        let offset = self.tell();
        match self.bits_left() {
            Some(0) => {
                return if bit {
                    Ok(())
                } else {
                    Err(BitIoError::BoundedBlockOverrun { bit_offset: offset })
                };
            }
            Some(left) => *left -= 1,
            None => {}
        }
        self.push_bit(bit);
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<(), BitIoError> {
        self.write_bit(value)
    }

    /// Writes `value` as an `n`-bit unsigned integer, MSB first.
    fn write_nbits(&mut self, n: u64, value: &BigInt) -> Result<(), BitIoError> {
        if value.is_negative() {
            return Err(BitIoError::NegativeValue {
                value: value.clone(),
            });
        }
        if value.bits() > n {
            return Err(BitIoError::ValueTooWide {
                value: value.clone(),
                bits: n,
            });
        }
        let bytes = magnitude_bytes(value.magnitude());
        for i in (0..n).rev() {
            self.write_bit(bit_of(&bytes, i))?;
        }
        Ok(())
    }

    fn write_uint_lit(&mut self, num_bytes: u64, value: &BigInt) -> Result<(), BitIoError> {
        self.write_nbits(8 * num_bytes, value)
    }

    /// Writes a canonical unsigned interleaved exp-Golomb code.
    fn write_uint(&mut self, value: &BigInt) -> Result<(), BitIoError> {
        if value.is_negative() {
            return Err(BitIoError::NegativeValue {
                value: value.clone(),
            });
        }
        let v: BigInt = value + 1u32;
        let bytes = magnitude_bytes(v.magnitude());
        for i in (0..v.bits() - 1).rev() {
            self.write_bit(false)?;
            self.write_bit(bit_of(&bytes, i))?;
        }
        self.write_bit(true)
    }

    /// Writes a canonical signed interleaved exp-Golomb code.
    fn write_sint(&mut self, value: &BigInt) -> Result<(), BitIoError> {
        self.write_uint(&value.abs())?;
        if !value.is_zero() {
            self.write_bit(value.is_negative())?;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BitIoError> {
        for &byte in bytes {
            for i in (0..8).rev() {
                self.write_bit((byte >> i) & 1 == 1)?;
            }
        }
        Ok(())
    }

    /// Writes raw bits, ignoring bounded blocks.
    fn write_bits(&mut self, bits: &BitSlice<u8, Msb0>) {
        for bit in bits.iter().by_vals() {
            self.push_bit(bit);
        }
    }

    /// Number of bits needed to reach the next byte boundary.
    fn bits_to_byte_boundary(&self) -> u64 {
        (8 - self.tell() % 8) % 8
    }

    fn bounded_block_begin(&mut self, bits: u64) {
        *self.bits_left() = Some(bits);
    }

    /// Ends the active block, returning the number of unused bits.
    fn bounded_block_end(&mut self) -> u64 {
        self.bits_left().take().unwrap_or(0)
    }
}

/// Writes bits MSB-first into a growing byte buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    bits: Bits,
    bits_left: Option<u64>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pads the final partial byte with zero bits.
    pub fn flush(&mut self) {
        while self.bits.len() % 8 != 0 {
            self.bits.push(false);
        }
    }

    /// Flushes and returns the written bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.bits.into_vec()
    }
}

impl BitSink for BitWriter {
    fn tell(&self) -> u64 {
        self.bits.len() as u64
    }

    fn push_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    fn bits_left(&mut self) -> &mut Option<u64> {
        &mut self.bits_left
    }
}

/// A virtual cursor used to measure structures without producing bytes.
#[derive(Debug, Default)]
pub struct BitCounter {
    pos: u64,
    bits_left: Option<u64>,
}

impl BitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter whose cursor starts at `pos`, so that alignment padding is
    /// measured as it would be written there.
    pub fn starting_at(pos: u64) -> Self {
        BitCounter {
            pos,
            bits_left: None,
        }
    }
}

impl BitSink for BitCounter {
    fn tell(&self) -> u64 {
        self.pos
    }

    fn push_bit(&mut self, _bit: bool) {
        self.pos += 1;
    }

    fn bits_left(&mut self) -> &mut Option<u64> {
        &mut self.bits_left
    }
}
