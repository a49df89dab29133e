// src/bitstream/index.rs

//! Locating data units without decoding them.
//!
//! Walks the `next_parse_offset` chain of parse info headers. Used by viewer
//! tooling to jump to a data unit; it performs no conformance checking.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use log::debug;

use crate::tables::{self, ParseCode};
use crate::{Result, Vc2Error};

/// One parse info header as found in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitIndexEntry {
    /// Byte offset of the parse info prefix
    pub offset: u64,
    pub parse_code: u8,
    pub next_parse_offset: u32,
    pub previous_parse_offset: u32,
}

impl UnitIndexEntry {
    pub fn kind(&self) -> Option<ParseCode> {
        ParseCode::from_u8(self.parse_code)
    }
}

/// Reads parse info headers from a byte stream.
pub struct UnitIndexer<R: Read + Seek> {
    reader: R,
}

impl<R: Read + Seek> UnitIndexer<R> {
    pub fn new(reader: R) -> Self {
        UnitIndexer { reader }
    }

    /// The header at the current position, or `None` at the end of the
    /// stream.
    pub fn next_unit(&mut self) -> Result<Option<UnitIndexEntry>> {
        let offset = self.reader.stream_position()?;
        let prefix = match self.reader.read_u32::<BigEndian>() {
            Ok(prefix) => prefix,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if u64::from(prefix) != tables::PARSE_INFO_PREFIX {
            return Err(Vc2Error::InvalidArg(format!(
                "no parse info prefix at byte {} (found 0x{:08X})",
                offset, prefix
            )));
        }
        let entry = UnitIndexEntry {
            offset,
            parse_code: self.reader.read_u8()?,
            next_parse_offset: self.reader.read_u32::<BigEndian>()?,
            previous_parse_offset: self.reader.read_u32::<BigEndian>()?,
        };
        debug!(
            "Parse info at byte {}: code 0x{:02X}, next {}",
            entry.offset, entry.parse_code, entry.next_parse_offset
        );
        Ok(Some(entry))
    }

    /// Moves to the header following `entry`. Returns false when the chain
    /// cannot be followed: after an end of sequence or a zero offset.
    pub fn skip_to_next(&mut self, entry: &UnitIndexEntry) -> Result<bool> {
        if entry.next_parse_offset == 0 {
            return Ok(false);
        }
        self.reader
            .seek(SeekFrom::Start(entry.offset + u64::from(entry.next_parse_offset)))?;
        Ok(true)
    }
}

/// Every data unit reachable through the parse offset chain, stopping at the
/// end of the data or at the first unit with a zero `next_parse_offset`.
pub fn index_data_units(data: &[u8]) -> Result<Vec<UnitIndexEntry>> {
    let mut indexer = UnitIndexer::new(Cursor::new(data));
    let mut entries = Vec::new();
    while let Some(entry) = indexer.next_unit()? {
        entries.push(entry);
        let more = indexer.skip_to_next(&entry)?;
        let end_of_sequence = entry.kind() == Some(ParseCode::EndOfSequence);
        if !more && !end_of_sequence {
            break;
        }
    }
    Ok(entries)
}
