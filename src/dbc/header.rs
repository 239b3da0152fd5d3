//! WDBC file header parsing

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// File signature at offset 0
pub const WDBC_MAGIC: [u8; 4] = *b"WDBC";

/// Size of the fixed header in bytes
pub const HEADER_SIZE: u64 = 20;

/// Every column of a WDBC record occupies one 32-bit slot
pub const FIELD_SIZE: usize = 4;

/// WDBC header: counts and sizes that describe the payload layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbcHeader {
    /// Number of fixed-width records
    pub record_count: u32,
    /// Declared number of fields per record
    pub field_count: u32,
    /// Bytes per record
    pub record_size: u32,
    /// Bytes in the trailing string block
    pub string_block_size: u32,
}

impl DbcHeader {
    /// Read the magic and the four header fields from the current stream position
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| short_read(e, "magic"))?;
        if magic != WDBC_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let record_count = read_field(reader, "record count")?;
        let field_count = read_field(reader, "field count")?;
        let record_size = read_field(reader, "record size")?;
        let string_block_size = read_field(reader, "string block size")?;

        Ok(DbcHeader {
            record_count,
            field_count,
            record_size,
            string_block_size,
        })
    }

    /// Whether the declared field count accounts for the whole record
    pub fn is_consistent(&self) -> bool {
        self.field_count as u64 * FIELD_SIZE as u64 == self.record_size as u64
    }

    /// Size of the record region in bytes
    pub fn records_len(&self) -> Option<u64> {
        (self.record_size as u64).checked_mul(self.record_count as u64)
    }

    /// Size of everything after the header in bytes
    pub fn payload_len(&self) -> Option<u64> {
        self.records_len()?
            .checked_add(self.string_block_size as u64)
    }

    /// Total file size implied by the header
    pub fn file_len(&self) -> Option<u64> {
        self.payload_len()?.checked_add(HEADER_SIZE)
    }
}

fn read_field<R: Read + ?Sized>(reader: &mut R, what: &'static str) -> Result<u32> {
    reader
        .read_u32::<LittleEndian>()
        .map_err(|e| short_read(e, what))
}

/// Map an unexpected EOF to a truncation error, keep other IO failures as they are
pub(crate) fn short_read(err: io::Error, what: &'static str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated(what)
    } else {
        Error::Io(err)
    }
}
