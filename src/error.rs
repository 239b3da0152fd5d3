//! Error types for wdbc

use thiserror::Error;

/// Main error type for wdbc operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Invalid WDBC magic: {0:02X?} (expected \"WDBC\")")]
    InvalidMagic([u8; 4]),

    #[error("Truncated WDBC file while reading {0}")]
    Truncated(&'static str),

    #[error("Invalid WDBC file: {0}")]
    InvalidWdbc(String),

    #[error("Record layout mismatch: {field_count} fields * 4 != record size {record_size}")]
    LayoutMismatch { field_count: u32, record_size: u32 },

    #[error("Payload of {size} bytes exceeds the configured limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Table is not open")]
    NotOpen,

    #[error("Table is already open")]
    AlreadyOpen,

    #[error("Record {id} out of range (table has {count} records)")]
    RecordOutOfRange { id: usize, count: usize },

    #[error("Field {field} out of range for a {record_size}-byte record")]
    FieldOutOfRange { field: usize, record_size: usize },

    #[error("String offset {offset} out of range (string block is {size} bytes)")]
    StringOutOfRange { offset: u32, size: usize },
}

impl Error {
    /// Whether the error describes a table the reader cannot reason about at all,
    /// as opposed to a missing resource or a short read.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::LayoutMismatch { .. } | Error::InvalidWdbc(_) | Error::PayloadTooLarge { .. }
        )
    }
}

/// Result type alias for wdbc operations
pub type Result<T> = std::result::Result<T, Error>;
