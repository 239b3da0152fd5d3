//! WDBC client database table parser
//!
//! WDBC is the table format used by the game client to ship static data such as
//! spells, maps or items. Tables are stored inside the client's data archives.
//!
//! ## Format Overview
//!
//! A WDBC file consists of (all integers little-endian):
//! - 20-byte header: `"WDBC"`, record count, field count, record size, string
//!   block size
//! - `record_count` fixed-width records of `record_size` bytes each
//! - A string block of NUL-terminated strings, referenced from records by byte
//!   offset into the block
//!
//! The parser only provides raw access to 32-bit columns and strings; what each
//! column means depends on the table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wdbc::{DbcFile, ZipSource};
//!
//! let mut archive = ZipSource::open("client-data.zip")?;
//! let maps = DbcFile::load(&mut archive, "DBFilesClient\\Map.dbc")?;
//!
//! for record in &maps {
//!     println!("{} {}", record.id()?, record.get_string(1)?);
//! }
//! # Ok::<(), wdbc::Error>(())
//! ```

mod header;
mod reader;
mod record;
pub mod utils;

pub use header::{DbcHeader, FIELD_SIZE, HEADER_SIZE, WDBC_MAGIC};
pub use reader::{DbcFile, DbcOpenOptions, LayoutCheck};
pub use record::{Record, Records};
pub use utils::{
    dump_table, export_csv, export_tables, list_tables, show_table_info, ColumnFormat,
    DumpOptions,
};

#[cfg(test)]
pub(crate) mod test_util {
    use super::WDBC_MAGIC;

    /// Builds synthetic WDBC files for tests
    pub struct TableBuilder {
        field_count: u32,
        record_size: Option<u32>,
        rows: Vec<Vec<u8>>,
        strings: Vec<u8>,
    }

    impl TableBuilder {
        pub fn new(field_count: u32) -> Self {
            TableBuilder {
                field_count,
                record_size: None,
                rows: Vec::new(),
                strings: Vec::new(),
            }
        }

        /// Override the record size written to the header
        pub fn record_size(mut self, size: u32) -> Self {
            self.record_size = Some(size);
            self
        }

        pub fn row(mut self, values: &[u32]) -> Self {
            self.rows
                .push(values.iter().flat_map(|v| v.to_le_bytes()).collect());
            self
        }

        /// Row of `(u32 id, i32, f32, u32 string offset)`
        pub fn row_mixed(mut self, id: u32, int: i32, float: f32, string: u32) -> Self {
            let mut row = Vec::with_capacity(16);
            row.extend_from_slice(&id.to_le_bytes());
            row.extend_from_slice(&int.to_le_bytes());
            row.extend_from_slice(&float.to_le_bytes());
            row.extend_from_slice(&string.to_le_bytes());
            self.rows.push(row);
            self
        }

        pub fn strings(mut self, block: &[u8]) -> Self {
            self.strings = block.to_vec();
            self
        }

        pub fn build(&self) -> Vec<u8> {
            let record_size = self.record_size.unwrap_or(self.field_count * 4);
            let mut data = WDBC_MAGIC.to_vec();
            for v in [
                self.rows.len() as u32,
                self.field_count,
                record_size,
                self.strings.len() as u32,
            ] {
                data.extend_from_slice(&v.to_le_bytes());
            }
            for row in &self.rows {
                let mut row = row.clone();
                row.resize(record_size as usize, 0);
                data.extend_from_slice(&row);
            }
            data.extend_from_slice(&self.strings);
            data
        }
    }
}
