//! Main WDBC table reader

use std::collections::HashMap;
use std::io::Read;

use tracing::{debug, trace};

use crate::archive::Archive;
use crate::dbc::header::{short_read, DbcHeader, HEADER_SIZE, WDBC_MAGIC};
use crate::dbc::record::{Record, Records};
use crate::error::{Error, Result};

/// How strictly the record layout is validated on open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutCheck {
    /// Require `field_count * 4 == record_size`
    #[default]
    Strict,
    /// Accept any record size, e.g. tables with packed byte columns
    Lenient,
}

/// Options for opening a table
#[derive(Debug, Clone)]
pub struct DbcOpenOptions {
    /// Record layout validation
    pub layout_check: LayoutCheck,
    /// Upper bound on the payload allocation, `None` for no limit
    pub max_payload_size: Option<u64>,
}

impl Default for DbcOpenOptions {
    fn default() -> Self {
        Self {
            layout_check: LayoutCheck::Strict,
            max_payload_size: Some(Self::DEFAULT_MAX_PAYLOAD_SIZE),
        }
    }
}

impl DbcOpenOptions {
    /// 256 MiB, well above the largest shipped client table
    pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 256 * 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout_check(mut self, check: LayoutCheck) -> Self {
        self.layout_check = check;
        self
    }

    pub fn max_payload_size(mut self, limit: Option<u64>) -> Self {
        self.max_payload_size = limit;
        self
    }
}

/// A decoded WDBC table
///
/// The whole payload (records followed by the string block) is held in one
/// buffer. [`Record`] and [`Records`] borrow from it.
#[derive(Debug, Clone)]
pub struct DbcFile {
    name: String,
    options: DbcOpenOptions,
    header: Option<DbcHeader>,
    /// Records followed by the string block
    data: Vec<u8>,
}

impl DbcFile {
    /// Create an unopened table for the resource `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, DbcOpenOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: DbcOpenOptions) -> Self {
        DbcFile {
            name: name.into(),
            options,
            header: None,
            data: Vec::new(),
        }
    }

    /// Open `name` in `archive` and read the whole table
    ///
    /// # Example
    /// ```no_run
    /// use wdbc::{DbcFile, DirArchive};
    ///
    /// let mut archive = DirArchive::open("extracted")?;
    /// let spells = DbcFile::load(&mut archive, "DBFilesClient\\Spell.dbc")?;
    /// println!("{} spells, max id {}", spells.record_count(), spells.max_id()?);
    /// # Ok::<(), wdbc::Error>(())
    /// ```
    pub fn load<A: Archive + ?Sized>(archive: &mut A, name: &str) -> Result<Self> {
        Self::load_with_options(archive, name, DbcOpenOptions::default())
    }

    pub fn load_with_options<A: Archive + ?Sized>(
        archive: &mut A,
        name: &str,
        options: DbcOpenOptions,
    ) -> Result<Self> {
        let mut table = Self::with_options(name, options);
        table.open(archive)?;
        Ok(table)
    }

    /// Read a table from an already opened stream
    pub fn from_reader<R: Read + ?Sized>(
        name: impl Into<String>,
        reader: &mut R,
        options: DbcOpenOptions,
    ) -> Result<Self> {
        let mut table = Self::with_options(name, options);
        table.read_from(reader)?;
        Ok(table)
    }

    /// Parse a complete table held in memory
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = data;
        Self::from_reader("<memory>", &mut cursor, DbcOpenOptions::default())
    }

    /// Check if data starts with the WDBC signature
    pub fn is_wdbc(data: &[u8]) -> bool {
        data.len() >= HEADER_SIZE as usize && data.starts_with(&WDBC_MAGIC)
    }

    /// Resolve the table through `archive` and load it
    ///
    /// Fails without keeping any partial state when the resource is missing, the
    /// signature is wrong, any header field or the payload is short, or the
    /// layout check rejects the table. A table can only be opened once.
    pub fn open<A: Archive + ?Sized>(&mut self, archive: &mut A) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }
        debug!("Opening table {}", self.name);
        let mut reader = archive.open_file(&self.name)?;
        self.read_from(&mut reader)
    }

    fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let header = DbcHeader::read(reader)?;
        trace!(
            "{}: {} records, {} fields, {} bytes/record, {} bytes of strings",
            self.name,
            header.record_count,
            header.field_count,
            header.record_size,
            header.string_block_size
        );

        if header.record_size == 0 && header.record_count > 0 {
            return Err(Error::InvalidWdbc(format!(
                "{} records of zero size",
                header.record_count
            )));
        }

        if self.options.layout_check == LayoutCheck::Strict && !header.is_consistent() {
            return Err(Error::LayoutMismatch {
                field_count: header.field_count,
                record_size: header.record_size,
            });
        }

        let payload_len = header
            .payload_len()
            .ok_or_else(|| Error::InvalidWdbc("payload size overflows".into()))?;
        if let Some(limit) = self.options.max_payload_size {
            if payload_len > limit {
                return Err(Error::PayloadTooLarge {
                    size: payload_len,
                    limit,
                });
            }
        }
        let payload_len = usize::try_from(payload_len).map_err(|_| {
            Error::InvalidWdbc(format!("payload of {} bytes is not addressable", payload_len))
        })?;

        let mut data = vec![0u8; payload_len];
        reader
            .read_exact(&mut data)
            .map_err(|e| short_read(e, "payload"))?;

        debug!(
            "Loaded {} ({} records, {} bytes)",
            self.name, header.record_count, payload_len
        );
        self.header = Some(header);
        self.data = data;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.header.is_some()
    }

    /// Resource name the table was created with
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &DbcOpenOptions {
        &self.options
    }

    /// Parsed header, `None` until opened
    pub fn header(&self) -> Option<&DbcHeader> {
        self.header.as_ref()
    }

    pub fn record_count(&self) -> usize {
        self.header.map_or(0, |h| h.record_count as usize)
    }

    pub fn field_count(&self) -> usize {
        self.header.map_or(0, |h| h.field_count as usize)
    }

    /// Record stride in bytes
    pub fn record_size(&self) -> usize {
        self.header.map_or(0, |h| h.record_size as usize)
    }

    pub fn string_block_size(&self) -> usize {
        self.header.map_or(0, |h| h.string_block_size as usize)
    }

    /// Number of payload bytes read after the header
    pub fn payload_len(&self) -> usize {
        self.data.len()
    }

    /// Byte offset where the string block starts within the payload
    pub(crate) fn records_end(&self) -> usize {
        self.record_size() * self.record_count()
    }

    /// Record region of the payload
    pub(crate) fn record_bytes(&self) -> &[u8] {
        &self.data[..self.records_end()]
    }

    /// Trailing string block
    pub fn string_block(&self) -> &[u8] {
        &self.data[self.records_end()..]
    }

    /// Get the record at index `id`
    pub fn record(&self, id: usize) -> Result<Record<'_>> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }
        let count = self.record_count();
        if id >= count {
            return Err(Error::RecordOutOfRange { id, count });
        }
        Ok(Record::new(self, id * self.record_size()))
    }

    /// Cursor at the first record
    pub fn begin(&self) -> Records<'_> {
        Records::new(self, 0)
    }

    /// Cursor one past the last record, at the start of the string block
    pub fn end(&self) -> Records<'_> {
        Records::new(self, self.records_end())
    }

    /// Iterate over all records in file order
    pub fn iter(&self) -> Records<'_> {
        self.begin()
    }

    /// Largest value of field 0 over all records, 0 for an empty table
    ///
    /// Field 0 is conventionally the row identifier.
    pub fn max_id(&self) -> Result<u32> {
        let mut max = 0;
        for record in self.iter() {
            max = max.max(record.id()?);
        }
        Ok(max)
    }

    /// Map field-0 identifiers to record indices
    ///
    /// When an identifier repeats, the later record wins.
    pub fn id_index(&self) -> Result<HashMap<u32, usize>> {
        let mut index = HashMap::with_capacity(self.record_count());
        for record in self.iter() {
            index.insert(record.id()?, record.index());
        }
        Ok(index)
    }

    /// Find the first record whose field 0 equals `id`
    pub fn find_by_id(&self, id: u32) -> Result<Option<Record<'_>>> {
        for record in self.iter() {
            if record.id()? == id {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Read the NUL-terminated string at `offset` in the string block
    pub(crate) fn cstr_at(&self, offset: u32) -> Result<&[u8]> {
        let block = self.string_block();
        if offset == 0 {
            return Ok(&[]);
        }
        let start = offset as usize;
        if start >= block.len() {
            return Err(Error::StringOutOfRange {
                offset,
                size: block.len(),
            });
        }
        let end = block[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| start + p)
            .unwrap_or(block.len());
        Ok(&block[start..end])
    }
}

impl<'a> IntoIterator for &'a DbcFile {
    type Item = Record<'a>;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
