//! Record views and the record cursor

use std::borrow::Cow;
use std::fmt;
use std::iter::FusedIterator;

use crate::dbc::header::FIELD_SIZE;
use crate::dbc::reader::DbcFile;
use crate::error::{Error, Result};

/// A borrowed view of one fixed-width record
///
/// Field accessors address 4-byte slots from the start of the record and are
/// bounds-checked against the record size.
#[derive(Clone, Copy)]
pub struct Record<'a> {
    table: &'a DbcFile,
    offset: usize,
}

impl<'a> Record<'a> {
    pub(crate) fn new(table: &'a DbcFile, offset: usize) -> Self {
        Record { table, offset }
    }

    /// Index of this record within the table
    pub fn index(&self) -> usize {
        match self.table.record_size() {
            0 => 0,
            size => self.offset / size,
        }
    }

    /// Raw bytes of the record
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.table.record_bytes()[self.offset..self.offset + self.table.record_size()]
    }

    fn field_bytes(&self, field: usize) -> Result<[u8; FIELD_SIZE]> {
        let record_size = self.table.record_size();
        let start = field
            .checked_mul(FIELD_SIZE)
            .filter(|start| start.checked_add(FIELD_SIZE).is_some_and(|end| end <= record_size))
            .ok_or(Error::FieldOutOfRange { field, record_size })?;
        let bytes = &self.as_bytes()[start..start + FIELD_SIZE];
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn get_u32(&self, field: usize) -> Result<u32> {
        self.field_bytes(field).map(u32::from_le_bytes)
    }

    pub fn get_i32(&self, field: usize) -> Result<i32> {
        self.field_bytes(field).map(i32::from_le_bytes)
    }

    pub fn get_f32(&self, field: usize) -> Result<f32> {
        self.field_bytes(field).map(f32::from_le_bytes)
    }

    /// Field 0, conventionally the row identifier
    pub fn id(&self) -> Result<u32> {
        self.get_u32(0)
    }

    /// Raw bytes of the string referenced by `field`, without the terminator
    pub fn get_cstr(&self, field: usize) -> Result<&'a [u8]> {
        let offset = self.get_u32(field)?;
        self.table.cstr_at(offset)
    }

    /// String referenced by `field`
    ///
    /// Offset 0 means no string. Invalid UTF-8 is replaced rather than rejected.
    pub fn get_string(&self, field: usize) -> Result<Cow<'a, str>> {
        self.get_cstr(field).map(String::from_utf8_lossy)
    }

    /// Localized string column
    ///
    /// Locale selection belongs to whoever knows the table schema; here the
    /// field is read like any other string reference.
    pub fn get_localized_string(&self, field: usize) -> Result<Cow<'a, str>> {
        self.get_string(field)
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("index", &self.index())
            .field("offset", &self.offset)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

/// Forward cursor over the record array
///
/// Produced by [`DbcFile::begin`], [`DbcFile::end`] and [`DbcFile::iter`]. It
/// advances by the record size and stops at the start of the string block.
/// Two cursors compare equal when they point into the same table at the same
/// offset.
#[derive(Clone)]
pub struct Records<'a> {
    table: &'a DbcFile,
    pos: usize,
    end: usize,
}

impl<'a> Records<'a> {
    pub(crate) fn new(table: &'a DbcFile, pos: usize) -> Self {
        Records {
            table,
            pos,
            end: table.records_end(),
        }
    }

    /// Record at the current position, `None` once the cursor reaches the end
    pub fn get(&self) -> Option<Record<'a>> {
        (self.pos < self.end).then(|| Record::new(self.table, self.pos))
    }

    /// Byte offset of the cursor within the payload
    pub fn offset(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.get()?;
        self.pos += self.table.record_size();
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.table.record_size() {
            0 => 0,
            size => self.end.saturating_sub(self.pos) / size,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Records<'_> {}

impl FusedIterator for Records<'_> {}

impl PartialEq for Records<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.pos == other.pos
    }
}

impl Eq for Records<'_> {}

impl fmt::Debug for Records<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records")
            .field("table", &self.table.name())
            .field("pos", &self.pos)
            .field("end", &self.end)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::test_util::TableBuilder;

    fn table() -> DbcFile {
        DbcFile::parse(
            &TableBuilder::new(4)
                .row_mixed(10, -5, 1.5, 1)
                .row_mixed(20, i32::MIN, -0.25, 5)
                .row_mixed(30, 0, 0.0, 0)
                .strings(b"\0Fireball\0Bolt\0")
                .build(),
        )
        .unwrap()
    }

    #[test]
    fn test_typed_accessors() {
        let table = table();
        let r = table.record(1).unwrap();
        assert_eq!(r.index(), 1);
        assert_eq!(r.id().unwrap(), 20);
        assert_eq!(r.get_i32(1).unwrap(), i32::MIN);
        assert_eq!(r.get_u32(1).unwrap(), 0x8000_0000);
        assert_eq!(r.get_f32(2).unwrap(), -0.25);
        assert_eq!(r.get_string(3).unwrap(), "ball");
        assert_eq!(r.as_bytes().len(), 16);
    }

    #[test]
    fn test_strings() {
        let table = table();
        assert_eq!(table.record(0).unwrap().get_string(3).unwrap(), "Fireball");
        assert_eq!(
            table.record(0).unwrap().get_localized_string(3).unwrap(),
            "Fireball"
        );
        assert_eq!(table.record(2).unwrap().get_string(3).unwrap(), "");
        assert_eq!(table.record(2).unwrap().get_cstr(3).unwrap(), b"");
    }

    #[test]
    fn test_field_out_of_range() {
        let table = table();
        let r = table.record(0).unwrap();
        assert!(matches!(
            r.get_u32(4),
            Err(Error::FieldOutOfRange {
                field: 4,
                record_size: 16
            })
        ));
        assert!(r.get_u32(usize::MAX).is_err());
    }

    #[test]
    fn test_string_offset_out_of_range() {
        let table = DbcFile::parse(
            &TableBuilder::new(1)
                .row(&[99])
                .strings(b"\0x\0")
                .build(),
        )
        .unwrap();
        assert!(matches!(
            table.record(0).unwrap().get_string(0),
            Err(Error::StringOutOfRange { offset: 99, size: 3 })
        ));
    }

    #[test]
    fn test_unterminated_string_stops_at_block_end() {
        let table = DbcFile::parse(&TableBuilder::new(1).row(&[1]).strings(b"\0abc").build())
            .unwrap();
        assert_eq!(table.record(0).unwrap().get_string(0).unwrap(), "abc");
    }

    #[test]
    fn test_begin_to_end_visits_every_record() {
        let table = table();
        let mut cursor = table.begin();
        assert_eq!(cursor.len(), 3);
        for _ in 0..table.record_count() {
            assert_ne!(cursor, table.end());
            assert!(cursor.next().is_some());
        }
        assert_eq!(cursor, table.end());
        assert!(cursor.get().is_none());
        assert!(cursor.next().is_none());

        let ids: Vec<u32> = table.iter().map(|r| r.id().unwrap()).collect();
        assert_eq!(ids, vec![10, 20, 30]);

        let mut seen = 0;
        for record in &table {
            assert_eq!(record.index(), seen);
            seen += 1;
        }
        assert_eq!(seen, table.record_count());
    }

    #[test]
    fn test_cursor_equality_is_per_table() {
        let a = table();
        let b = a.clone();
        assert_eq!(a.begin(), a.iter());
        assert_ne!(a.begin(), b.begin());
        assert_eq!(a.end().offset(), 48);
    }

    #[test]
    fn test_empty_and_unopened_tables() {
        let empty = DbcFile::parse(&TableBuilder::new(2).strings(b"\0").build()).unwrap();
        assert_eq!(empty.begin(), empty.end());
        assert_eq!(empty.iter().count(), 0);

        let unopened = DbcFile::new("Spell.dbc");
        assert_eq!(unopened.begin(), unopened.end());
        assert_eq!(unopened.iter().len(), 0);
    }
}
