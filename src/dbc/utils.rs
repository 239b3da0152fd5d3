//! WDBC utility functions
//!
//! This module contains functions for inspecting tables and exporting them to
//! text formats. Columns are printed as unsigned integers unless a
//! [`ColumnFormat`] says otherwise, since the table itself carries no types.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::archive::Archive;
use crate::utils::{create_glob_matcher, format_size, matches_filter};

use super::{DbcFile, DbcOpenOptions, Record};

/// How a column is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnFormat {
    #[default]
    UInt,
    Int,
    Float,
    String,
}

/// Options for dumping and exporting tables
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Maximum number of records to write
    pub limit: Option<usize>,
    /// Per-column formats, unlisted columns use [`ColumnFormat::UInt`]
    pub columns: BTreeMap<usize, ColumnFormat>,
}

impl DumpOptions {
    /// Render every field in `fields` with `format`
    pub fn with_columns(mut self, fields: &[usize], format: ColumnFormat) -> Self {
        for &field in fields {
            self.columns.insert(field, format);
        }
        self
    }

    pub fn format_of(&self, field: usize) -> ColumnFormat {
        self.columns.get(&field).copied().unwrap_or_default()
    }
}

/// Parse a field list such as `1,3,5-7`
pub fn parse_field_list(list: &str) -> Result<Vec<usize>> {
    let mut fields = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid field range: {}", part))?;
                let end: usize = end
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid field range: {}", part))?;
                if start > end {
                    bail!("Invalid field range: {}", part);
                }
                fields.extend(start..=end);
            }
            None => fields.push(
                part.parse()
                    .with_context(|| format!("Invalid field index: {}", part))?,
            ),
        }
    }
    Ok(fields)
}

/// Render one field of a record
pub fn format_field(record: &Record<'_>, field: usize, format: ColumnFormat) -> Result<String> {
    Ok(match format {
        ColumnFormat::UInt => record.get_u32(field)?.to_string(),
        ColumnFormat::Int => record.get_i32(field)?.to_string(),
        ColumnFormat::Float => record.get_f32(field)?.to_string(),
        ColumnFormat::String => record.get_string(field)?.into_owned(),
    })
}

/// Number of whole 4-byte columns in each record
fn column_count(table: &DbcFile) -> usize {
    table.record_size() / super::FIELD_SIZE
}

/// Display table information
pub fn show_table_info(table: &DbcFile) {
    println!("\nWDBC Info: {}", table.name());
    println!("  Records: {}", table.record_count());
    println!("  Fields: {}", table.field_count());
    println!("  Record size: {} bytes", table.record_size());
    println!(
        "  String block: {}",
        format_size(table.string_block_size() as u64)
    );
    println!("  Payload: {}", format_size(table.payload_len() as u64));
    match table.max_id() {
        Ok(max_id) => println!("  Max ID: {}", max_id),
        Err(e) => println!("  Max ID: unavailable ({})", e),
    }
}

/// Write records as tab-separated lines, returning the number written
pub fn dump_table<W: Write>(table: &DbcFile, options: &DumpOptions, out: &mut W) -> Result<usize> {
    let columns = column_count(table);
    let mut written = 0;

    for record in table.iter().take(options.limit.unwrap_or(usize::MAX)) {
        let mut line = Vec::with_capacity(columns);
        for field in 0..columns {
            line.push(format_field(&record, field, options.format_of(field))?);
        }
        writeln!(out, "{:>6}: {}", record.index(), line.join("\t"))?;
        written += 1;
    }

    Ok(written)
}

fn escape_csv(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write a table as CSV with a `field_N` header row
pub fn export_csv<W: Write>(table: &DbcFile, options: &DumpOptions, out: &mut W) -> Result<usize> {
    let columns = column_count(table);

    let header: Vec<String> = (0..columns).map(|f| format!("field_{}", f)).collect();
    writeln!(out, "{}", header.join(","))?;

    let mut written = 0;
    for record in table.iter().take(options.limit.unwrap_or(usize::MAX)) {
        let mut row = Vec::with_capacity(columns);
        for field in 0..columns {
            let value = format_field(&record, field, options.format_of(field))?;
            row.push(escape_csv(&value));
        }
        writeln!(out, "{}", row.join(","))?;
        written += 1;
    }

    Ok(written)
}

/// List WDBC tables in an archive, optionally filtered by a glob pattern
pub fn list_tables<A: Archive + ?Sized>(archive: &A, filter: Option<&str>) -> Result<Vec<String>> {
    let matcher = filter.map(create_glob_matcher).transpose()?;
    Ok(archive
        .file_names()
        .into_iter()
        .filter(|name| name.to_ascii_lowercase().ends_with(".dbc"))
        .filter(|name| matches_filter(name, matcher.as_ref()))
        .collect())
}

/// Export every matching table to `<output_dir>/<name>.csv`
///
/// Tables that fail to load are reported and skipped. Returns the number of
/// exported and failed tables.
pub fn export_tables<A: Archive + ?Sized>(
    archive: &mut A,
    filter: Option<&str>,
    output_dir: &Path,
    open_options: &DbcOpenOptions,
    dump_options: &DumpOptions,
) -> Result<(usize, usize)> {
    let names = list_tables(archive, filter)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    info!("Exporting {} tables to {}", names.len(), output_dir.display());
    let pb = ProgressBar::new(names.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );

    let mut exported = 0;
    let mut failed = 0;

    for name in &names {
        pb.set_message(name.clone());
        pb.inc(1);

        let table = match DbcFile::load_with_options(archive, name, open_options.clone()) {
            Ok(table) => table,
            Err(e) => {
                pb.suspend(|| warn!("Failed to load {}: {}", name, e));
                failed += 1;
                continue;
            }
        };

        let out_path = csv_path(output_dir, name);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(
            File::create(&out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?,
        );
        match export_csv(&table, dump_options, &mut writer).and_then(|_| Ok(writer.flush()?)) {
            Ok(()) => exported += 1,
            Err(e) => {
                pb.suspend(|| warn!("Failed to export {}: {}", name, e));
                failed += 1;
            }
        }
    }

    pb.finish_with_message("Done");
    Ok((exported, failed))
}

/// Output path for a table: archive directories are kept, extension becomes `.csv`
fn csv_path(output_dir: &Path, name: &str) -> PathBuf {
    let relative: PathBuf = name
        .split(&['/', '\\'][..])
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect();
    output_dir.join(relative).with_extension("csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::dbc::test_util::TableBuilder;

    fn spells() -> DbcFile {
        DbcFile::parse(
            &TableBuilder::new(3)
                .row(&[1, 1, 0x3fc0_0000])
                .row(&[2, 13, 0xbf80_0000])
                .strings(b"\0Frost, Nova\0\"Blink\"\0")
                .build(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_field_list() {
        assert_eq!(parse_field_list("1,3,5-7").unwrap(), vec![1, 3, 5, 6, 7]);
        assert_eq!(parse_field_list(" 2 , ").unwrap(), vec![2]);
        assert!(parse_field_list("x").is_err());
        assert!(parse_field_list("4-2").is_err());
    }

    #[test]
    fn test_dump_table() {
        let table = spells();
        let options = DumpOptions::default()
            .with_columns(&[1], ColumnFormat::String)
            .with_columns(&[2], ColumnFormat::Float);
        let mut out = Vec::new();
        let written = dump_table(&table, &options, &mut out).unwrap();
        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "     0: 1\tFrost, Nova\t1.5\n     1: 2\t\"Blink\"\t-1\n"
        );
    }

    #[test]
    fn test_export_csv_escapes() {
        let table = spells();
        let options = DumpOptions::default().with_columns(&[1], ColumnFormat::String);
        let mut out = Vec::new();
        export_csv(&table, &options, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "field_0,field_1,field_2\n1,\"Frost, Nova\",1069547520\n2,\"\"\"Blink\"\"\",3212836864\n"
        );
    }

    #[test]
    fn test_dump_limit() {
        let table = spells();
        let options = DumpOptions {
            limit: Some(1),
            ..Default::default()
        };
        let mut out = Vec::new();
        assert_eq!(dump_table(&table, &options, &mut out).unwrap(), 1);
    }

    #[test]
    fn test_list_and_export_tables() {
        let good = TableBuilder::new(1).row(&[7]).build();
        let mut archive = MemoryArchive::new()
            .with_file("DBFilesClient\\Map.dbc", good.clone())
            .with_file("DBFilesClient\\Spell.dbc", good)
            .with_file("DBFilesClient\\Broken.dbc", b"WDBC".to_vec())
            .with_file("Interface\\readme.txt", b"hi".to_vec());

        let all = list_tables(&archive, None).unwrap();
        assert_eq!(all.len(), 3);
        let maps = list_tables(&archive, Some("Map")).unwrap();
        assert_eq!(maps, vec!["DBFilesClient\\Map.dbc".to_string()]);
        let client = list_tables(&archive, Some("dbfilesclient/s*")).unwrap();
        assert_eq!(client, vec!["DBFilesClient\\Spell.dbc".to_string()]);

        let dir = tempfile::tempdir().unwrap();
        let (exported, failed) = export_tables(
            &mut archive,
            None,
            dir.path(),
            &DbcOpenOptions::default(),
            &DumpOptions::default(),
        )
        .unwrap();
        assert_eq!((exported, failed), (2, 1));

        let csv = fs::read_to_string(dir.path().join("DBFilesClient").join("Map.csv")).unwrap();
        assert_eq!(csv, "field_0\n7\n");
    }

    #[test]
    fn test_csv_path_stays_inside_output() {
        let path = csv_path(Path::new("out"), "..\\DBFilesClient\\Spell.dbc");
        assert_eq!(path, Path::new("out").join("DBFilesClient").join("Spell.csv"));
    }
}
