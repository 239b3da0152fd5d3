//! wdbc - A tool for inspecting WDBC client database tables
//!
//! Usage:
//!   wdbc info <source> [table]            - Show table information
//!   wdbc dump <source> [table]            - Print table rows
//!   wdbc list <source> [filter]           - List tables in an archive
//!   wdbc export <source> [filter] -o dir  - Export tables as CSV
//!
//! `<source>` is a directory of extracted client files, a ZIP archive, or a
//! loose `.dbc` file (when no table name is given).

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use wdbc::dbc::utils::parse_field_list;
use wdbc::dbc::{
    dump_table, export_csv, export_tables, list_tables, show_table_info, ColumnFormat,
    DumpOptions, HEADER_SIZE,
};
use wdbc::{Archive, DbcFile, DbcOpenOptions, DirArchive, LayoutCheck, ZipSource};

#[derive(Parser)]
#[command(name = "wdbc")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and export WDBC client database tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Clone)]
struct OpenArgs {
    /// Accept tables whose record size is not 4 bytes per declared field
    #[arg(long)]
    lenient: bool,
    /// Maximum payload size in bytes (0 disables the limit)
    #[arg(long, default_value_t = DbcOpenOptions::DEFAULT_MAX_PAYLOAD_SIZE)]
    max_size: u64,
}

impl OpenArgs {
    fn options(&self) -> DbcOpenOptions {
        DbcOpenOptions::new()
            .layout_check(if self.lenient {
                LayoutCheck::Lenient
            } else {
                LayoutCheck::Strict
            })
            .max_payload_size((self.max_size > 0).then_some(self.max_size))
    }
}

#[derive(Args, Clone, Default)]
struct FormatArgs {
    /// Fields to print as strings (e.g. 1,4-6)
    #[arg(short, long)]
    strings: Option<String>,
    /// Fields to print as signed integers
    #[arg(short, long)]
    ints: Option<String>,
    /// Fields to print as floats
    #[arg(short, long)]
    floats: Option<String>,
    /// Maximum number of rows
    #[arg(short, long)]
    limit: Option<usize>,
}

impl FormatArgs {
    fn options(&self) -> Result<DumpOptions> {
        let mut options = DumpOptions {
            limit: self.limit,
            ..Default::default()
        };
        for (list, format) in [
            (&self.ints, ColumnFormat::Int),
            (&self.floats, ColumnFormat::Float),
            (&self.strings, ColumnFormat::String),
        ] {
            if let Some(list) = list {
                options = options.with_columns(&parse_field_list(list)?, format);
            }
        }
        Ok(options)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show table information
    Info {
        /// Directory, ZIP archive or loose .dbc file
        source: PathBuf,
        /// Table name inside the archive (e.g. DBFilesClient\Spell.dbc)
        table: Option<String>,
        #[command(flatten)]
        open: OpenArgs,
    },
    /// Print table rows
    Dump {
        /// Directory, ZIP archive or loose .dbc file
        source: PathBuf,
        /// Table name inside the archive
        table: Option<String>,
        #[command(flatten)]
        open: OpenArgs,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// List tables in an archive
    List {
        /// Directory or ZIP archive
        source: PathBuf,
        /// Filter pattern (e.g. *Spell*, DBFilesClient/*)
        filter: Option<String>,
    },
    /// Export tables as CSV files
    Export {
        /// Directory, ZIP archive or loose .dbc file
        source: PathBuf,
        /// Filter pattern (archives only)
        filter: Option<String>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[command(flatten)]
        open: OpenArgs,
        #[command(flatten)]
        format: FormatArgs,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();
}

/// Open a directory or ZIP file as an archive
fn open_archive(source: &Path) -> Result<Box<dyn Archive>> {
    if source.is_dir() {
        return Ok(Box::new(
            DirArchive::open(source)
                .with_context(|| format!("Failed to open {}", source.display()))?,
        ));
    }
    let archive = ZipSource::open(source)
        .with_context(|| format!("Failed to open {} as a ZIP archive", source.display()))?;
    Ok(Box::new(archive))
}

/// Whether `path` is a regular file that starts with a WDBC header
fn is_wdbc_file(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let mut header = [0u8; HEADER_SIZE as usize];
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(DbcFile::is_wdbc(&header)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Export a loose table file to `<output>/<stem>.csv`
fn export_loose_table(
    source: &Path,
    filter: Option<&str>,
    output: &Path,
    open_options: DbcOpenOptions,
    dump_options: &DumpOptions,
) -> Result<(usize, PathBuf)> {
    if let Some(filter) = filter {
        bail!(
            "{} is a single table; the filter '{}' only applies to archives",
            source.display(),
            filter
        );
    }
    let table = load_table(source, None, open_options)?;
    let stem = source.file_stem().unwrap_or_default();
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let out_path = output.join(stem).with_extension("csv");
    let mut out = BufWriter::new(
        File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?,
    );
    let rows = export_csv(&table, dump_options, &mut out)?;
    out.flush()?;
    Ok((rows, out_path))
}

/// Load a table either from an archive or, without a table name, from a loose file
fn load_table(source: &Path, table: Option<&str>, options: DbcOpenOptions) -> Result<DbcFile> {
    match table {
        Some(name) => {
            let mut archive = open_archive(source)?;
            DbcFile::load_with_options(archive.as_mut(), name, options)
                .with_context(|| format!("Failed to load {} from {}", name, source.display()))
        }
        None => {
            if source.is_dir() {
                bail!("{} is a directory; pass a table name", source.display());
            }
            let file = File::open(source)
                .with_context(|| format!("Failed to open {}", source.display()))?;
            let name = source.display().to_string();
            DbcFile::from_reader(name, &mut BufReader::new(file), options)
                .with_context(|| format!("Failed to parse {}", source.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Info {
            source,
            table,
            open,
        } => {
            let table = load_table(&source, table.as_deref(), open.options())?;
            show_table_info(&table);
        }
        Commands::Dump {
            source,
            table,
            open,
            format,
        } => {
            let table = load_table(&source, table.as_deref(), open.options())?;
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            dump_table(&table, &format.options()?, &mut out)?;
            out.flush()?;
        }
        Commands::List { source, filter } => {
            let archive = open_archive(&source)?;
            let names = list_tables(archive.as_ref(), filter.as_deref())?;
            for name in &names {
                println!("{}", name);
            }
            println!("\nTotal: {} tables", names.len());
        }
        Commands::Export {
            source,
            filter,
            output,
            open,
            format,
        } => {
            if is_wdbc_file(&source)? {
                let (rows, out_path) = export_loose_table(
                    &source,
                    filter.as_deref(),
                    &output,
                    open.options(),
                    &format.options()?,
                )?;
                println!("Exported {} rows to {}", rows, out_path.display());
            } else {
                let mut archive = open_archive(&source)?;
                let (exported, failed) = export_tables(
                    archive.as_mut(),
                    filter.as_deref(),
                    &output,
                    &open.options(),
                    &format.options()?,
                )?;
                println!(
                    "\nExported {} tables ({} failed) to {}",
                    exported,
                    failed,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spell_table() -> Vec<u8> {
        let mut data = b"WDBC".to_vec();
        for v in [1u32, 1, 4, 1] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&42u32.to_le_bytes());
        data.push(0);
        data
    }

    #[test]
    fn test_is_wdbc_file() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("Spell.dbc");
        std::fs::write(&table, spell_table()).unwrap();
        assert!(is_wdbc_file(&table).unwrap());

        let short = dir.path().join("Short.dbc");
        std::fs::write(&short, b"WDBC\x01\0").unwrap();
        assert!(!is_wdbc_file(&short).unwrap());

        let zip = dir.path().join("client.zip");
        std::fs::write(&zip, b"PK\x03\x04 not a table, just some archive bytes").unwrap();
        assert!(!is_wdbc_file(&zip).unwrap());

        assert!(!is_wdbc_file(dir.path()).unwrap());
    }

    #[test]
    fn test_export_loose_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("Spell.dbc");
        std::fs::write(&table, spell_table()).unwrap();
        let output = dir.path().join("csv");

        let err = export_loose_table(
            &table,
            Some("*Map*"),
            &output,
            DbcOpenOptions::default(),
            &DumpOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("only applies to archives"));
        assert!(!output.exists());

        let (rows, path) = export_loose_table(
            &table,
            None,
            &output,
            DbcOpenOptions::default(),
            &DumpOptions::default(),
        )
        .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(path, output.join("Spell.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "field_0\n42\n");
    }
}
