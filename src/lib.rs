//! # wdbc
//!
//! A Rust library for reading WDBC client database tables out of game data
//! archives.
//!
//! ## Overview
//!
//! A WDBC table is a small header, a flat array of fixed-width records and a
//! trailing block of NUL-terminated strings. This library provides:
//!
//! - Header validation and bulk loading of a table into one owned buffer
//! - Typed access to record fields (`u32`, `i32`, `f32`, string references)
//! - A record iterator with begin/end cursor semantics
//! - Archive access through the [`Archive`] trait, with in-memory, directory
//!   and ZIP sources
//! - Text dump and CSV export helpers
//!
//! ## Example - Reading
//!
//! ```rust,no_run
//! use wdbc::{DbcFile, DirArchive};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut archive = DirArchive::open("client-data")?;
//!
//!     let mut spells = DbcFile::new("DBFilesClient\\Spell.dbc");
//!     spells.open(&mut archive)?;
//!
//!     for record in &spells {
//!         println!("{}: {}", record.id()?, record.get_string(136)?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Lookup by id
//!
//! ```rust,no_run
//! use wdbc::{DbcFile, ZipSource};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut archive = ZipSource::open("client-data.zip")?;
//!     let maps = DbcFile::load(&mut archive, "DBFilesClient\\Map.dbc")?;
//!
//!     let index = maps.id_index()?;
//!     if let Some(row) = index.get(&530) {
//!         println!("{}", maps.record(*row)?.get_string(1)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod dbc;
pub mod error;
pub mod utils;

pub use archive::{Archive, DirArchive, MemoryArchive, ZipSource};
pub use dbc::{DbcFile, DbcHeader, DbcOpenOptions, LayoutCheck, Record, Records};
pub use error::{Error, Result};
pub use utils::{create_glob_matcher, format_size, matches_filter};
