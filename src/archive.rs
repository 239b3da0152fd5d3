//! Archive access layer
//!
//! Tables live inside a larger game data archive. The reader only needs to turn a
//! logical name such as `DBFilesClient\Spell.dbc` into a byte stream, so that
//! capability is expressed by the [`Archive`] trait and passed explicitly to
//! [`DbcFile::open`](crate::DbcFile::open).
//!
//! The reader returned by [`Archive::open_file`] is the resource handle: it is
//! released when dropped, on every exit path.
//!
//! Three sources are provided:
//! - [`MemoryArchive`] - named byte buffers held in memory
//! - [`DirArchive`] - loose files extracted to a directory
//! - [`ZipSource`] - entries of a ZIP container

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{Error, Result};

/// Capability to resolve a logical resource name to a readable stream
pub trait Archive {
    /// Open a resource for reading
    ///
    /// Returns [`Error::EntryNotFound`] when the name does not resolve.
    fn open_file<'a>(&'a mut self, name: &str) -> Result<Box<dyn Read + 'a>>;

    /// Names of all resources in the archive, in archive notation
    fn file_names(&self) -> Vec<String>;

    /// Check whether a resource exists
    fn contains(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.file_names()
            .iter()
            .any(|n| normalize_name(n) == wanted)
    }
}

/// Normalize a resource name for lookup
///
/// Game archives use backslash separators and are case-insensitive, so
/// `DBFilesClient\Spell.dbc` and `dbfilesclient/spell.dbc` name the same entry.
pub fn normalize_name(name: &str) -> String {
    name.trim_start_matches(&['/', '\\'][..])
        .replace('\\', "/")
        .to_ascii_lowercase()
}

/// In-memory archive of named byte buffers
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    entries: HashMap<String, (String, Vec<u8>)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let name = name.into();
        self.entries
            .insert(normalize_name(&name), (name, data.into()));
    }

    /// Builder-style variant of [`MemoryArchive::insert`]
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Archive for MemoryArchive {
    fn open_file<'a>(&'a mut self, name: &str) -> Result<Box<dyn Read + 'a>> {
        let (_, data) = self
            .entries
            .get(&normalize_name(name))
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(data.as_slice())))
    }

    fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.values().map(|(n, _)| n.clone()).collect();
        names.sort();
        names
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }
}

/// Archive backed by loose files under a root directory
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    /// Use `root` as the archive root
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::EntryNotFound(root.display().to_string()));
        }
        Ok(DirArchive {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a name to a path, matching each component case-insensitively
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let normalized = normalize_name(name);
        let mut current = self.root.clone();
        for component in normalized.split('/').filter(|c| !c.is_empty()) {
            if component == "." || component == ".." {
                return None;
            }
            let exact = current.join(component);
            if exact.exists() {
                current = exact;
                continue;
            }
            let found = std::fs::read_dir(&current)
                .ok()?
                .filter_map(|e| e.ok())
                .find(|e| e.file_name().to_string_lossy().to_ascii_lowercase() == component)?;
            current = found.path();
        }
        current.is_file().then_some(current)
    }
}

impl Archive for DirArchive {
    fn open_file<'a>(&'a mut self, name: &str) -> Result<Box<dyn Read + 'a>> {
        let path = self
            .resolve(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn file_names(&self) -> Vec<String> {
        let mut files = Vec::new();
        // Best effort: stops at the first unreadable directory
        let _ = collect_relative(&self.root, &self.root, &mut files);
        files.sort();
        files
    }
}

fn collect_relative(root: &Path, dir: &Path, files: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_relative(root, &path, files)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            files.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

/// Archive backed by a ZIP container
pub struct ZipSource<R: Read + Seek> {
    archive: ZipArchive<R>,
    index: HashMap<String, usize>,
}

impl ZipSource<BufReader<File>> {
    /// Open a ZIP file on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipSource<R> {
    /// Read the central directory of a ZIP stream
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let index = archive
            .file_names()
            .filter_map(|name| {
                archive
                    .index_for_name(name)
                    .map(|i| (normalize_name(name), i))
            })
            .collect();
        Ok(ZipSource { archive, index })
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }
}

impl<R: Read + Seek> Archive for ZipSource<R> {
    fn open_file<'a>(&'a mut self, name: &str) -> Result<Box<dyn Read + 'a>> {
        let index = *self
            .index
            .get(&normalize_name(name))
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        let file = self.archive.by_index(index)?;
        Ok(Box::new(file))
    }

    fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&normalize_name(name))
    }
}
