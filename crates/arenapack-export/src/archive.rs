//! Archive writers
//!
//! Entries are appended once per unique name; adding a name a second time
//! is a no-op, so a texture shared by several shaders is stored once.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use tracing::{debug, trace};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExportError, ExportResult};

/// Append-only archive sink
pub trait ArchiveWriter: Send {
    /// Add an entry; returns `false` if the name was already present
    fn add_entry(&mut self, name: &str, data: &[u8]) -> ExportResult<bool>;

    /// Check if an entry exists
    fn contains(&self, name: &str) -> bool;

    /// Number of entries written
    fn entry_count(&self) -> usize;

    /// Flush the archive; no entries can be added afterwards
    fn finish(&mut self) -> ExportResult<()>;
}

/// Deflate-compressed ZIP archive
pub struct ZipArchiveWriter<W: Write + Seek> {
    writer: Option<ZipWriter<W>>,
    names: HashSet<String>,
}

impl ZipArchiveWriter<File> {
    /// Create a ZIP file, creating parent directories
    pub fn create(path: impl AsRef<Path>) -> ExportResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "Creating archive");
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    /// Wrap any seekable sink
    pub fn new(sink: W) -> Self {
        Self {
            writer: Some(ZipWriter::new(sink)),
            names: HashSet::new(),
        }
    }

    /// Finish and hand back the sink
    pub fn into_inner(mut self) -> ExportResult<W> {
        let mut writer = self.writer.take().ok_or(ExportError::Finished)?;
        Ok(writer.finish()?)
    }
}

impl<W: Write + Seek + Send> ArchiveWriter for ZipArchiveWriter<W> {
    fn add_entry(&mut self, name: &str, data: &[u8]) -> ExportResult<bool> {
        if self.names.contains(name) {
            trace!(entry = name, "Duplicate entry skipped");
            return Ok(false);
        }

        let writer = self.writer.as_mut().ok_or(ExportError::Finished)?;
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(name, options)?;
        writer.write_all(data)?;

        self.names.insert(name.to_string());
        trace!(entry = name, bytes = data.len(), "Entry written");
        Ok(true)
    }

    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn entry_count(&self) -> usize {
        self.names.len()
    }

    fn finish(&mut self) -> ExportResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.finish()?;
        }
        Ok(())
    }
}

/// Archive kept in memory, for tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
    finished: bool,
}

impl MemoryArchive {
    /// Empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Content of an entry
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Whether `finish` was called
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ArchiveWriter for MemoryArchive {
    fn add_entry(&mut self, name: &str, data: &[u8]) -> ExportResult<bool> {
        if self.finished {
            return Err(ExportError::Finished);
        }
        if self.entries.contains_key(name) {
            return Ok(false);
        }
        self.entries.insert(name.to_string(), data.to_vec());
        Ok(true)
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn finish(&mut self) -> ExportResult<()> {
        self.finished = true;
        Ok(())
    }
}
