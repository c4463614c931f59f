//! File store abstraction
//!
//! The dependency collector never touches `std::fs` directly. Everything it
//! reads (maps, models, skins, scripts, images) goes through a [`FileStore`],
//! which lets tests run against an in-memory tree.

use std::path::PathBuf;

use crate::node::StoreNode;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Content root not found: {0}")]
    RootNotFound(String),

    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Read past end of {path}: offset {offset} + {length} exceeds size {size}")]
    OutOfRange {
        path: String,
        offset: u64,
        length: u64,
        size: u64,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error means the path does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::PathNotFound { .. } | StoreError::RootNotFound(_) => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<StoreError> for arenapack_core::Error {
    fn from(err: StoreError) -> Self {
        use arenapack_core::Error;

        match err {
            StoreError::PathNotFound { path } => Error::FileNotFound(PathBuf::from(path)),
            StoreError::RootNotFound(root) => Error::FileNotFound(PathBuf::from(root)),
            StoreError::OutOfRange { offset, length, size, .. } => {
                Error::OutOfRange { offset, length, size }
            }
            StoreError::Io(e) => Error::Io(e),
            other => Error::Store {
                message: other.to_string(),
            },
        }
    }
}

/// Read/write access to a content tree addressed by relative paths
pub trait FileStore: Send + Sync {
    /// Human-readable label (root directory, "memory", ...)
    fn name(&self) -> &str;

    /// Check if a file or directory exists
    fn exists(&self, path: &str) -> bool;

    /// Check if a directory exists
    fn is_dir(&self, path: &str) -> bool;

    /// Entries of a directory, sorted by name, not recursive
    fn list_dir(&self, path: &str) -> StoreResult<Vec<StoreNode>>;

    /// Read a whole file
    fn read(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Create or replace a file, creating parent directories
    fn write(&self, path: &str, data: &[u8]) -> StoreResult<()>;

    /// Read `length` bytes at `offset`; short reads are errors
    fn read_bytes(&self, path: &str, offset: u64, length: usize) -> StoreResult<Vec<u8>> {
        let data = self.read(path)?;
        let size = data.len() as u64;
        let end = offset.checked_add(length as u64).filter(|end| *end <= size);
        match end {
            Some(end) => Ok(data[offset as usize..end as usize].to_vec()),
            None => Err(StoreError::OutOfRange {
                path: path.to_string(),
                offset,
                length: length as u64,
                size,
            }),
        }
    }

    /// Read a text file; invalid UTF-8 is replaced
    fn read_to_string(&self, path: &str) -> StoreResult<String> {
        self.read(path)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    /// Read a text file as lines, CRLF normalized
    fn read_lines(&self, path: &str) -> StoreResult<Vec<String>> {
        self.read_to_string(path)
            .map(|text| text.lines().map(str::to_string).collect())
    }

    /// Names of the files in `dir` whose name ends with `suffix`, sorted
    fn list_files_with_suffix(&self, dir: &str, suffix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .list_dir(dir)?
            .into_iter()
            .filter(|node| node.is_file() && node.name.ends_with(suffix))
            .map(|node| node.name)
            .collect())
    }
}
