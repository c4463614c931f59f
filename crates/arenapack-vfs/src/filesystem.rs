//! Local filesystem store

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::node::StoreNode;
use crate::path::normalize_path;
use crate::store::{FileStore, StoreError, StoreResult};

/// Content tree rooted at a local directory
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    name: String,
    root_path: PathBuf,
}

impl FilesystemStore {
    /// Open an existing directory as a content root
    pub fn new(root_path: impl AsRef<Path>) -> StoreResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        if !root_path.exists() {
            return Err(StoreError::RootNotFound(root_path.display().to_string()));
        }

        if !root_path.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "{} is not a directory",
                root_path.display()
            )));
        }

        Ok(Self {
            name: root_path.display().to_string(),
            root_path,
        })
    }

    /// Content root directory
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Get absolute path from a content path
    fn resolve_path(&self, path: &str) -> PathBuf {
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            self.root_path.clone()
        } else {
            self.root_path.join(normalized)
        }
    }

    fn not_found(path: &str) -> StoreError {
        StoreError::PathNotFound {
            path: path.to_string(),
        }
    }
}

impl FileStore for FilesystemStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).exists()
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve_path(path).is_dir()
    }

    fn list_dir(&self, path: &str) -> StoreResult<Vec<StoreNode>> {
        let abs_path = self.resolve_path(path);

        if !abs_path.exists() {
            return Err(Self::not_found(path));
        }

        if !abs_path.is_dir() {
            return Err(StoreError::NotADirectory {
                path: path.to_string(),
            });
        }

        let mut nodes = Vec::new();

        for entry in std::fs::read_dir(&abs_path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let name = entry.file_name().to_string_lossy().to_string();

            let node = if metadata.is_dir() {
                StoreNode::new_directory(name)
            } else {
                StoreNode::new_file(name, metadata.len())
            };

            nodes.push(node);
        }

        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let abs_path = self.resolve_path(path);

        if !abs_path.is_file() {
            return Err(Self::not_found(path));
        }

        trace!(path, "Reading file");
        Ok(std::fs::read(&abs_path)?)
    }

    fn read_bytes(&self, path: &str, offset: u64, length: usize) -> StoreResult<Vec<u8>> {
        let abs_path = self.resolve_path(path);

        if !abs_path.is_file() {
            return Err(Self::not_found(path));
        }

        let mut file = std::fs::File::open(&abs_path)?;
        let size = file.metadata()?.len();
        let in_range = offset
            .checked_add(length as u64)
            .map(|end| end <= size)
            .unwrap_or(false);
        if !in_range {
            return Err(StoreError::OutOfRange {
                path: path.to_string(),
                offset,
                length: length as u64,
                size,
            });
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; length];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn write(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        let abs_path = self.resolve_path(path);

        if let Some(parent) = abs_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        trace!(path, bytes = data.len(), "Writing file");
        std::fs::write(&abs_path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_files() -> (tempfile::TempDir, FilesystemStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::create_dir_all(dir.path().join("scripts/old")).unwrap();
        std::fs::write(dir.path().join("scripts/sfx.shader"), b"b\r\nc\r\n").unwrap();
        std::fs::write(dir.path().join("scripts/base.shader"), b"a").unwrap();
        std::fs::write(dir.path().join("scripts/notes.txt"), b"x").unwrap();

        let store = FilesystemStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = FilesystemStore::new(dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_dir_sorted() {
        let (_dir, store) = store_with_files();
        let names: Vec<String> = store.list_dir("scripts").unwrap().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["base.shader", "notes.txt", "old", "sfx.shader"]);

        let shaders = store.list_files_with_suffix("scripts/", ".shader").unwrap();
        assert_eq!(shaders, vec!["base.shader", "sfx.shader"]);
    }

    #[test]
    fn test_read_and_lines() {
        let (_dir, store) = store_with_files();
        assert_eq!(store.read("scripts/base.shader").unwrap(), b"a");
        assert_eq!(store.read_lines("scripts/sfx.shader").unwrap(), vec!["b", "c"]);
        assert!(store.read("scripts/missing.shader").unwrap_err().is_not_found());
        assert!(store.read("scripts").unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_bytes_range() {
        let (_dir, store) = store_with_files();
        assert_eq!(store.read_bytes("scripts/sfx.shader", 3, 2).unwrap(), b"c\r");
        assert!(matches!(
            store.read_bytes("scripts/sfx.shader", 4, 10),
            Err(StoreError::OutOfRange { size: 6, .. })
        ));
    }

    #[test]
    fn test_write_creates_parents() {
        let (dir, store) = store_with_files();
        store.write("converted/maps/arena.zip", b"PK").unwrap();
        assert!(dir.path().join("converted/maps/arena.zip").is_file());
        assert!(store.is_dir("converted/maps"));
    }
}
