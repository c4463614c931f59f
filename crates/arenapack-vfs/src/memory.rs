//! In-memory store
//!
//! Directories are implicit: a directory exists while some file path has
//! it as a prefix.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::node::StoreNode;
use crate::path::normalize_path;
use crate::store::{FileStore, StoreError, StoreResult};

/// Content tree held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    /// Add or replace a file
    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.write().insert(normalize_path(path), data.into());
    }

    /// Remove a file, returning its content
    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.write().remove(&normalize_path(path))
    }

    /// Every file path, sorted
    pub fn paths(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the store holds no file
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn dir_prefix(path: &str) -> String {
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            normalized
        } else {
            format!("{normalized}/")
        }
    }
}

impl FileStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(&normalize_path(path)) || self.is_dir(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = Self::dir_prefix(path);
        self.files.read().keys().any(|k| k.starts_with(&prefix))
    }

    fn list_dir(&self, path: &str) -> StoreResult<Vec<StoreNode>> {
        let prefix = Self::dir_prefix(path);
        let files = self.files.read();

        if files.contains_key(&normalize_path(path)) {
            return Err(StoreError::NotADirectory {
                path: path.to_string(),
            });
        }

        let mut nodes: BTreeMap<String, StoreNode> = BTreeMap::new();
        for (key, data) in files.iter() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    nodes
                        .entry(dir.to_string())
                        .or_insert_with(|| StoreNode::new_directory(dir));
                }
                None => {
                    nodes.insert(rest.to_string(), StoreNode::new_file(rest, data.len() as u64));
                }
            }
        }

        if nodes.is_empty() && !prefix.is_empty() {
            return Err(StoreError::PathNotFound {
                path: path.to_string(),
            });
        }

        Ok(nodes.into_values().collect())
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.files
            .read()
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| StoreError::PathNotFound {
                path: path.to_string(),
            })
    }

    fn write(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        self.insert(path, data);
        Ok(())
    }
}
