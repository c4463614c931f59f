//! Directory listing entries

use serde::{Deserialize, Serialize};

/// Store node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Directory node
    Directory,
    /// File node
    File,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreNode {
    /// Node name (without path)
    pub name: String,
    /// Node type
    pub node_type: NodeType,
    /// File size (0 for directories)
    pub size: u64,
    /// Lowercased extension, files only
    pub extension: Option<String>,
}

impl StoreNode {
    /// Create a new file node
    pub fn new_file(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let extension = crate::path::get_extension(&name).map(|e| e.to_lowercase());

        Self {
            name,
            node_type: NodeType::File,
            size,
            extension,
        }
    }

    /// Create a new directory node
    pub fn new_directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: NodeType::Directory,
            size: 0,
            extension: None,
        }
    }

    /// Check if this is a file
    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    /// Check if this is a directory
    pub fn is_directory(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    /// Check if file has a specific extension (case-insensitive)
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension
            .as_deref()
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false)
    }
}
