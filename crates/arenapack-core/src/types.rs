//! Common types used across arenapack
//!
//! This module provides shared type definitions used by multiple crates:
//! asset classification, packaging jobs, non-fatal warnings, and the
//! image-extension conventions of shader and model references.

use serde::{Deserialize, Serialize};

/// Image extensions a shader stage or model may reference
pub const IMAGE_EXTENSIONS: [&str; 2] = ["tga", "jpg"];

/// Extension appended to extension-less texture references
pub const DEFAULT_IMAGE_EXTENSION: &str = "tga";

/// Kind of content file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Compiled map (`.bsp`)
    Map,
    /// Skeletal model (`.md3`)
    Model,
    /// Skin assignment (`.skin`)
    Skin,
    /// Shader script (`.shader`)
    ShaderScript,
    /// Image
    Texture,
    /// Anything else
    Other,
}

impl AssetKind {
    /// Classify a content path by its extension
    pub fn from_path(path: &str) -> Self {
        match extension(path).map(str::to_ascii_lowercase).as_deref() {
            Some("bsp") => AssetKind::Map,
            Some("md3") => AssetKind::Model,
            Some("skin") => AssetKind::Skin,
            Some("shader") => AssetKind::ShaderScript,
            Some("tga" | "jpg" | "jpeg" | "png") => AssetKind::Texture,
            _ => AssetKind::Other,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AssetKind::Map => "map",
            AssetKind::Model => "model",
            AssetKind::Skin => "skin",
            AssetKind::ShaderScript => "shader",
            AssetKind::Texture => "texture",
            AssetKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// A content file that belongs to a dependency closure
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileRef {
    /// Path relative to the content root, forward slashes
    pub path: String,
    /// What the file is
    pub kind: AssetKind,
}

impl FileRef {
    /// Create a reference, classifying the path by extension
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let kind = AssetKind::from_path(&path);
        Self { path, kind }
    }
}

/// Top-level asset a packaging job starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// A `.bsp` map
    Map,
    /// A single `.md3` model (weapons, items)
    Model,
    /// A player directory with several models and skins
    Player,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobKind::Map => "map",
            JobKind::Model => "model",
            JobKind::Player => "player",
        };
        f.write_str(label)
    }
}

/// Non-fatal problem found while resolving or packing.
///
/// Warnings are collected and returned next to a result; they never abort
/// a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A requested shader is not defined by any script
    UnresolvedShader { name: String },
    /// A texture is not in the store: a `.jpg` reference as named, or
    /// neither variant of a `.tga` / extension-less one
    MissingTexture { path: String },
    /// A non-texture file of the closure does not exist
    MissingFile { path: String },
    /// A skin file could not be opened
    MissingSkin { path: String },
    /// A shader script could not be read
    UnreadableScript { path: String, reason: String },
    /// A shader at the end of a script was never closed and was dropped
    DroppedShader { script: String, name: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnresolvedShader { name } => write!(f, "shader not found: {name}"),
            Warning::MissingTexture { path } => write!(f, "texture not found: {path}"),
            Warning::MissingFile { path } => write!(f, "file not found: {path}"),
            Warning::MissingSkin { path } => write!(f, "skin not readable: {path}"),
            Warning::UnreadableScript { path, reason } => {
                write!(f, "shader script not readable: {path} ({reason})")
            }
            Warning::DroppedShader { script, name } => {
                write!(f, "unterminated shader dropped: {name} in {script}")
            }
        }
    }
}

/// Extension of a path (without the dot), if any
pub fn extension(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rfind('.').map(|pos| &file[pos + 1..]).filter(|ext| !ext.is_empty())
}

/// Whether a path ends in one of the recognized image extensions
pub fn has_image_extension(path: &str) -> bool {
    extension(path)
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Remove a trailing `.tga` / `.jpg`, leaving other paths untouched
pub fn strip_image_extension(path: &str) -> &str {
    if has_image_extension(path) {
        path.rfind('.').map(|pos| &path[..pos]).unwrap_or(path)
    } else {
        path
    }
}

/// Replace the extension of a path (or add one)
pub fn replace_extension(path: &str, ext: &str) -> String {
    let file_start = path.rfind('/').map(|p| p + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) => format!("{}.{}", &path[..file_start + dot], ext),
        None => format!("{path}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_from_path() {
        assert_eq!(AssetKind::from_path("maps/q3dm17.bsp"), AssetKind::Map);
        assert_eq!(AssetKind::from_path("models/players/sarge/head.MD3"), AssetKind::Model);
        assert_eq!(AssetKind::from_path("scripts/base.shader"), AssetKind::ShaderScript);
        assert_eq!(AssetKind::from_path("textures/base_wall/c_met5_2.jpg"), AssetKind::Texture);
        assert_eq!(AssetKind::from_path("textures/base_wall/c_met5_2"), AssetKind::Other);
    }

    #[test]
    fn test_extension_ignores_directory_dots() {
        assert_eq!(extension("models/v1.2/gun"), None);
        assert_eq!(extension("models/v1.2/gun.md3"), Some("md3"));
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn test_image_extension_helpers() {
        assert!(has_image_extension("textures/a.TGA"));
        assert!(!has_image_extension("textures/a.png"));
        assert_eq!(strip_image_extension("models/gun.jpg"), "models/gun");
        assert_eq!(strip_image_extension("textures/sfx/flame"), "textures/sfx/flame");
    }

    #[test]
    fn test_replace_extension() {
        assert_eq!(replace_extension("textures/a.tga", "png"), "textures/a.png");
        assert_eq!(replace_extension("textures/v1.0/a", "jpg"), "textures/v1.0/a.jpg");
    }

    #[test]
    fn test_warning_serializes_with_tag() {
        let warning = Warning::UnresolvedShader { name: "textures/missing".into() };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "unresolved_shader");
        assert_eq!(warning.to_string(), "shader not found: textures/missing");
    }
}
