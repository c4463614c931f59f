//! Collector configuration
//!
//! Loaded from TOML; every field has a default so a config file only needs
//! the values it changes:
//!
//! ```toml
//! content_root = "../resources/baseoa"
//! output_dir = "../resources/converted"
//!
//! [map]
//! stride = { fixed = 72 }
//! entity_filter = ["weapon", "ammo", "item", "misc_model"]
//! ```

use std::path::{Path, PathBuf};

use arenapack_core::types::{JobKind, DEFAULT_IMAGE_EXTENSION, IMAGE_EXTENSIONS};
use arenapack_parsers::MapReadOptions;
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult};

/// Placeholder replaced by the job name in `script_name`
pub const JOB_NAME_PLACEHOLDER: &str = "{name}";

/// Settings shared by every job of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Root of the loose content tree
    pub content_root: PathBuf,
    /// Shader script directory, relative to the content root
    pub scripts_dir: String,
    /// Extension given to texture references that have none
    pub default_image_extension: String,
    /// Map reading options
    pub map: MapReadOptions,
    /// Archive path of the generated script; `{name}` is the job name
    pub script_name: String,
    /// Where archives are written
    pub output_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("."),
            scripts_dir: "scripts".to_string(),
            default_image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
            map: MapReadOptions::default(),
            script_name: format!("scripts/{JOB_NAME_PLACEHOLDER}.shader"),
            output_dir: PathBuf::from("converted"),
        }
    }
}

impl CollectorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> ResolveResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ResolveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> ResolveResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> ResolveResult<()> {
        if !IMAGE_EXTENSIONS.contains(&self.default_image_extension.as_str()) {
            return Err(ResolveError::Config(format!(
                "default_image_extension must be one of {IMAGE_EXTENSIONS:?}, got {:?}",
                self.default_image_extension
            )));
        }
        if !self.script_name.contains(JOB_NAME_PLACEHOLDER) || !self.script_name.ends_with(".shader") {
            return Err(ResolveError::Config(format!(
                "script_name must contain {JOB_NAME_PLACEHOLDER} and end in .shader, got {:?}",
                self.script_name
            )));
        }
        if self.scripts_dir.trim().is_empty() {
            return Err(ResolveError::Config("scripts_dir is empty".to_string()));
        }
        Ok(())
    }

    /// Archive path of the generated script for a job
    pub fn script_path(&self, job_name: &str) -> String {
        self.script_name.replace(JOB_NAME_PLACEHOLDER, job_name)
    }

    /// Output archive for a job
    pub fn archive_path(&self, job: JobKind, name: &str) -> PathBuf {
        let dir = match job {
            JobKind::Map => "maps",
            JobKind::Model => "models",
            JobKind::Player => "players",
        };
        self.output_dir.join(dir).join(format!("{name}.zip"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenapack_parsers::LumpStride;

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scripts_dir, "scripts");
        assert_eq!(config.map.stride, LumpStride::Auto);
        assert_eq!(config.script_path("q3dm17"), "scripts/q3dm17.shader");
        assert_eq!(
            config.archive_path(JobKind::Player, "sarge"),
            PathBuf::from("converted").join("players").join("sarge.zip")
        );
    }

    #[test]
    fn test_partial_toml() {
        let config = CollectorConfig::from_toml_str(
            r#"
content_root = "/data/baseoa"

[map]
stride = { fixed = 68 }
"#,
        )
        .unwrap();

        assert_eq!(config.content_root, PathBuf::from("/data/baseoa"));
        assert_eq!(config.map.stride, LumpStride::Fixed(68));
        assert_eq!(config.map.entity_filter.len(), 4);
        assert_eq!(config.output_dir, PathBuf::from("converted"));
    }

    #[test]
    fn test_auto_stride_string() {
        let config = CollectorConfig::from_toml_str("[map]\nstride = \"auto\"\n").unwrap();
        assert_eq!(config.map.stride, LumpStride::Auto);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            CollectorConfig::from_toml_str("default_image_extension = \"png\""),
            Err(ResolveError::Config(_))
        ));
        assert!(CollectorConfig::from_toml_str("script_name = \"scripts/fixed.shader\"").is_err());
        assert!(CollectorConfig::from_toml_str("output_dir = 3").is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arenapack.toml");
        std::fs::write(&path, "scripts_dir = \"shaders\"\n").unwrap();

        assert_eq!(CollectorConfig::load(&path).unwrap().scripts_dir, "shaders");
        assert!(CollectorConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
