//! Archive packing
//!
//! Copies a list of content files into an archive. A `.tga` (or
//! extension-less) texture reference is looked up the way the engine does
//! it: the `.tga` variant first, then the `.jpg` one. A `.jpg` reference is
//! shipped as named. TGA images are shipped as PNG.

use arenapack_core::types::{replace_extension, strip_image_extension, AssetKind, FileRef, Warning};
use arenapack_vfs::FileStore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::archive::ArchiveWriter;
use crate::error::{ExportError, ExportResult};
use crate::textures::{ImageCodec, ImageFormat};

/// Texture candidates in lookup order: (source extension, source format, shipped format)
const TEXTURE_CANDIDATES: [(&str, ImageFormat, ImageFormat); 2] = [
    ("tga", ImageFormat::Tga, ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg, ImageFormat::Jpeg),
];

/// Outcome of a packing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackReport {
    /// Entry names written, in order
    pub entries: Vec<String>,
    /// Images that were scaled to powers of two
    pub resized: Vec<String>,
    /// Files that could not be packed
    pub warnings: Vec<Warning>,
}

/// Copies content files from a store into an archive
pub struct Packer<'a> {
    store: &'a dyn FileStore,
    codec: &'a dyn ImageCodec,
}

impl<'a> Packer<'a> {
    /// Packer reading from `store` and converting images with `codec`
    pub fn new(store: &'a dyn FileStore, codec: &'a dyn ImageCodec) -> Self {
        Self { store, codec }
    }

    /// Add content that does not come from the store (generated scripts)
    pub fn add_generated(
        &self,
        archive: &mut dyn ArchiveWriter,
        name: &str,
        data: &[u8],
        report: &mut PackReport,
    ) -> ExportResult<()> {
        if archive.add_entry(name, data)? {
            report.entries.push(name.to_string());
        }
        Ok(())
    }

    /// Pack every file; missing files become warnings
    pub fn pack(&self, files: &[FileRef], archive: &mut dyn ArchiveWriter) -> ExportResult<PackReport> {
        let mut report = PackReport::default();
        self.pack_into(files, archive, &mut report)?;
        Ok(report)
    }

    /// Pack every file, appending to an existing report
    pub fn pack_into(
        &self,
        files: &[FileRef],
        archive: &mut dyn ArchiveWriter,
        report: &mut PackReport,
    ) -> ExportResult<()> {
        for file in files {
            match file.kind {
                AssetKind::Texture if ImageFormat::from_path(&file.path) != Some(ImageFormat::Png) => {
                    self.pack_texture(&file.path, archive, report)?
                }
                _ => self.pack_verbatim(&file.path, archive, report)?,
            }
        }
        Ok(())
    }

    fn pack_verbatim(&self, path: &str, archive: &mut dyn ArchiveWriter, report: &mut PackReport) -> ExportResult<()> {
        if archive.contains(path) {
            return Ok(());
        }
        if !self.store.exists(path) {
            warn!(path, "File not found");
            report.warnings.push(Warning::MissingFile { path: path.to_string() });
            return Ok(());
        }

        let data = self.store.read(path)?;
        if archive.add_entry(path, &data)? {
            report.entries.push(path.to_string());
        }
        Ok(())
    }

    fn pack_texture(&self, path: &str, archive: &mut dyn ArchiveWriter, report: &mut PackReport) -> ExportResult<()> {
        let base = strip_image_extension(path);
        let (candidates, missing): (Vec<(String, ImageFormat, ImageFormat)>, &str) = match ImageFormat::from_path(path) {
            Some(ImageFormat::Jpeg) => (vec![(path.to_string(), ImageFormat::Jpeg, ImageFormat::Jpeg)], path),
            _ => (
                TEXTURE_CANDIDATES
                    .iter()
                    .map(|&(ext, source, target)| (format!("{base}.{ext}"), source, target))
                    .collect(),
                base,
            ),
        };

        for (source_path, source, target) in candidates {
            if !self.store.exists(&source_path) {
                continue;
            }

            let entry = if source == target {
                source_path.clone()
            } else {
                replace_extension(&source_path, target.extension())
            };
            if archive.contains(&entry) {
                return Ok(());
            }

            debug!(texture = %source_path, "Converting texture");
            let data = self.store.read(&source_path)?;
            let converted = self
                .codec
                .reencode(&data, source, target)
                .map_err(|e| with_path(e, &source_path))?;
            if converted.resized {
                report.resized.push(entry.clone());
            }

            if archive.add_entry(&entry, &converted.data)? {
                report.entries.push(entry);
            }
            return Ok(());
        }

        warn!(texture = missing, "Texture not found");
        report.warnings.push(Warning::MissingTexture { path: missing.to_string() });
        Ok(())
    }
}

fn with_path(err: ExportError, path: &str) -> ExportError {
    match err {
        ExportError::Image(e) => ExportError::UnsupportedFormat(format!("{path}: {e}")),
        other => other,
    }
}
