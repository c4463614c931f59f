//! arenapack export pipeline
//!
//! Turns a resolved file list into a distributable archive:
//! - ZIP archives with deflate compression
//! - PNG/JPEG textures scaled to power-of-two sizes

pub mod archive;
pub mod error;
pub mod packer;
pub mod textures;

pub use archive::{ArchiveWriter, MemoryArchive, ZipArchiveWriter};
pub use error::{ExportError, ExportResult};
pub use packer::{PackReport, Packer};
pub use textures::{ImageCodec, ImageCrateCodec, ImageFormat, TextureConvertOptions};
