//! Export errors

use thiserror::Error;

/// Archive and image conversion errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Store error: {0}")]
    Store(#[from] arenapack_vfs::StoreError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Archive already finished")]
    Finished,
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

impl From<ExportError> for arenapack_core::Error {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Io(e) => arenapack_core::Error::Io(e),
            ExportError::Store(e) => e.into(),
            other => arenapack_core::Error::ExportFailed {
                message: other.to_string(),
            },
        }
    }
}
