//! Resolution errors

use std::path::PathBuf;

use arenapack_export::ExportError;
use arenapack_parsers::ParseError;
use arenapack_vfs::StoreError;
use thiserror::Error;

/// Errors that stop a single packaging job
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Input not found: {path}")]
    MissingInput { path: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for resolution and packing jobs
pub type ResolveResult<T> = Result<T, ResolveError>;

impl ResolveError {
    /// Attach the offending path to a parse error
    pub fn parse(path: impl Into<String>, source: ParseError) -> Self {
        ResolveError::Parse {
            path: path.into(),
            source,
        }
    }
}

impl From<ResolveError> for arenapack_core::Error {
    fn from(err: ResolveError) -> Self {
        use arenapack_core::Error;

        match err {
            ResolveError::MissingInput { path } => Error::FileNotFound(PathBuf::from(path)),
            ResolveError::Parse { path, source } => Error::from(source).with_context(path),
            ResolveError::Store(e) => e.into(),
            ResolveError::Export(e) => e.into(),
            ResolveError::Config(message) => Error::invalid_config(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_keeps_path_and_kind() {
        let err = ResolveError::parse(
            "maps/broken.bsp",
            ParseError::InvalidMagic { expected: b"IBSP".to_vec(), found: b"PK\x03\x04".to_vec() },
        );
        assert!(err.to_string().contains("maps/broken.bsp"));

        let core: arenapack_core::Error = err.into();
        assert!(core.is_format_error());
        assert!(core.to_string().starts_with("maps/broken.bsp"));
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let core: arenapack_core::Error = ResolveError::MissingInput { path: "maps/none.bsp".into() }.into();
        assert!(core.is_not_found());
    }
}
