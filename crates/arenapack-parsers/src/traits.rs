// arenapack-parsers/src/traits.rs
//! Core traits defining the parser interface for all file formats.
//!
//! Every format parser works on an in-memory byte buffer. Reading the
//! buffer is left to the caller (the dependency collector goes through a
//! file store), while `parse_file` offers a direct filesystem path for
//! tools and tests.

use std::io::Read;
use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use crate::logging::instrument_parse;

/// Errors that can occur during parsing operations
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: Vec<u8>, found: Vec<u8> },

    #[error("Out of range: offset {offset} + {length} exceeds data size {size}")]
    OutOfRange { offset: u64, length: u64, size: u64 },

    #[error("Lump {lump} has invalid size {length} for record stride {stride}")]
    InvalidLumpSize {
        lump: &'static str,
        length: usize,
        stride: usize,
    },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Nested error in {context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Wrap this error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ParseError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the error comes from malformed content rather than I/O
    pub fn is_format_error(&self) -> bool {
        match self {
            ParseError::Io(_) => false,
            ParseError::Nested { source, .. } => source.is_format_error(),
            _ => true,
        }
    }
}

impl From<ParseError> for arenapack_core::Error {
    fn from(err: ParseError) -> Self {
        use arenapack_core::Error;

        if matches!(err, ParseError::InvalidLumpSize { .. } | ParseError::InvalidStructure(_)) {
            return Error::invalid_data(err.to_string());
        }

        match err {
            ParseError::Io(e) => Error::Io(e),
            ParseError::InvalidMagic { expected, found } => Error::InvalidMagic { expected, found },
            ParseError::OutOfRange { offset, length, size } => {
                Error::OutOfRange { offset, length, size }
            }
            ParseError::Nested { context, source } => {
                Error::from(*source).with_context(context)
            }
            other => Error::invalid_data(other.to_string()),
        }
    }
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Core trait for all file format parsers
///
/// Implementors of this trait provide the ability to parse a specific
/// content format (map, model, skin, shader script).
pub trait Parser: Send + Sync {
    /// The parsed output type
    type Output: Send + Sync;

    /// Returns the file extensions this parser handles (e.g., ["bsp"])
    fn extensions(&self) -> &[&str];

    /// Returns the magic bytes that identify this file type (if applicable)
    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    /// Returns a human-readable name for this parser
    fn name(&self) -> &str;

    /// Parse a complete file held in memory
    fn parse_bytes(&self, data: &[u8]) -> ParseResult<Self::Output>;

    /// Parse from a reader, buffering it fully first
    fn parse<R: Read>(&self, mut reader: R) -> ParseResult<Self::Output>
    where
        Self: Sized,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.parse_bytes(&data)
    }

    /// Parse from a file path
    fn parse_file(&self, path: &Path) -> ParseResult<Self::Output> {
        crate::log_parse_start!(self.name(), path);
        let start = Instant::now();

        let data = std::fs::read(path)?;
        let result = instrument_parse(self.name(), || self.parse_bytes(&data));

        match &result {
            Ok(_) => {
                crate::log_parse_complete!(self.name(), start.elapsed(), data.len());
            }
            Err(e) => {
                crate::log_parse_error!(self.name(), e);
            }
        }

        result
    }

    /// Check if this parser can handle the given file
    fn can_parse(&self, path: &Path) -> bool {
        // Check extension
        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy().to_lowercase();
            if self.extensions().iter().any(|e| e.to_lowercase() == ext_str) {
                return true;
            }
        }

        // Try to check magic bytes if available
        if let Some(magic) = self.magic_bytes() {
            if let Ok(mut file) = std::fs::File::open(path) {
                let mut buffer = vec![0u8; magic.len()];
                if file.read_exact(&mut buffer).is_ok() {
                    return buffer == magic;
                }
            }
        }

        false
    }
}
