//! Skin file reader
//!
//! A skin assigns a shader to each surface of a model, one
//! `surface,shader` pair per line:
//!
//! ```text
//! tag_head,
//! h_head,models/players/sarge/h_sarge.tga
//! ```

use std::path::Path;

use tracing::warn;

use crate::traits::{ParseResult, Parser};

/// Shader names of a skin, in file order.
///
/// Reading stops at the first line without a comma. Empty values (tag
/// lines) are skipped.
pub fn parse_skin(source: &str) -> Vec<String> {
    source
        .lines()
        .map_while(|line| line.split_once(','))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shader names of a skin file; an unreadable file yields no names
pub fn read_skin_shader_names(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match SkinParser.parse_file(path) {
        Ok(names) => names,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skin not readable");
            Vec::new()
        }
    }
}

/// Skin parser
#[derive(Debug, Clone, Copy, Default)]
pub struct SkinParser;

impl Parser for SkinParser {
    type Output = Vec<String>;

    fn extensions(&self) -> &[&str] {
        &["skin"]
    }

    fn name(&self) -> &str {
        "Skin Parser"
    }

    fn parse_bytes(&self, data: &[u8]) -> ParseResult<Vec<String>> {
        Ok(parse_skin(&String::from_utf8_lossy(data)))
    }
}
