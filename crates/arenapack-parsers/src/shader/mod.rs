//! Shader script parser
//!
//! A shader script is a plain-text file holding any number of named shader
//! definitions:
//!
//! ```text
//! textures/base_wall/metal1      <- name
//! {                              <- shader body
//!     surfaceparm metalsteps
//!     {                          <- stage
//!         map textures/base_wall/metal1_d.tga
//!         blendFunc GL_DST_COLOR GL_ZERO
//!     }
//! }
//! ```
//!
//! The parser is line based. For every definition it keeps the distinct
//! image paths referenced from stage blocks and the definition's verbatim
//! text, so that matched definitions can be copied into a new script.

pub mod clamp;

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::traits::{ParseResult, Parser};

pub use clamp::{find_clamp_collisions, ClampCollision};

/// Image reference inside a stage line
static TEXTURE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9/_.\-]+\.(?:tga|jpg)").expect("texture token pattern is valid")
});

/// Where the parser is within a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Between definitions, waiting for a name or an opening brace
    Global,
    /// Inside a definition, outside any stage
    ShaderBody,
    /// Inside a stage block
    StageBody,
}

/// One named shader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderDefinition {
    /// Lookup key: trimmed and lowercased
    pub name: String,
    /// Distinct image paths from stage lines, in order of appearance
    pub textures: Vec<String>,
    /// Original text, newline-normalized, ending in a newline
    pub text: String,
}

/// Parsed shader script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderScript {
    /// Definitions in script order
    pub definitions: Vec<ShaderDefinition>,
    index: HashMap<String, usize>,
    /// Name of a trailing definition that was never closed
    pub dropped: Option<String>,
}

impl ShaderScript {
    /// Look up a definition by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&ShaderDefinition> {
        let key = name.trim().to_lowercase();
        self.index.get(&key).map(|&i| &self.definitions[i])
    }

    /// Whether a definition of `name` exists, ignoring case
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of definitions after duplicate merging
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the script defines nothing
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Concatenated text of every definition
    pub fn to_source(&self) -> String {
        self.definitions.iter().map(|d| d.text.as_str()).collect()
    }

    fn insert(&mut self, definition: ShaderDefinition) {
        match self.index.get(&definition.name) {
            Some(&i) => {
                debug!(shader = %definition.name, "Duplicate shader definition replaced");
                self.definitions[i] = definition;
            }
            None => {
                self.index.insert(definition.name.clone(), self.definitions.len());
                self.definitions.push(definition);
            }
        }
    }
}

/// Part of a line before a trailing `//` comment
fn code_part(raw: &str) -> &str {
    match raw.find("//") {
        Some(pos) => &raw[..pos],
        None => raw,
    }
}

/// Decision copy of a line: trailing comment removed, trimmed, lowercased
fn comparison_line(raw: &str) -> String {
    code_part(raw).trim().to_lowercase()
}

/// Collect the image references of a stage line into `textures`
fn collect_textures(line: &str, textures: &mut Vec<String>) {
    for token in TEXTURE_TOKEN.find_iter(line) {
        let token = token.as_str();
        if !textures.iter().any(|t| t == token) {
            textures.push(token.to_string());
        }
    }
}

/// Parse shader script text
pub fn parse_shader_source(source: &str) -> ShaderScript {
    let source = source.replace("\r\n", "\n");

    let mut script = ShaderScript::default();
    let mut state = ParserState::Global;
    let mut pending_name = String::new();
    let mut textures: Vec<String> = Vec::new();
    let mut verbatim: Vec<&str> = Vec::new();

    for raw in source.lines() {
        verbatim.push(raw);
        let line = comparison_line(raw);
        if line.is_empty() {
            continue;
        }

        state = match state {
            ParserState::Global if line == "{" => ParserState::ShaderBody,
            ParserState::Global => {
                pending_name = line;
                ParserState::Global
            }
            ParserState::ShaderBody if line == "{" => ParserState::StageBody,
            ParserState::ShaderBody if line == "}" => {
                let mut text = verbatim.join("\n");
                text.push('\n');
                verbatim.clear();

                let name = std::mem::take(&mut pending_name);
                let textures = std::mem::take(&mut textures);
                if name.is_empty() {
                    debug!("Shader body without a name skipped");
                } else {
                    script.insert(ShaderDefinition { name, textures, text });
                }
                ParserState::Global
            }
            ParserState::ShaderBody => ParserState::ShaderBody,
            ParserState::StageBody if line == "}" => ParserState::ShaderBody,
            ParserState::StageBody => {
                if line.contains(".tga") || line.contains(".jpg") {
                    collect_textures(code_part(raw), &mut textures);
                }
                ParserState::StageBody
            }
        };
    }

    if state != ParserState::Global {
        warn!(shader = %pending_name, "Unterminated shader dropped");
        script.dropped = Some(pending_name);
    }

    script
}

/// Parse a shader script file
pub fn parse_shader_script(path: impl AsRef<Path>) -> ParseResult<ShaderScript> {
    ShaderParser::new().parse_file(path.as_ref())
}

/// Shader script parser
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderParser;

impl ShaderParser {
    /// Create a shader script parser
    pub fn new() -> Self {
        Self
    }
}

impl Parser for ShaderParser {
    type Output = ShaderScript;

    fn extensions(&self) -> &[&str] {
        &["shader"]
    }

    fn name(&self) -> &str {
        "Shader Script Parser"
    }

    fn parse_bytes(&self, data: &[u8]) -> ParseResult<ShaderScript> {
        Ok(parse_shader_source(&String::from_utf8_lossy(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "// base textures\n\
textures/base_wall/Metal1\n\
{\n\
\tsurfaceparm metalsteps\n\
\t{\n\
\t\tmap $lightmap\n\
\t\trgbGen identity\n\
\t}\n\
\t{\n\
\t\tmap textures/base_wall/metal1_d.tga\n\
\t\tblendFunc GL_DST_COLOR GL_ZERO\n\
\t}\n\
\t{\n\
\t\tclampmap textures/base_wall/metal1_d.tga\n\
\t}\n\
}\n\
\n\
textures/sfx/flame1\n\
{\n\
\tqer_editorimage textures/sfx/flame_editor.tga\n\
\t{\n\
\t\tanimMap 10 textures/sfx/flame1.tga textures/sfx/flame2.JPG\n\
\t}\n\
}\n";

    #[test]
    fn test_parses_definitions() {
        let script = parse_shader_source(BASE);
        assert_eq!(script.len(), 2);
        assert!(script.dropped.is_none());

        let metal = script.get("TEXTURES/BASE_WALL/METAL1").unwrap();
        assert_eq!(metal.name, "textures/base_wall/metal1");
        assert_eq!(metal.textures, vec!["textures/base_wall/metal1_d.tga"]);
        assert!(metal.text.starts_with("// base textures\ntextures/base_wall/Metal1\n{"));
        assert!(metal.text.ends_with("}\n"));

        // Body-level lines are not stages; animMap lists every frame.
        let flame = script.get("textures/sfx/flame1").unwrap();
        assert_eq!(flame.textures, vec!["textures/sfx/flame1.tga", "textures/sfx/flame2.JPG"]);
        assert!(flame.text.starts_with("\ntextures/sfx/flame1\n"));
    }

    #[test]
    fn test_crlf_and_trailing_comments() {
        let source = "models/gun\r\n{ // open\r\n{\r\nmap models/gun.jpg // skin\r\n}\r\n}\r\n";
        let script = parse_shader_source(source);
        let gun = script.get("models/gun").unwrap();
        assert_eq!(gun.textures, vec!["models/gun.jpg"]);
        assert!(!gun.text.contains('\r'));
    }

    #[test]
    fn test_commented_out_image_ignored() {
        let source = "textures/a\n{\n{\nmap textures/A.tga // was textures/old.tga\n// map textures/older.jpg\n}\n}\n";
        let script = parse_shader_source(source);
        let a = script.get("textures/a").unwrap();
        assert_eq!(a.textures, vec!["textures/A.tga"]);
        assert!(a.text.contains("was textures/old.tga"));
    }

    #[test]
    fn test_unterminated_shader_dropped() {
        let source = "textures/ok\n{\n{\nmap textures/ok.tga\n}\n}\ntextures/broken\n{\n{\nmap textures/broken.tga\n}\n";
        let script = parse_shader_source(source);

        assert_eq!(script.len(), 1);
        assert!(script.contains("textures/ok"));
        assert!(!script.contains("textures/broken"));
        assert_eq!(script.dropped.as_deref(), Some("textures/broken"));
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let source = "a\n{\n{\nmap one.tga\n}\n}\nA\n{\n{\nmap two.tga\n}\n}\n";
        let script = parse_shader_source(source);
        assert_eq!(script.len(), 1);
        assert_eq!(script.get("a").unwrap().textures, vec!["two.tga"]);
    }

    #[test]
    fn test_nameless_body_skipped() {
        let script = parse_shader_source("{\n}\nreal\n{\n}\n");
        assert_eq!(script.len(), 1);
        assert!(script.get("real").unwrap().textures.is_empty());
    }

    #[test]
    fn test_parse_shader_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.shader");
        std::fs::write(&path, BASE).unwrap();

        let script = parse_shader_script(&path).unwrap();
        assert_eq!(script.to_source(), BASE);
    }

    fn shader_source(defs: &[(String, Vec<String>)]) -> String {
        let mut out = String::new();
        for (name, textures) in defs {
            out.push_str(name);
            out.push_str("\n{\n");
            for texture in textures {
                out.push_str(&format!("\t{{\n\t\tmap {texture}\n\t}}\n"));
            }
            out.push_str("}\n");
        }
        out
    }

    proptest! {
        #[test]
        fn prop_reparse_preserves_textures(
            defs in prop::collection::vec(
                ("[a-z]{1,6}/[a-z0-9_]{1,8}", prop::collection::vec("[a-z]{1,5}/[a-z0-9_]{1,6}\\.(tga|jpg)", 0..4)),
                0..6,
            )
        ) {
            let first = parse_shader_source(&shader_source(&defs));
            let second = parse_shader_source(&first.to_source());

            prop_assert_eq!(first.len(), second.len());
            for def in &first.definitions {
                let again = second.get(&def.name).unwrap();
                prop_assert_eq!(&def.textures, &again.textures);
            }
        }
    }
}
