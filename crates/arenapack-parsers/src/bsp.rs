//! IBSP map reader
//!
//! Extracts the parts of a compiled map that pull in other content: the
//! class names of pickup / model entities, and the texture and effect names
//! referenced by surfaces.
//!
//! # Layout
//!
//! ```text
//! 0       4       8                                     8 + 17 * 8
//! +-------+-------+-------------------------------------+----------
//! | IBSP  | vers. | directory: 17 x (offset i32, len i32) | lumps ...
//! +-------+-------+-------------------------------------+----------
//! ```
//!
//! Texture and effect lumps are arrays of records starting with a 64-byte
//! NUL-padded name. The record size depends on the map revision (68 or 72
//! bytes), see [`LumpStride`].

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binary::{checked_slice, fixed_records, fixed_str, read_i32_at};
use crate::traits::{ParseError, ParseResult, Parser};

/// Magic tag at the start of every map
pub const BSP_MAGIC: &[u8; 4] = b"IBSP";

/// Byte offset of the lump directory
pub const DIRECTORY_OFFSET: usize = 8;

/// Number of directory entries
pub const LUMP_COUNT: usize = 17;

/// Width of the name field in texture and effect records
pub const TEXTURE_NAME_LENGTH: usize = 64;

/// Texture record size of older revisions (name + flags)
pub const LEGACY_TEXTURE_STRIDE: usize = 68;

/// Texture record size of revision 46 (name + flags + contents)
pub const TEXTURE_STRIDE: usize = 72;

/// Substrings identifying entities whose class implies extra content
pub const ENTITY_FILTER: [&str; 4] = ["weapon", "ammo", "item", "misc_model"];

/// Literal separating two entity blocks once the outer braces are stripped
pub const ENTITY_SEPARATOR: &str = "}\n{";

/// Lump indices of the directory table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LumpType {
    Entities = 0,
    Textures,
    Planes,
    Nodes,
    Leafs,
    Leaffaces,
    Leafbrushes,
    Models,
    Brushes,
    Brushsides,
    Vertexes,
    Meshverts,
    Effects,
    Faces,
    Lightmaps,
    Lightvols,
    Visdata,
}

impl LumpType {
    /// All lumps in directory order
    pub const ALL: [LumpType; LUMP_COUNT] = [
        LumpType::Entities,
        LumpType::Textures,
        LumpType::Planes,
        LumpType::Nodes,
        LumpType::Leafs,
        LumpType::Leaffaces,
        LumpType::Leafbrushes,
        LumpType::Models,
        LumpType::Brushes,
        LumpType::Brushsides,
        LumpType::Vertexes,
        LumpType::Meshverts,
        LumpType::Effects,
        LumpType::Faces,
        LumpType::Lightmaps,
        LumpType::Lightvols,
        LumpType::Visdata,
    ];

    /// Lowercase lump name used in errors and logs
    pub fn name(self) -> &'static str {
        match self {
            LumpType::Entities => "entities",
            LumpType::Textures => "textures",
            LumpType::Planes => "planes",
            LumpType::Nodes => "nodes",
            LumpType::Leafs => "leafs",
            LumpType::Leaffaces => "leaffaces",
            LumpType::Leafbrushes => "leafbrushes",
            LumpType::Models => "models",
            LumpType::Brushes => "brushes",
            LumpType::Brushsides => "brushsides",
            LumpType::Vertexes => "vertexes",
            LumpType::Meshverts => "meshverts",
            LumpType::Effects => "effects",
            LumpType::Faces => "faces",
            LumpType::Lightmaps => "lightmaps",
            LumpType::Lightvols => "lightvols",
            LumpType::Visdata => "visdata",
        }
    }
}

/// One directory entry, validated against the file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lump {
    /// Byte offset from the file start
    pub offset: usize,
    /// Length in bytes
    pub length: usize,
}

/// Parsed directory table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BspDirectory {
    /// Version field following the magic
    pub version: i32,
    lumps: [Lump; LUMP_COUNT],
}

impl BspDirectory {
    /// Directory entry of a lump
    pub fn lump(&self, lump: LumpType) -> Lump {
        self.lumps[lump as usize]
    }

    /// Borrow the bytes of a lump from the file it was parsed from
    pub fn lump_data<'a>(&self, data: &'a [u8], lump: LumpType) -> ParseResult<&'a [u8]> {
        let entry = self.lump(lump);
        checked_slice(data, entry.offset, entry.length)
    }
}

/// Record size used for texture and effect lumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LumpStride {
    /// Pick whichever known stride divides the lump length
    #[default]
    Auto,
    /// Always use this stride
    Fixed(usize),
}

impl LumpStride {
    /// Resolve the stride for a texture or effect lump
    ///
    /// With `Auto`, a length both strides divide is settled by the name
    /// fields: the first stride whose names are NUL-padded wins, 72 if
    /// neither is.
    pub fn resolve(self, lump: LumpType, records: &[u8]) -> ParseResult<usize> {
        match self {
            LumpStride::Fixed(stride) if stride >= TEXTURE_NAME_LENGTH => Ok(stride),
            LumpStride::Fixed(stride) => Err(ParseError::InvalidStructure(format!(
                "record stride {stride} is shorter than the {TEXTURE_NAME_LENGTH}-byte name"
            ))),
            LumpStride::Auto => {
                let fits: Vec<usize> = [TEXTURE_STRIDE, LEGACY_TEXTURE_STRIDE]
                    .into_iter()
                    .filter(|stride| records.len() % stride == 0)
                    .collect();

                match fits.as_slice() {
                    [] => Err(ParseError::InvalidLumpSize {
                        lump: lump.name(),
                        length: records.len(),
                        stride: TEXTURE_STRIDE,
                    }),
                    [only] => Ok(*only),
                    _ => {
                        let stride = fits
                            .iter()
                            .copied()
                            .find(|&stride| names_padded(records, stride))
                            .unwrap_or(TEXTURE_STRIDE);
                        debug!(lump = lump.name(), length = records.len(), stride, "Ambiguous record stride");
                        Ok(stride)
                    }
                }
            }
        }
    }
}

/// Whether every name field is NUL from its first NUL to the end
fn names_padded(records: &[u8], stride: usize) -> bool {
    records.chunks_exact(stride).all(|record| {
        let name = &record[..TEXTURE_NAME_LENGTH];
        match name.iter().position(|&b| b == 0) {
            Some(end) => name[end..].iter().all(|&b| b == 0),
            None => true,
        }
    })
}

/// Options for reading map dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapReadOptions {
    /// Texture / effect record size
    pub stride: LumpStride,
    /// Entity class names are kept if they contain any of these
    pub entity_filter: Vec<String>,
}

impl Default for MapReadOptions {
    fn default() -> Self {
        Self {
            stride: LumpStride::Auto,
            entity_filter: ENTITY_FILTER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Content referenced by a map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDependencies {
    /// Filtered entity class names
    pub entity_class_names: BTreeSet<String>,
    /// Texture names in record order
    pub texture_names: Vec<String>,
    /// Effect names in record order
    pub effect_names: Vec<String>,
    /// Record size the texture lump was read with
    pub texture_stride: usize,
}

/// Parse the magic and directory table
pub fn parse_directory(data: &[u8]) -> ParseResult<BspDirectory> {
    let magic = checked_slice(data, 0, 4).unwrap_or(data);
    if magic != BSP_MAGIC {
        return Err(ParseError::InvalidMagic {
            expected: BSP_MAGIC.to_vec(),
            found: magic.to_vec(),
        });
    }

    let version = read_i32_at(data, 4)?;
    let mut lumps = [Lump { offset: 0, length: 0 }; LUMP_COUNT];

    for (index, lump_type) in LumpType::ALL.iter().enumerate() {
        let entry = DIRECTORY_OFFSET + index * 8;
        let offset = read_i32_at(data, entry)?;
        let length = read_i32_at(data, entry + 4)?;

        let (offset, length) = match (usize::try_from(offset), usize::try_from(length)) {
            (Ok(o), Ok(l)) => (o, l),
            _ => {
                return Err(ParseError::InvalidStructure(format!(
                    "negative directory entry for {} lump: offset {offset}, length {length}",
                    lump_type.name()
                )))
            }
        };

        // Range check only; the bytes are borrowed later.
        checked_slice(data, offset, length)
            .map_err(|e| e.with_context(format!("{} lump", lump_type.name())))?;
        lumps[index] = Lump { offset, length };
    }

    debug!(version, "Parsed map directory");
    Ok(BspDirectory { version, lumps })
}

/// Extract the filtered set of entity class names from the entity lump
pub fn parse_entity_class_names(lump: &[u8], filter: &[String]) -> BTreeSet<String> {
    let text = String::from_utf8_lossy(lump).replace("\r\n", "\n");
    let text = text.trim_matches(|c: char| c == '\0' || c == '{' || c == '}' || c.is_whitespace());

    let mut names = BTreeSet::new();
    if text.is_empty() {
        return names;
    }

    for (index, block) in text.split(ENTITY_SEPARATOR).enumerate() {
        let tokens: Vec<&str> = block.split('"').collect();
        let class_name = tokens
            .iter()
            .position(|t| *t == "classname")
            .and_then(|pos| tokens.get(pos + 2));

        match class_name {
            Some(name) => {
                if filter.iter().any(|f| name.contains(f.as_str())) {
                    names.insert(name.to_string());
                }
            }
            None => debug!(block = index, "Entity without classname skipped"),
        }
    }

    names
}

/// Read the names of a texture-layout lump (textures or effects)
pub fn parse_name_records(lump: &[u8], stride: usize, lump_type: LumpType) -> ParseResult<Vec<String>> {
    let records = fixed_records(lump, stride, lump_type.name())?;
    Ok(records
        .map(|record| fixed_str(&record[..TEXTURE_NAME_LENGTH]))
        .collect())
}

/// Extract entity, texture and effect references from a map held in memory
pub fn parse_map_dependencies(data: &[u8], options: &MapReadOptions) -> ParseResult<MapDependencies> {
    let directory = parse_directory(data)?;

    let entities = directory.lump_data(data, LumpType::Entities)?;
    let textures = directory.lump_data(data, LumpType::Textures)?;
    let effects = directory.lump_data(data, LumpType::Effects)?;

    // One stride for both lumps; an empty texture lump says nothing about it.
    let texture_stride = if textures.is_empty() {
        options.stride.resolve(LumpType::Effects, effects)?
    } else {
        options.stride.resolve(LumpType::Textures, textures)?
    };

    let deps = MapDependencies {
        entity_class_names: parse_entity_class_names(entities, &options.entity_filter),
        texture_names: parse_name_records(textures, texture_stride, LumpType::Textures)?,
        effect_names: parse_name_records(effects, texture_stride, LumpType::Effects)?,
        texture_stride,
    };

    debug!(
        entities = deps.entity_class_names.len(),
        textures = deps.texture_names.len(),
        effects = deps.effect_names.len(),
        stride = texture_stride,
        "Read map dependencies"
    );

    Ok(deps)
}

/// Read map dependencies from a file with default options
pub fn read_map_dependencies(path: impl AsRef<Path>) -> ParseResult<MapDependencies> {
    BspParser::default().parse_file(path.as_ref())
}

/// Map parser
#[derive(Debug, Clone, Default)]
pub struct BspParser {
    options: MapReadOptions,
}

impl BspParser {
    /// Parser with the default stride selection and entity filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser with explicit options
    pub fn with_options(options: MapReadOptions) -> Self {
        Self { options }
    }
}

impl Parser for BspParser {
    type Output = MapDependencies;

    fn extensions(&self) -> &[&str] {
        &["bsp"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(BSP_MAGIC.as_slice())
    }

    fn name(&self) -> &str {
        "IBSP Map Parser"
    }

    fn parse_bytes(&self, data: &[u8]) -> ParseResult<MapDependencies> {
        parse_map_dependencies(data, &self.options)
    }
}
