//! IDP3 (MD3) model reader
//!
//! Only the parts needed to find the shaders a model uses are decoded: the
//! header, the surface chain and each surface's shader table.
//!
//! # Layout
//!
//! ```text
//! header (108 bytes, at 0)
//!   ident "IDP3" | version | name[64] | flags | frames | tags | surfaces
//!   | skins | ofs_frames | ofs_tags | ofs_surfaces | ofs_end
//!
//! surface (at ofs_surfaces, then start + ofs_end of the previous one)
//!   ident | name[64] | flags | frames | shaders | verts | triangles
//!   | ofs_triangles | ofs_shaders | ofs_st | ofs_xyznormal | ofs_end
//!
//! shader record (at surface start + ofs_shaders)
//!   name[64] | index i32
//! ```
//!
//! All surface offsets are relative to the start of their own surface.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::binary::BinaryCursor;
use crate::traits::{ParseResult, Parser};

/// Magic tag at the start of every model and surface
pub const MD3_MAGIC: &[u8; 4] = b"IDP3";

/// Size of the model header
pub const MD3_HEADER_SIZE: usize = 108;

/// Size of a surface header, including its ident
pub const MD3_SURFACE_HEADER_SIZE: usize = 108;

/// Width of every name field
pub const MD3_NAME_LENGTH: usize = 64;

/// Size of one shader record
pub const MD3_SHADER_SIZE: usize = MD3_NAME_LENGTH + 4;

/// Model header fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Md3Header {
    /// Format version (15 for shipped models)
    pub version: i32,
    /// Internal model name
    pub name: String,
    /// Model flags, unused
    pub flags: i32,
    /// Animation frames
    pub num_frames: usize,
    /// Attachment tags per frame
    pub num_tags: usize,
    /// Surfaces following the header
    pub num_surfaces: usize,
    /// Unused by the engine
    pub num_skins: usize,
    /// Offset of the frame table from the file start
    pub ofs_frames: usize,
    /// Offset of the tag table from the file start
    pub ofs_tags: usize,
    /// Offset of the first surface from the file start
    pub ofs_surfaces: usize,
    /// Offset just past the model
    pub ofs_end: usize,
}

/// A shader referenced by a surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderRef {
    /// Shader or image path, NUL padding removed
    pub name: String,
    /// Engine-side shader index (usually 0 on disk)
    pub index: i32,
}

/// One surface of a model, with offsets resolved to absolute positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Md3Surface {
    /// Surface name, NUL padding removed
    pub name: String,
    /// Absolute offset of the surface ident
    pub start: usize,
    /// Absolute offset of the shader table
    pub shader_offset: usize,
    /// Absolute offset just past this surface
    pub end: usize,
    /// Animation frames (matches the header)
    pub num_frames: usize,
    /// Vertices per frame
    pub num_vertices: usize,
    /// Triangle count
    pub num_triangles: usize,
    /// Shader table in file order
    pub shaders: Vec<ShaderRef>,
}

/// Parsed model: header and surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Md3Model {
    /// Model header
    pub header: Md3Header,
    /// Surfaces in file order
    pub surfaces: Vec<Md3Surface>,
}

impl Md3Model {
    /// Every shader reference, surface by surface
    pub fn shader_refs(&self) -> Vec<ShaderRef> {
        self.surfaces
            .iter()
            .flat_map(|surface| surface.shaders.iter().cloned())
            .collect()
    }
}

fn parse_header(cursor: &mut BinaryCursor<'_>) -> ParseResult<Md3Header> {
    cursor.expect_magic(MD3_MAGIC)?;

    Ok(Md3Header {
        version: cursor.read_i32()?,
        name: cursor.read_fixed_str(MD3_NAME_LENGTH)?,
        flags: cursor.read_i32()?,
        num_frames: cursor.read_count("frame count")?,
        num_tags: cursor.read_count("tag count")?,
        num_surfaces: cursor.read_count("surface count")?,
        num_skins: cursor.read_count("skin count")?,
        ofs_frames: cursor.read_count("frame offset")?,
        ofs_tags: cursor.read_count("tag offset")?,
        ofs_surfaces: cursor.read_count("surface offset")?,
        ofs_end: cursor.read_count("end offset")?,
    })
}

fn parse_surface(cursor: &mut BinaryCursor<'_>) -> ParseResult<Md3Surface> {
    let origin = cursor.mark();

    // Surface ident; real files repeat "IDP3" here but it is not relied on.
    cursor.skip(4)?;
    let name = cursor.read_fixed_str(MD3_NAME_LENGTH)?;
    let _flags = cursor.read_i32()?;
    let num_frames = cursor.read_count("surface frame count")?;
    let num_shaders = cursor.read_count("surface shader count")?;
    let num_vertices = cursor.read_count("surface vertex count")?;
    let num_triangles = cursor.read_count("surface triangle count")?;
    let _ofs_triangles = cursor.read_i32()?;
    let ofs_shaders = cursor.read_i32()?;
    let _ofs_st = cursor.read_i32()?;
    let _ofs_xyznormal = cursor.read_i32()?;
    let ofs_end = cursor.read_i32()?;

    let shader_offset = origin.resolve(ofs_shaders)?;
    let end = origin.resolve(ofs_end)?;

    cursor.seek(shader_offset)?;
    let mut shaders = Vec::with_capacity(num_shaders.min(cursor.len() / MD3_SHADER_SIZE));
    for _ in 0..num_shaders {
        let name = cursor.read_fixed_str(MD3_NAME_LENGTH)?;
        let index = cursor.read_i32()?;
        trace!(surface = %origin.offset(), shader = %name, index, "Shader reference");
        shaders.push(ShaderRef { name, index });
    }

    cursor.seek(end)?;

    Ok(Md3Surface {
        name,
        start: origin.offset(),
        shader_offset,
        end,
        num_frames,
        num_vertices,
        num_triangles,
        shaders,
    })
}

/// Parse the header and the whole surface chain of a model
pub fn parse_model(data: &[u8]) -> ParseResult<Md3Model> {
    let mut cursor = BinaryCursor::new(data);
    let header = parse_header(&mut cursor).map_err(|e| e.with_context("model header"))?;

    cursor.seek(header.ofs_surfaces)?;
    let mut surfaces = Vec::with_capacity(header.num_surfaces.min(data.len() / MD3_SURFACE_HEADER_SIZE));
    for index in 0..header.num_surfaces {
        let surface = parse_surface(&mut cursor)
            .map_err(|e| e.with_context(format!("surface {index}")))?;
        surfaces.push(surface);
    }

    debug!(
        model = %header.name,
        surfaces = surfaces.len(),
        "Parsed model"
    );

    Ok(Md3Model { header, surfaces })
}

/// Every shader reference of a model held in memory
pub fn parse_model_shader_refs(data: &[u8]) -> ParseResult<Vec<ShaderRef>> {
    parse_model(data).map(|model| model.shader_refs())
}

/// Every shader reference of a model file
pub fn read_model_shader_refs(path: impl AsRef<Path>) -> ParseResult<Vec<ShaderRef>> {
    Md3Parser::new()
        .parse_file(path.as_ref())
        .map(|model| model.shader_refs())
}

/// Model parser
#[derive(Debug, Clone, Copy, Default)]
pub struct Md3Parser;

impl Md3Parser {
    /// Create a model parser
    pub fn new() -> Self {
        Self
    }
}

impl Parser for Md3Parser {
    type Output = Md3Model;

    fn extensions(&self) -> &[&str] {
        &["md3"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(MD3_MAGIC.as_slice())
    }

    fn name(&self) -> &str {
        "IDP3 Model Parser"
    }

    fn parse_bytes(&self, data: &[u8]) -> ParseResult<Md3Model> {
        parse_model(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ParseError;

    fn put_i32(data: &mut [u8], at: usize, value: i32) {
        data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_name(data: &mut [u8], at: usize, name: &str) {
        data[at..at + name.len()].copy_from_slice(name.as_bytes());
    }

    /// A surface with `shaders` records placed right after its header and
    /// `padding` extra bytes standing in for geometry.
    fn surface(name: &str, shaders: &[&str], padding: usize) -> Vec<u8> {
        let table = MD3_SURFACE_HEADER_SIZE;
        let end = table + shaders.len() * MD3_SHADER_SIZE + padding;
        let mut data = vec![0u8; end];

        data[..4].copy_from_slice(MD3_MAGIC);
        put_name(&mut data, 4, name);
        put_i32(&mut data, 76, shaders.len() as i32);
        put_i32(&mut data, 92, table as i32);
        put_i32(&mut data, 104, end as i32);

        for (i, shader) in shaders.iter().enumerate() {
            let at = table + i * MD3_SHADER_SIZE;
            put_name(&mut data, at, shader);
            put_i32(&mut data, at + MD3_NAME_LENGTH, i as i32);
        }
        data
    }

    fn model(surfaces: &[Vec<u8>], gap: usize) -> Vec<u8> {
        let mut data = vec![0u8; MD3_HEADER_SIZE + gap];
        data[..4].copy_from_slice(MD3_MAGIC);
        put_i32(&mut data, 4, 15);
        put_name(&mut data, 8, "models/weapons2/gun/gun.md3");
        put_i32(&mut data, 76, 1);
        put_i32(&mut data, 84, surfaces.len() as i32);
        put_i32(&mut data, 100, (MD3_HEADER_SIZE + gap) as i32);
        for s in surfaces {
            data.extend_from_slice(s);
        }
        let end = data.len() as i32;
        put_i32(&mut data, 104, end);
        data
    }

    #[test]
    fn test_three_surface_traversal() {
        let surfaces = vec![
            surface("barrel", &["models/weapons2/gun/barrel.tga"], 12),
            surface("grip", &["models/weapons2/gun/grip", "models/weapons2/gun/grip_glow"], 0),
            surface("flash", &["models/weapons2/gun/flash.jpg"], 40),
        ];
        let data = model(&surfaces, 20);

        let parsed = parse_model(&data).unwrap();
        assert_eq!(parsed.header.num_surfaces, 3);
        assert_eq!(parsed.surfaces.len(), 3);

        // Hand-computed absolute offsets: header 108 + gap 20.
        let first = 128;
        let second = first + 108 + 68 + 12;
        let third = second + 108 + 2 * 68;
        let starts: Vec<usize> = parsed.surfaces.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![first, second, third]);
        assert_eq!(parsed.surfaces[1].shader_offset, second + 108);
        assert_eq!(parsed.surfaces[2].end, data.len());

        let names: Vec<String> = parsed.shader_refs().into_iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "models/weapons2/gun/barrel.tga",
                "models/weapons2/gun/grip",
                "models/weapons2/gun/grip_glow",
                "models/weapons2/gun/flash.jpg",
            ]
        );
        assert_eq!(parsed.surfaces[1].shaders[1].index, 1);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut data = model(&[], 0);
        data[..4].copy_from_slice(b"IBSP");
        let err = parse_model(&data).unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("model header"));
    }

    #[test]
    fn test_surface_offset_past_end() {
        let mut data = model(&[surface("s", &["a"], 0)], 0);
        put_i32(&mut data, 84, 2);
        assert!(parse_model(&data).is_err());
    }

    #[test]
    fn test_negative_shader_offset() {
        let mut s = surface("s", &["a"], 0);
        put_i32(&mut s, 92, -4);
        let data = model(&[s], 0);

        match parse_model(&data) {
            Err(ParseError::Nested { context, source }) => {
                assert_eq!(context, "surface 0");
                assert!(matches!(*source, ParseError::InvalidStructure(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut data = model(&[], 0);
        put_i32(&mut data, 84, -1);
        assert!(parse_model(&data).is_err());
    }

    #[test]
    fn test_read_model_shader_refs_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gun.md3");
        std::fs::write(&path, model(&[surface("s", &["models/gun/skin"], 4)], 0)).unwrap();

        let refs = read_model_shader_refs(&path).unwrap();
        assert_eq!(refs, vec![ShaderRef { name: "models/gun/skin".into(), index: 0 }]);
    }
}
