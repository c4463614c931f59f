//! Integration tests for the content format readers
//!
//! These tests drive the public API only:
//! - Map directory and lump decoding through `BspParser`
//! - Model surface chains through `Md3Parser`
//! - Format detection by extension and magic
//! - Error conversion into the unified error type

use arenapack_parsers::bsp::{DIRECTORY_OFFSET, LUMP_COUNT, TEXTURE_NAME_LENGTH};
use arenapack_parsers::md3::{MD3_HEADER_SIZE, MD3_SHADER_SIZE, MD3_SURFACE_HEADER_SIZE};
use arenapack_parsers::{
    BspParser, LumpStride, LumpType, MapReadOptions, Md3Parser, Parser, ShaderParser, SkinParser,
};

/// Map with the given entity text and 68-byte texture records
fn legacy_map(entities: &str, textures: &[&str]) -> Vec<u8> {
    let header = DIRECTORY_OFFSET + LUMP_COUNT * 8;
    let mut lump = Vec::new();
    for name in textures {
        let mut record = vec![0u8; 68];
        record[..name.len()].copy_from_slice(name.as_bytes());
        // flags after the name must not leak into it
        record[TEXTURE_NAME_LENGTH] = 0xFF;
        lump.extend(record);
    }

    let mut data = vec![0u8; header];
    data[..4].copy_from_slice(b"IBSP");
    data[4..8].copy_from_slice(&46i32.to_le_bytes());

    let entities_at = header;
    let textures_at = entities_at + entities.len();
    let end = textures_at + lump.len();

    let mut put = |lump: LumpType, offset: usize, length: usize| {
        let at = DIRECTORY_OFFSET + lump as usize * 8;
        data[at..at + 4].copy_from_slice(&(offset as i32).to_le_bytes());
        data[at + 4..at + 8].copy_from_slice(&(length as i32).to_le_bytes());
    };
    for lump_type in LumpType::ALL {
        put(lump_type, end, 0);
    }
    put(LumpType::Entities, entities_at, entities.len());
    put(LumpType::Textures, textures_at, lump.len());

    data.extend_from_slice(entities.as_bytes());
    data.extend(lump);
    data
}

fn single_surface_model(shader: &str) -> Vec<u8> {
    let surface_at = MD3_HEADER_SIZE;
    let surface_len = MD3_SURFACE_HEADER_SIZE + MD3_SHADER_SIZE;
    let mut data = vec![0u8; surface_at + surface_len];
    let end = data.len() as i32;

    data[..4].copy_from_slice(b"IDP3");
    data[84..88].copy_from_slice(&1i32.to_le_bytes());
    data[100..104].copy_from_slice(&(surface_at as i32).to_le_bytes());
    data[104..108].copy_from_slice(&end.to_le_bytes());

    let s = surface_at;
    data[s..s + 4].copy_from_slice(b"IDP3");
    data[s + 76..s + 80].copy_from_slice(&1i32.to_le_bytes());
    data[s + 92..s + 96].copy_from_slice(&(MD3_SURFACE_HEADER_SIZE as i32).to_le_bytes());
    data[s + 104..s + 108].copy_from_slice(&(surface_len as i32).to_le_bytes());
    let name_at = s + MD3_SURFACE_HEADER_SIZE;
    data[name_at..name_at + shader.len()].copy_from_slice(shader.as_bytes());
    data
}

#[test]
fn test_legacy_map_auto_stride() {
    let data = legacy_map(
        "{\n\"classname\" \"worldspawn\"\n}\n{\n\"classname\" \"ammo_shells\"\n}",
        &["textures/gothic/wall1", "textures/gothic/floor2", "textures/gothic/trim"],
    );

    let deps = BspParser::new().parse_bytes(&data).unwrap();
    assert_eq!(deps.texture_stride, 68);
    assert_eq!(
        deps.texture_names,
        vec!["textures/gothic/wall1", "textures/gothic/floor2", "textures/gothic/trim"]
    );
    assert!(deps.effect_names.is_empty());
    assert_eq!(deps.entity_class_names.iter().collect::<Vec<_>>(), vec!["ammo_shells"]);
}

#[test]
fn test_custom_entity_filter() {
    let data = legacy_map("{\n\"classname\" \"target_speaker\"\n}", &[]);
    let options = MapReadOptions {
        stride: LumpStride::Fixed(68),
        entity_filter: vec!["speaker".to_string()],
    };

    let deps = BspParser::with_options(options).parse_bytes(&data).unwrap();
    assert!(deps.entity_class_names.contains("target_speaker"));
}

#[test]
fn test_truncated_map_is_format_error() {
    let data = legacy_map("", &["textures/a"]);
    let truncated = &data[..data.len() - 10];

    let err = BspParser::new().parse_bytes(truncated).unwrap_err();
    assert!(err.is_format_error());

    let core: arenapack_core::Error = err.into();
    assert!(core.is_format_error());
}

#[test]
fn test_model_parse_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lower.md3");
    std::fs::write(&path, single_surface_model("models/players/sarge/band")).unwrap();

    let model = Md3Parser::new().parse_file(&path).unwrap();
    assert_eq!(model.surfaces.len(), 1);
    assert_eq!(model.shader_refs()[0].name, "models/players/sarge/band");
}

#[test]
fn test_detection_by_magic() {
    let dir = tempfile::tempdir().unwrap();
    let renamed = dir.path().join("mystery.dat");
    std::fs::write(&renamed, single_surface_model("x")).unwrap();

    assert!(Md3Parser::new().can_parse(&renamed));
    assert!(!BspParser::new().can_parse(&renamed));
    assert!(ShaderParser::new().can_parse(std::path::Path::new("scripts/base.SHADER")));
    assert!(SkinParser.can_parse(std::path::Path::new("models/players/sarge/head_default.skin")));
}
