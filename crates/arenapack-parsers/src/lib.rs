//! arenapack-parsers
//!
//! Readers for the id Tech 3 content formats that reference other content.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | IBSP   | `.bsp`    | Compiled map (entities, textures, effects) |
//! | IDP3   | `.md3`    | Skeletal model (per-surface shaders) |
//! | SKIN   | `.skin`   | Surface to shader assignment |
//! | SHADER | `.shader` | Shader script (definitions, stage images) |
//!
//! # Example
//!
//! ```rust,ignore
//! use arenapack_parsers::{BspParser, Parser};
//!
//! let deps = BspParser::new().parse_file("maps/arena1.bsp".as_ref())?;
//! println!("{} textures", deps.texture_names.len());
//! ```

pub mod binary;
pub mod bsp;
pub mod logging;
pub mod md3;
pub mod shader;
pub mod skin;
pub mod traits;

// Re-export main types
pub use traits::{ParseError, ParseResult, Parser};

pub use bsp::{
    parse_map_dependencies, read_map_dependencies, BspParser, LumpStride, LumpType,
    MapDependencies, MapReadOptions,
};
pub use md3::{
    parse_model, parse_model_shader_refs, read_model_shader_refs, Md3Model, Md3Parser,
    Md3Surface, ShaderRef,
};
pub use shader::{
    find_clamp_collisions, parse_shader_script, parse_shader_source, ClampCollision,
    ShaderDefinition, ShaderParser, ShaderScript,
};
pub use skin::{parse_skin, read_skin_shader_names, SkinParser};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
