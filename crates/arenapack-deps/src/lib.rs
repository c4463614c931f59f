//! arenapack dependency resolution
//!
//! Computes what a map, weapon model or player model needs at runtime:
//! - Shader lookup across a directory of `.shader` scripts
//! - One aggregated script per job with exactly the matched definitions
//! - The full file closure, ready for packing
//!
//! # Example
//!
//! ```rust,ignore
//! use arenapack_deps::{CollectorConfig, DependencyCollector};
//! use arenapack_vfs::FilesystemStore;
//!
//! let config = CollectorConfig::default();
//! let store = FilesystemStore::new(&config.content_root)?;
//! let closure = DependencyCollector::new(&store, &config).collect_map("maps/arena1.bsp")?;
//!
//! println!("{} files, {} unresolved", closure.files.len(), closure.unresolved.len());
//! ```

pub mod closure;
pub mod config;
pub mod error;
pub mod resolver;

pub use closure::{pack_closure, Closure, DependencyCollector};
pub use config::CollectorConfig;
pub use error::{ResolveError, ResolveResult};
pub use resolver::{
    lint_clamp_collisions, resolve_shader_dependencies, AggregatedScript, DependencyResult, ScriptCorpus,
};
