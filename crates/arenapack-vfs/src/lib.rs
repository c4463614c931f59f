//! arenapack content stores
//!
//! Provides a uniform view over the places content can live:
//! - Local content directories (`FilesystemStore`)
//! - In-memory trees for tests and generated content (`MemoryStore`)
//!
//! # Example
//! ```no_run
//! use arenapack_vfs::{FileStore, FilesystemStore};
//!
//! let store = FilesystemStore::new("/path/to/baseoa").unwrap();
//!
//! if store.exists("maps/arena1.bsp") {
//!     let data = store.read("maps/arena1.bsp").unwrap();
//!     println!("{} bytes", data.len());
//! }
//! ```

pub mod filesystem;
pub mod memory;
pub mod node;
pub mod path;
pub mod store;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use node::{NodeType, StoreNode};
pub use store::{FileStore, StoreError, StoreResult};
