//! Persistence layer: the on-disk artifact set, atomic publishing and loading.

pub mod artifacts;
pub mod loader;
pub mod matrix;

pub use artifacts::{persist, Manifest, DOCS_FILE, MANIFEST_FILE, META_FILE, VECTORS_FILE};
pub use loader::IndexLoader;
