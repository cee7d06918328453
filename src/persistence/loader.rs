//! Reconstruct a [`VectorStore`] from a persisted artifact set.

use crate::error::{Result, SearchError};
use crate::persistence::artifacts::{Manifest, DOCS_FILE, MANIFEST_FILE, META_FILE, VECTORS_FILE};
use crate::persistence::matrix;
use crate::storage::{Metadata, VectorStore};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads artifact sets written by [`crate::persistence::persist`].
///
/// Stored rows are used as-is: nothing is re-embedded or re-normalized.
#[derive(Debug, Clone)]
pub struct IndexLoader {
    dir: PathBuf,
}

impl IndexLoader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load the artifact set in `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<VectorStore> {
        Self::new(dir).load_store().map(|(store, _)| store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the store together with its manifest, if one was written.
    pub fn load_store(&self) -> Result<(VectorStore, Option<Manifest>)> {
        let vectors_path = self.dir.join(VECTORS_FILE);
        let docs_path = self.dir.join(DOCS_FILE);
        let meta_path = self.dir.join(META_FILE);

        for path in [&vectors_path, &docs_path, &meta_path] {
            if !path.is_file() {
                return Err(SearchError::ArtifactMissing { path: path.clone() });
            }
        }

        log::info!("Loading index from {}", self.dir.display());
        let index = matrix::read_matrix(&vectors_path)?;
        let documents: Vec<String> = read_json(&docs_path)?;
        let metadata: Vec<Metadata> = read_json(&meta_path)?;

        if documents.len() != index.len() || metadata.len() != index.len() {
            return Err(SearchError::corrupt(
                &self.dir,
                format!(
                    "row counts disagree: {} vectors, {} documents, {} metadata records",
                    index.len(),
                    documents.len(),
                    metadata.len()
                ),
            ));
        }

        let manifest = self.read_manifest()?;
        if let Some(m) = &manifest {
            if m.document_count != index.len() || m.dimension != index.dimension() {
                return Err(SearchError::corrupt(
                    self.dir.join(MANIFEST_FILE),
                    format!(
                        "manifest describes {} x {}, artifacts hold {} x {}",
                        m.document_count,
                        m.dimension,
                        index.len(),
                        index.dimension()
                    ),
                ));
            }
        }

        let store = VectorStore::from_parts(index, documents, metadata)
            .map_err(|e| SearchError::corrupt(&self.dir, e.to_string()))?;
        log::info!(
            "Loaded {} documents (dimension {})",
            store.len(),
            store.dimension()
        );
        Ok((store, manifest))
    }

    /// Read the manifest on its own; `None` when the set has none.
    pub fn read_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| SearchError::corrupt(path, e.to_string()))
}
