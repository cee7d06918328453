//! Artifact set: vector matrix, document list, metadata list and manifest.
//!
//! A set is written into a staging directory next to the destination and only
//! swapped into place once every file is on disk, so readers never observe a
//! partial set.

use crate::error::{Result, SearchError};
use crate::persistence::matrix::{self, FORMAT_VERSION};
use crate::storage::VectorStore;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const VECTORS_FILE: &str = "vectors.bin";
pub const DOCS_FILE: &str = "docs.json";
pub const META_FILE: &str = "meta.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Human-readable summary written alongside the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub model_id: String,
    pub dimension: usize,
    pub document_count: usize,
    #[serde(default)]
    pub skipped: Vec<String>,
    pub built_at_epoch_ms: u64,
}

impl Manifest {
    pub fn for_store(store: &VectorStore, model_id: impl Into<String>, skipped: Vec<String>) -> Self {
        let built_at_epoch_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            format_version: FORMAT_VERSION,
            model_id: model_id.into(),
            dimension: store.dimension(),
            document_count: store.len(),
            skipped,
            built_at_epoch_ms,
        }
    }
}

/// Write `store` to `out_dir`, replacing any previous artifact set.
///
/// On failure the staging directory is removed and `out_dir` is untouched.
pub fn persist(store: &VectorStore, out_dir: &Path, manifest: &Manifest) -> Result<()> {
    let staging = sibling(out_dir, "staging")?;
    if let Some(parent) = staging.parent() {
        fs::create_dir_all(parent)?;
    }
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    if let Err(e) = write_set(store, &staging, manifest) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    publish(&staging, out_dir)?;
    log::info!(
        "Persisted {} documents (dimension {}) to {}",
        store.len(),
        store.dimension(),
        out_dir.display()
    );
    Ok(())
}

fn write_set(store: &VectorStore, dir: &Path, manifest: &Manifest) -> Result<()> {
    matrix::write_matrix(&dir.join(VECTORS_FILE), store.index())?;
    write_json(&dir.join(DOCS_FILE), store.documents())?;
    write_json(&dir.join(META_FILE), store.metadata())?;
    write_json(&dir.join(MANIFEST_FILE), manifest)?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| SearchError::Serialization(format!("{}: {}", path.display(), e)))?;
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| SearchError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Swap `staging` into `out_dir`. An existing set is moved aside first and
/// restored if the final rename fails.
fn publish(staging: &Path, out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        fs::rename(staging, out_dir)?;
        return Ok(());
    }

    let backup = sibling(out_dir, "old")?;
    if backup.exists() {
        fs::remove_dir_all(&backup)?;
    }
    fs::rename(out_dir, &backup)?;

    if let Err(e) = fs::rename(staging, out_dir) {
        let _ = fs::rename(&backup, out_dir);
        let _ = fs::remove_dir_all(staging);
        return Err(e.into());
    }

    if let Err(e) = fs::remove_dir_all(&backup) {
        log::warn!("Could not remove previous artifacts {}: {}", backup.display(), e);
    }
    Ok(())
}

/// Hidden directory beside `dir`, e.g. `.artifacts.staging-1234`.
fn sibling(dir: &Path, tag: &str) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        SearchError::InvalidArgument(format!("artifact path {} has no name", dir.display()))
    })?;
    let parent = dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(
        ".{}.{}-{}",
        name.to_string_lossy(),
        tag,
        std::process::id()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Metadata;
    use crate::vector::Vector;
    use tempfile::TempDir;

    fn store(docs: &[&str]) -> VectorStore {
        VectorStore::build(
            docs.iter()
                .enumerate()
                .map(|(i, _)| Vector::new(vec![1.0, i as f32]))
                .collect(),
            docs.iter().map(|d| d.to_string()).collect(),
            docs.iter()
                .enumerate()
                .map(|(i, _)| Metadata::new(format!("{}.txt", i)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_persist_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("artifacts");
        let s = store(&["alpha", "beta"]);
        let manifest = Manifest::for_store(&s, "test-model", vec!["empty.txt".into()]);

        persist(&s, &out, &manifest).unwrap();

        for name in [VECTORS_FILE, DOCS_FILE, META_FILE, MANIFEST_FILE] {
            assert!(out.join(name).is_file(), "missing {}", name);
        }
        let docs: Vec<String> =
            serde_json::from_slice(&fs::read(out.join(DOCS_FILE)).unwrap()).unwrap();
        assert_eq!(docs, vec!["alpha", "beta"]);
        let meta: serde_json::Value =
            serde_json::from_slice(&fs::read(out.join(META_FILE)).unwrap()).unwrap();
        assert_eq!(meta[1]["source"], "1.txt");
        let m: Manifest =
            serde_json::from_slice(&fs::read(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(m.document_count, 2);
        assert_eq!(m.skipped, vec!["empty.txt".to_string()]);
    }

    #[test]
    fn test_persist_replaces_previous_set() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("artifacts");

        let first = store(&["one", "two", "three"]);
        persist(&first, &out, &Manifest::for_store(&first, "m", vec![])).unwrap();
        fs::write(out.join("stray.txt"), "left over").unwrap();

        let second = store(&["only"]);
        persist(&second, &out, &Manifest::for_store(&second, "m", vec![])).unwrap();

        let docs: Vec<String> =
            serde_json::from_slice(&fs::read(out.join(DOCS_FILE)).unwrap()).unwrap();
        assert_eq!(docs, vec!["only"]);
        assert!(!out.join("stray.txt").exists());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "unexpected entries: {:?}", leftovers);
    }

    #[test]
    fn test_sibling_names() {
        let s = sibling(Path::new("out/artifacts"), "staging").unwrap();
        assert_eq!(s.parent().unwrap(), Path::new("out"));
        assert!(s
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(".artifacts.staging-"));

        let bare = sibling(Path::new("artifacts"), "old").unwrap();
        assert_eq!(bare.parent().unwrap(), Path::new("."));
        assert!(sibling(Path::new("/"), "old").is_err());
    }
}
