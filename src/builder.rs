//! Corpus ingestion: read a directory of text files, embed them in one batch
//! and persist the resulting store.

use crate::embedder::{embed_checked, Embedder};
use crate::error::{Result, SearchError};
use crate::persistence::{persist, Manifest};
use crate::storage::{Metadata, VectorStore};
use crate::vector::Vector;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub document_count: usize,
    pub skipped_count: usize,
    /// File names that were empty after trimming
    pub skipped: Vec<String>,
    pub output: PathBuf,
    pub model_id: String,
    pub dimension: usize,
}

/// A document read from the corpus
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusDocument {
    pub source: String,
    pub text: String,
}

/// Files read from a corpus directory, in row order
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents: Vec<CorpusDocument>,
    pub skipped: Vec<String>,
}

/// Builds and persists a [`VectorStore`] from a corpus directory.
pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
    output: PathBuf,
    extensions: Vec<String>,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(embedder: &'a dyn Embedder, output: impl AsRef<Path>) -> Self {
        Self {
            embedder,
            output: output.as_ref().to_path_buf(),
            extensions: vec!["txt".to_string()],
        }
    }

    /// Restrict ingestion to files with these extensions (case-insensitive).
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Build the store for `corpus_dir` without writing anything.
    pub fn build_store(&self, corpus_dir: &Path) -> Result<(VectorStore, Vec<String>)> {
        let corpus = read_corpus(corpus_dir, &self.extensions)?;
        if corpus.documents.is_empty() {
            return Err(SearchError::EmptyCorpus {
                context: corpus_dir.display().to_string(),
            });
        }
        for name in &corpus.skipped {
            log::warn!("Skipping empty document {}", name);
        }

        let (texts, sources): (Vec<String>, Vec<String>) = corpus
            .documents
            .into_iter()
            .map(|d| (d.text, d.source))
            .unzip();

        log::info!(
            "Embedding {} documents with {}",
            texts.len(),
            self.embedder.model_id()
        );
        let vectors = embed_checked(self.embedder, &texts)?;

        let store = VectorStore::build(
            vectors.into_iter().map(Vector::new).collect(),
            texts,
            sources.into_iter().map(Metadata::new).collect(),
        )?;
        Ok((store, corpus.skipped))
    }

    /// Build the store for `corpus_dir` and publish it to the output directory.
    ///
    /// All-or-nothing: any error leaves the previous artifacts in place.
    pub fn build(&self, corpus_dir: &Path) -> Result<BuildReport> {
        let (store, skipped) = self.build_store(corpus_dir)?;
        let manifest = Manifest::for_store(&store, self.embedder.model_id(), skipped.clone());
        persist(&store, &self.output, &manifest)?;

        Ok(BuildReport {
            document_count: store.len(),
            skipped_count: skipped.len(),
            skipped,
            output: self.output.clone(),
            model_id: self.embedder.model_id().to_string(),
            dimension: store.dimension(),
        })
    }
}

/// List and read the corpus files in `dir`, sorted by file name.
///
/// The scan is flat: subdirectories are ignored. Text is trimmed; files that
/// are empty after trimming are reported as skipped.
pub fn read_corpus(dir: &Path, extensions: &[String]) -> Result<Corpus> {
    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SearchError::EmptyCorpus {
            context: format!("{} (directory not found)", dir.display()),
        },
        _ => SearchError::CorpusRead {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SearchError::CorpusRead {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, extensions) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    log::info!("Found {} corpus files in {}", paths.len(), dir.display());

    let mut corpus = Corpus::default();
    for path in paths {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let raw = fs::read_to_string(&path).map_err(|e| SearchError::CorpusRead {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let text = raw.trim();
        if text.is_empty() {
            corpus.skipped.push(source);
        } else {
            corpus.documents.push(CorpusDocument {
                source,
                text: text.to_string(),
            });
        }
    }
    Ok(corpus)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            extensions.iter().any(|want| *want == e)
        })
        .unwrap_or(false)
}
