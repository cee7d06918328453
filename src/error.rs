//! Error types for indexing and search

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types that can occur while building, loading or querying an index
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Empty corpus: no indexable documents in {context}")]
    EmptyCorpus { context: String },

    #[error("Failed to read corpus file {}: {reason}", path.display())]
    CorpusRead { path: PathBuf, reason: String },

    #[error("Dimension mismatch at {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Degenerate vector at {context}: cannot normalize (norm {norm})")]
    DegenerateVector { context: String, norm: f32 },

    #[error("Artifact missing: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("Artifact corrupt: {}: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("Empty query")]
    EmptyQuery,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedder returned {actual} vectors for {expected} inputs")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SearchError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
