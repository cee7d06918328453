//! # Semantic Search
//!
//! Exact semantic search over a fixed corpus of text documents.
//!
//! This library provides:
//! - Unit-normalized embedding storage in a flat inner-product index
//! - Exact top-k search with deterministic tie-breaking
//! - Corpus ingestion and an atomically published artifact set
//! - A query engine producing ranked, display-ready hits
//!
//! ## Example
//!
//! ```rust
//! use semantic_search::{Embedder, HashingEmbedder, Metadata, QueryEngine, Vector, VectorStore};
//!
//! let embedder = HashingEmbedder::new(64).unwrap();
//! let docs = vec!["the cat sat".to_string(), "dogs run fast".to_string()];
//! let vectors = embedder.embed(&docs).unwrap().into_iter().map(Vector::new).collect();
//! let store = VectorStore::build(
//!     vectors,
//!     docs,
//!     vec![Metadata::new("a.txt"), Metadata::new("b.txt")],
//! )
//! .unwrap();
//!
//! let engine = QueryEngine::new(&store, &embedder);
//! let hits = engine.answer("cat", 1).unwrap();
//! assert_eq!(hits[0].result.metadata.source, "a.txt");
//! ```

pub mod builder;
pub mod config;
pub mod embedder;
pub mod error;
pub mod flat_index;
pub mod metrics;
pub mod persistence;
pub mod query;
pub mod server;
pub mod similarity;
pub mod storage;
pub mod vector;

pub use builder::{BuildReport, IndexBuilder};
pub use config::Config;
pub use embedder::{Embedder, HashingEmbedder, OpenAiEmbedder};
pub use error::{Result, SearchError};
pub use flat_index::FlatIndex;
pub use persistence::{IndexLoader, Manifest};
pub use query::{Hit, QueryEngine};
pub use storage::{Metadata, QueryResult, VectorStore};
pub use vector::Vector;
