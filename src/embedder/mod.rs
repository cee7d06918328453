//! Embedding model boundary.
//!
//! The store only needs something that maps a batch of texts to fixed-length
//! vectors. Two implementations ship with the crate: an offline hashing model
//! and a client for OpenAI-compatible HTTP endpoints.

pub mod hashing;
pub mod openai;

pub use hashing::HashingEmbedder;
pub use openai::{OpenAiEmbedder, OpenAiSettings};

use crate::config::{EmbedderConfig, EmbedderKind};
use crate::error::{Result, SearchError};

/// Maps an ordered batch of texts to one vector per text.
///
/// Implementations must be deterministic for a given model so that rebuilding
/// an unchanged corpus reproduces the same index.
pub trait Embedder: Send + Sync {
    /// Identifier recorded in the artifact manifest.
    fn model_id(&self) -> &str;

    /// Embed `texts`, returning vectors in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }
}

/// Call `embedder` and check that it returned one vector per input.
pub fn embed_checked(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = embedder.embed(texts)?;
    if vectors.len() != texts.len() {
        return Err(SearchError::EmbeddingCount {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Construct the embedder selected by configuration.
pub fn from_config(config: &EmbedderConfig) -> Result<Box<dyn Embedder>> {
    match config.kind {
        EmbedderKind::Hashing => Ok(Box::new(HashingEmbedder::new(config.dimension)?)),
        EmbedderKind::OpenAi => {
            let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
            let settings = OpenAiSettings {
                api_key,
                base_url: config.base_url.clone(),
                model: config.model.clone(),
                dimensions: config.request_dimensions,
                timeout: std::time::Duration::from_secs(config.timeout_secs),
                max_retries: config.max_retries,
                batch_size: config.batch_size,
            };
            Ok(Box::new(OpenAiEmbedder::new(settings)?))
        }
    }
}
