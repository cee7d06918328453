//! Feature-hashing bag-of-words embedder.
//!
//! Each lower-cased alphanumeric token is hashed with CRC32: the hash modulo
//! the dimension picks a bucket and the top bit picks the sign. Needs no model
//! files or network, which makes it the default for tests and offline use.

use crate::embedder::Embedder;
use crate::error::{Result, SearchError};

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(SearchError::Config(
                "hashing embedder dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: format!("hashing-bow-{}", dimension),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single text. Text without tokens maps to the zero vector.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let hash = crc32fast::hash(token.as_bytes());
            let bucket = hash as usize % self.dimension;
            let sign = if hash >> 31 == 0 { 1.0 } else { -1.0 };
            out[bucket] += sign;
        }
        out
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
