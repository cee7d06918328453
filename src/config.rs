//! TOML configuration for corpus, artifacts, queries and the embedder.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PREVIEW_CHARS: usize = 280;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub index: IndexConfig,
    pub query: QueryConfig,
    pub embedder: EmbedderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Directory of plain-text documents, one per file
    pub dir: PathBuf,
    /// File extensions to ingest, compared case-insensitively
    pub extensions: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            extensions: vec!["txt".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub artifact_dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub top_k: usize,
    pub preview_chars: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    Hashing,
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    /// Output dimension of the hashing embedder
    pub dimension: usize,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Dimension requested from the HTTP model, if it supports shortening
    pub request_dimensions: Option<usize>,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Hashing,
            dimension: DEFAULT_DIMENSION,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_dimensions: None,
            timeout_secs: 30,
            max_retries: 3,
            batch_size: 256,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text).map_err(|e| match e {
            SearchError::Config(msg) => SearchError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| SearchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.query.top_k == 0 {
            return Err(SearchError::Config("query.top_k must be at least 1".to_string()));
        }
        if self.corpus.extensions.is_empty() {
            return Err(SearchError::Config(
                "corpus.extensions must name at least one extension".to_string(),
            ));
        }
        Ok(())
    }
}
