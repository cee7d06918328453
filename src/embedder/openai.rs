//! Blocking client for OpenAI-compatible `/embeddings` endpoints.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::embedder::Embedder;
use crate::error::{Result, SearchError};

/// Connection settings for [`OpenAiEmbedder`].
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Requested output dimension, for models that support shortening.
    pub dimensions: Option<usize>,
    pub timeout: Duration,
    pub max_retries: usize,
    /// Inputs per HTTP request; larger batches are split.
    pub batch_size: usize,
}

/// Embeddings client that talks to OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    max_retries: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(settings: OpenAiSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(SearchError::Config("missing embedding API key".to_string()));
        }
        if settings.model.trim().is_empty() {
            return Err(SearchError::Config("missing embedding model name".to_string()));
        }
        if settings.batch_size == 0 {
            return Err(SearchError::Config("batch_size must be at least 1".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", settings.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| SearchError::Config("invalid embedding API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint_for(&settings.base_url),
            model: settings.model,
            dimensions: settings.dimensions,
            max_retries: settings.max_retries.max(1),
            batch_size: settings.batch_size,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn embed_request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: inputs,
                dimensions: self.dimensions,
            };
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().map_err(|e| {
                            SearchError::Embedding(format!("failed to parse response: {}", e))
                        })?;
                        return into_ordered(parsed, inputs.len());
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        log::warn!("Embedding request returned {}, retry {}", status, attempt);
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(SearchError::Embedding(format!(
                        "request failed ({}): {}",
                        status, body
                    )));
                }
                Err(err) => {
                    if is_retryable(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        log::warn!("Embedding request error: {}, retry {}", err, attempt);
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(SearchError::Embedding(err.to_string()));
                }
            }
        }
    }
}

impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            log::debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            out.extend(self.embed_request(batch)?);
        }
        Ok(out)
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}/embeddings", base_url.trim_end_matches('/'))
}

fn into_ordered(mut parsed: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    parsed.data.sort_by_key(|entry| entry.index);
    if parsed.data.len() != expected {
        return Err(SearchError::EmbeddingCount {
            expected,
            actual: parsed.data.len(),
        });
    }
    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OpenAiSettings {
        OpenAiSettings {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:11434/v1/".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: None,
            timeout: Duration::from_secs(5),
            max_retries: 2,
            batch_size: 16,
        }
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let embedder = OpenAiEmbedder::new(settings()).unwrap();
        assert_eq!(embedder.endpoint(), "http://localhost:11434/v1/embeddings");
        assert_eq!(embedder.model_id(), "nomic-embed-text");
    }

    #[test]
    fn test_missing_key_rejected() {
        let s = OpenAiSettings {
            api_key: "  ".to_string(),
            ..settings()
        };
        assert!(matches!(OpenAiEmbedder::new(s), Err(SearchError::Config(_))));
    }

    #[test]
    fn test_response_reordered_by_index() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[0.0,1.0],"index":1},{"embedding":[1.0,0.0],"index":0}]}"#,
        )
        .unwrap();
        let out = into_ordered(parsed, 2).unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_response_count_checked() {
        let parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[1.0],"index":0}]}"#).unwrap();
        assert!(matches!(
            into_ordered(parsed, 3),
            Err(SearchError::EmbeddingCount { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_request_shape() {
        let input = vec!["hello".to_string()];
        let req = EmbeddingRequest {
            model: "m",
            input: &input,
            dimensions: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"model":"m","input":["hello"]}"#);
    }
}
