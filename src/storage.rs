//! Immutable vector store: normalized embeddings plus parallel document and
//! metadata rows.

use crate::error::{Result, SearchError};
use crate::flat_index::FlatIndex;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// 1-based position in the result list
    pub rank: usize,
    /// Inner product of the normalized query and the stored row
    pub score: f32,
    /// Row index, the document's identity within the store
    pub row: usize,
    pub metadata: Metadata,
}

/// Metadata associated with a document row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Metadata {
    /// Source identifier, the corpus file name
    pub source: String,
    /// Additional named fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "source" => Some(&self.source),
            _ => self.extra.get(key).map(String::as_str),
        }
    }
}

/// Embeddings, document texts and metadata, row-aligned.
///
/// Row `i` of each sequence describes the same document. The store never
/// changes after construction; a rebuild produces a new store.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStore {
    index: FlatIndex,
    documents: Vec<String>,
    metadata: Vec<Metadata>,
}

impl VectorStore {
    /// Build a store from raw embeddings. Every vector is normalized to unit
    /// length before it is stored.
    pub fn build(vectors: Vec<Vector>, documents: Vec<String>, metadata: Vec<Metadata>) -> Result<Self> {
        if vectors.is_empty() {
            return Err(SearchError::EmptyCorpus {
                context: "vector store input".to_string(),
            });
        }
        check_row_counts(vectors.len(), documents.len(), metadata.len())?;

        for (row, meta) in metadata.iter().enumerate() {
            if meta.source.trim().is_empty() {
                return Err(SearchError::InvalidArgument(format!(
                    "row {} has an empty source identifier",
                    row
                )));
            }
            if meta.extra.contains_key("source") {
                return Err(SearchError::InvalidArgument(format!(
                    "row {} has an extra field named \"source\"",
                    row
                )));
            }
        }

        let index = FlatIndex::build(vectors)?;
        log::debug!(
            "Built vector store: {} rows, dimension {}",
            index.len(),
            index.dimension()
        );

        Ok(Self {
            index,
            documents,
            metadata,
        })
    }

    /// Assemble a store from an index whose rows are already normalized.
    pub fn from_parts(index: FlatIndex, documents: Vec<String>, metadata: Vec<Metadata>) -> Result<Self> {
        check_row_counts(index.len(), documents.len(), metadata.len())?;
        Ok(Self {
            index,
            documents,
            metadata,
        })
    }

    /// A store with no rows. Searching it always yields nothing.
    pub fn empty(dimension: usize) -> Self {
        Self {
            index: FlatIndex::empty(dimension),
            documents: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Get the number of documents in the store
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    /// Text of the document at `row`
    pub fn document(&self, row: usize) -> Option<&str> {
        self.documents.get(row).map(String::as_str)
    }

    /// Search for the `k` most similar documents.
    ///
    /// The query is normalized like the stored rows. Results are ordered by
    /// descending score, ties by ascending row. `k` larger than the store is
    /// clamped. An empty store returns no results for any `k`.
    pub fn search(&self, query: &Vector, k: usize) -> Result<Vec<QueryResult>> {
        if self.is_empty() {
            return Ok(vec![]);
        }
        if k == 0 {
            return Err(SearchError::InvalidArgument("k must be at least 1".to_string()));
        }
        if query.dimension() != self.dimension() {
            return Err(SearchError::DimensionMismatch {
                context: "query".to_string(),
                expected: self.dimension(),
                actual: query.dimension(),
            });
        }

        let query = query.normalized("query")?;
        let hits = self.index.search(query.as_slice(), k.min(self.len()));

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| QueryResult {
                rank: i + 1,
                score: hit.score,
                row: hit.row,
                metadata: self.metadata[hit.row].clone(),
            })
            .collect())
    }
}

fn check_row_counts(vectors: usize, documents: usize, metadata: usize) -> Result<()> {
    if vectors != documents || vectors != metadata {
        return Err(SearchError::InvalidArgument(format!(
            "row counts differ: {} vectors, {} documents, {} metadata records",
            vectors, documents, metadata
        )));
    }
    Ok(())
}
