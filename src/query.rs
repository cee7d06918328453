//! Query engine: embed a free-text query, search the store and prepare
//! display previews.

use crate::config::DEFAULT_PREVIEW_CHARS;
use crate::embedder::{embed_checked, Embedder};
use crate::error::{Result, SearchError};
use crate::storage::{QueryResult, VectorStore};
use crate::vector::Vector;
use serde::Serialize;

/// Marker appended to truncated previews.
pub const ELLIPSIS: &str = "…";

/// A search result with its display preview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    #[serde(flatten)]
    pub result: QueryResult,
    pub preview: String,
}

/// Answers queries against a loaded store.
///
/// Borrows both handles; the host owns the store and the embedder.
pub struct QueryEngine<'a> {
    store: &'a VectorStore,
    embedder: &'a dyn Embedder,
    preview_chars: usize,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a VectorStore, embedder: &'a dyn Embedder) -> Self {
        Self {
            store,
            embedder,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    pub fn store(&self) -> &VectorStore {
        self.store
    }

    /// Rank the top `k` documents for `query_text`.
    ///
    /// A blank query is rejected before the embedder is called.
    pub fn answer(&self, query_text: &str, k: usize) -> Result<Vec<Hit>> {
        let query = query_text.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let mut vectors = embed_checked(self.embedder, &[query.to_string()])?;
        let vector = Vector::new(vectors.pop().unwrap_or_default());
        let results = self.store.search(&vector, k)?;
        log::debug!("Query {:?} (k={}) returned {} hits", query, k, results.len());

        Ok(results
            .into_iter()
            .map(|result| {
                let text = self.store.document(result.row).unwrap_or_default();
                Hit {
                    preview: preview(text, self.preview_chars),
                    result,
                }
            })
            .collect())
    }
}

/// Collapse whitespace runs to single spaces and cut to `max_chars`
/// characters, appending [`ELLIPSIS`] when anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &collapsed[..cut], ELLIPSIS),
        None => collapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Metadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AxisEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for AxisEmbedder {
        fn model_id(&self) -> &str {
            "axis"
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| if t.contains("left") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
                .collect())
        }
    }

    fn store() -> VectorStore {
        VectorStore::build(
            vec![Vector::new(vec![1.0, 0.1]), Vector::new(vec![0.1, 1.0])],
            vec![
                "left   leaning\n\ndocument".to_string(),
                "x".repeat(400),
            ],
            vec![Metadata::new("left.txt"), Metadata::new("up.txt")],
        )
        .unwrap()
    }

    #[test]
    fn test_answer_ranks_and_previews() {
        let store = store();
        let embedder = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        let engine = QueryEngine::new(&store, &embedder);

        let hits = engine.answer("  go left ", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].result.metadata.source, "left.txt");
        assert_eq!(hits[0].result.rank, 1);
        assert_eq!(hits[0].preview, "left leaning document");
        assert_eq!(hits[1].preview.chars().count(), 281);
        assert!(hits[1].preview.ends_with(ELLIPSIS));

        // stored text is untouched
        assert_eq!(store.document(0), Some("left   leaning\n\ndocument"));
    }

    #[test]
    fn test_blank_query_skips_embedder() {
        let store = store();
        let embedder = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        let engine = QueryEngine::new(&store, &embedder);

        assert!(matches!(engine.answer(" \t\n", 3), Err(SearchError::EmptyQuery)));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_custom_preview_length() {
        let store = store();
        let embedder = AxisEmbedder {
            calls: AtomicUsize::new(0),
        };
        let engine = QueryEngine::new(&store, &embedder).with_preview_chars(4);
        let hits = engine.answer("left", 1).unwrap();
        assert_eq!(hits[0].preview, "left…");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("  a \n b\t\tc  ", 280), "a b c");
        assert_eq!(preview("abcdef", 3), "abc…");
        assert_eq!(preview("abc", 3), "abc");
        assert_eq!(preview("", 10), "");
        assert_eq!(preview("héllo wörld", 4), "héll…");
    }
}
