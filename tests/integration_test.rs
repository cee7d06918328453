//! Integration tests: corpus -> build -> persist -> load -> query

use semantic_search::embedder::Embedder;
use semantic_search::persistence::{DOCS_FILE, META_FILE, VECTORS_FILE};
use semantic_search::{HashingEmbedder, IndexBuilder, IndexLoader, QueryEngine, SearchError, Vector};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn write_corpus(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, text) in files {
        fs::write(dir.join(name), text).unwrap();
    }
}

struct CountingEmbedder {
    inner: HashingEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            inner: HashingEmbedder::new(384).unwrap(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for CountingEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn embed(&self, texts: &[String]) -> semantic_search::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(texts)
    }
}

#[test]
fn test_cat_query_finds_cat_document() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    let out = tmp.path().join("artifacts");
    write_corpus(&corpus, &[("a.txt", "the cat sat"), ("b.txt", "dogs run fast")]);
    let embedder = HashingEmbedder::new(384).unwrap();

    IndexBuilder::new(&embedder, &out).build(&corpus).unwrap();
    let store = IndexLoader::load(&out).unwrap();
    let engine = QueryEngine::new(&store, &embedder);

    let hits = engine.answer("cat", 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].result.metadata.source, "a.txt");
    assert_eq!(hits[0].result.row, 0);

    let all = engine.answer("cat", 2).unwrap();
    assert!(all[0].result.score > all[1].result.score);
}

#[test]
fn test_empty_file_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    write_corpus(&corpus, &[("empty.txt", ""), ("full.txt", "some words here")]);
    let embedder = HashingEmbedder::new(64).unwrap();

    let report = IndexBuilder::new(&embedder, tmp.path().join("artifacts"))
        .build(&corpus)
        .unwrap();
    assert_eq!(report.document_count, 1);
    assert_eq!(report.skipped_count, 1);
}

#[test]
fn test_zero_files_is_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    fs::create_dir(&corpus).unwrap();
    let out = tmp.path().join("artifacts");
    let embedder = CountingEmbedder::new();

    let result = IndexBuilder::new(&embedder, &out).build(&corpus);
    assert!(matches!(result, Err(SearchError::EmptyCorpus { .. })));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(!out.exists());
}

#[test]
fn test_whitespace_query_rejected_before_embedding() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    let out = tmp.path().join("artifacts");
    write_corpus(&corpus, &[("a.txt", "hello")]);
    let embedder = CountingEmbedder::new();
    IndexBuilder::new(&embedder, &out).build(&corpus).unwrap();
    let store = IndexLoader::load(&out).unwrap();
    let before = embedder.calls.load(Ordering::SeqCst);

    let engine = QueryEngine::new(&store, &embedder);
    assert!(matches!(engine.answer("   \t ", 3), Err(SearchError::EmptyQuery)));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), before);
}

#[test]
fn test_build_embeds_in_one_batch() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    write_corpus(
        &corpus,
        &[("1.txt", "one"), ("2.txt", "two"), ("3.txt", "three")],
    );
    let embedder = CountingEmbedder::new();
    IndexBuilder::new(&embedder, tmp.path().join("artifacts"))
        .build(&corpus)
        .unwrap();
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_load_matches_built_store() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    let out = tmp.path().join("artifacts");
    write_corpus(
        &corpus,
        &[
            ("rust.txt", "Rust is a fast systems language"),
            ("python.txt", "Python is a slow but friendly language"),
            ("cats.txt", "Cats sleep most of the day"),
            ("dogs.txt", "Dogs like to run and play fetch"),
        ],
    );
    let embedder = HashingEmbedder::new(128).unwrap();
    let builder = IndexBuilder::new(&embedder, &out);

    let (built, _) = builder.build_store(&corpus).unwrap();
    builder.build(&corpus).unwrap();
    let loaded = IndexLoader::load(&out).unwrap();
    assert_eq!(built, loaded);

    for query in ["fast language", "cats", "play fetch with dogs", "nothing matches"] {
        let q = Vector::new(embedder.embed(&[query.to_string()]).unwrap().remove(0));
        if q.norm() == 0.0 {
            continue;
        }
        for k in 1..=5 {
            assert_eq!(built.search(&q, k).unwrap(), loaded.search(&q, k).unwrap());
        }
    }
}

#[test]
fn test_rebuild_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    write_corpus(
        &corpus,
        &[("zeta.txt", "last"), ("alpha.txt", "first"), ("Mid.txt", "middle")],
    );
    let embedder = HashingEmbedder::new(32).unwrap();

    let first_out = tmp.path().join("first");
    let second_out = tmp.path().join("second");
    IndexBuilder::new(&embedder, &first_out).build(&corpus).unwrap();
    IndexBuilder::new(&embedder, &second_out).build(&corpus).unwrap();

    for name in [VECTORS_FILE, DOCS_FILE, META_FILE] {
        assert_eq!(
            fs::read(first_out.join(name)).unwrap(),
            fs::read(second_out.join(name)).unwrap(),
            "{} differs between builds",
            name
        );
    }

    let store = IndexLoader::load(&first_out).unwrap();
    let sources: Vec<&str> = store.metadata().iter().map(|m| m.source.as_str()).collect();
    assert_eq!(sources, vec!["Mid.txt", "alpha.txt", "zeta.txt"]);
}

#[test]
fn test_failed_rebuild_keeps_previous_artifacts() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    let out = tmp.path().join("artifacts");
    write_corpus(&corpus, &[("a.txt", "original text")]);
    let embedder = HashingEmbedder::new(32).unwrap();
    IndexBuilder::new(&embedder, &out).build(&corpus).unwrap();

    fs::write(corpus.join("b.txt"), [0xc3, 0x28]).unwrap();
    let result = IndexBuilder::new(&embedder, &out).build(&corpus);
    assert!(matches!(result, Err(SearchError::CorpusRead { .. })));

    let store = IndexLoader::load(&out).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.document(0), Some("original text"));
}

#[test]
fn test_punctuation_only_document_is_degenerate() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("data");
    write_corpus(&corpus, &[("a.txt", "words"), ("b.txt", "?!...")]);
    let embedder = HashingEmbedder::new(32).unwrap();

    let result = IndexBuilder::new(&embedder, tmp.path().join("artifacts")).build(&corpus);
    match result {
        Err(SearchError::DegenerateVector { context, .. }) => assert_eq!(context, "row 1"),
        other => panic!("expected DegenerateVector, got {:?}", other),
    }
}

#[test]
fn test_load_missing_directory() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        IndexLoader::load(tmp.path().join("never-built")),
        Err(SearchError::ArtifactMissing { .. })
    ));
}
