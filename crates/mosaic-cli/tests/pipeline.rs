//! End-to-end runs of the index builder over a small on-disk BEIR corpus.

use mosaic_cli::{PipelineOptions, PipelineReport, run_pipeline};
use mosaic_core::Result;
use mosaic_corpus::{Corpus, ensure_beir_fever};
use mosaic_dense::persistence::{load_metadata, read_doc_ids};
use mosaic_dense::{DenseIndexer, EmbeddingProvider, Metric, MockEmbeddingProvider};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 16;

fn mock(_: &PipelineOptions) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(MockEmbeddingProvider::new(DIM)))
}

/// Two-document corpus where `d2` has no title.
fn write_fever(dir: &Path) -> Corpus {
    std::fs::write(
        dir.join("corpus.jsonl"),
        concat!(
            r#"{"_id": "d1", "title": "T1", "text": "X1"}"#,
            "\n",
            r#"{"_id": "d2", "text": "X2"}"#,
            "\n",
        ),
    )
    .unwrap();
    ensure_beir_fever(dir, "test").unwrap().corpus
}

fn options(index_dir: &Path) -> PipelineOptions {
    PipelineOptions {
        index_dir: index_dir.to_path_buf(),
        model: "mock-model".to_string(),
        batch_size: 4,
        ..PipelineOptions::default()
    }
}

async fn run(options: &PipelineOptions, corpus: &Corpus) -> (PipelineReport, Vec<String>) {
    let mut out = Vec::new();
    let report = run_pipeline(options, corpus, mock, &mut out).await.unwrap();
    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    (report, lines)
}

#[tokio::test]
async fn full_corpus_is_indexed_in_corpus_order() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let corpus = write_fever(data.path());
    let index_dir = out.path().join("faiss");
    let options = options(&index_dir);

    let (report, lines) = run(&options, &corpus).await;

    assert_eq!(
        lines,
        vec![
            format!(
                "Building FAISS at {} using model 'mock-model' ...",
                index_dir.display()
            ),
            "Saved index.faiss, docids.txt, meta.json".to_string(),
        ]
    );
    assert!(report.selection.is_none());
    assert_eq!(report.stats.documents_indexed, 2);

    assert_eq!(read_doc_ids(&report.artifacts.doc_ids).unwrap(), ["d1", "d2"]);
    let meta = load_metadata(&report.artifacts.meta).unwrap();
    assert_eq!(meta.model_name, "mock-model");
    assert_eq!(meta.document_count, 2);
    assert_eq!(meta.dimension, DIM);
    assert!(report.artifacts.index.is_file());
}

#[tokio::test]
async fn saved_index_answers_queries() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let corpus = write_fever(data.path());
    let options = options(out.path());
    run(&options, &corpus).await;

    let loaded =
        DenseIndexer::load(out.path(), Arc::new(MockEmbeddingProvider::new(DIM))).unwrap();
    assert_eq!(loaded.len(), 2);

    let hits = loaded.search("T1 X1", 1).await.unwrap();
    assert_eq!(hits[0].doc_id, "d1");
    let hits = loaded.search("X2", 1).await.unwrap();
    assert_eq!(hits[0].doc_id, "d2");
}

#[tokio::test]
async fn sampling_is_reproducible_for_a_seed() {
    let data = TempDir::new().unwrap();
    let corpus = write_fever(data.path());

    let first = TempDir::new().unwrap();
    let mut opts = options(first.path());
    opts.sample = Some(1);
    let (report, lines) = run(&opts, &corpus).await;
    assert_eq!(lines[0], "Sampling 1 of 2 docs (seed=42)");
    let first_ids = read_doc_ids(&report.artifacts.doc_ids).unwrap();
    assert_eq!(first_ids, ["d2"]);

    let second = TempDir::new().unwrap();
    opts.index_dir = second.path().to_path_buf();
    let (report, _) = run(&opts, &corpus).await;
    assert_eq!(read_doc_ids(&report.artifacts.doc_ids).unwrap(), first_ids);

    let third = TempDir::new().unwrap();
    opts.index_dir = third.path().to_path_buf();
    opts.seed = 7;
    let (report, lines) = run(&opts, &corpus).await;
    assert_eq!(lines[0], "Sampling 1 of 2 docs (seed=7)");
    assert_eq!(read_doc_ids(&report.artifacts.doc_ids).unwrap(), ["d2"]);
}

#[tokio::test]
async fn l2_metric_without_normalization_is_recorded() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let corpus = write_fever(data.path());
    let mut opts = options(out.path());
    opts.metric = Metric::L2;
    opts.normalize = false;

    let (report, _) = run(&opts, &corpus).await;

    let meta = load_metadata(&report.artifacts.meta).unwrap();
    assert_eq!(meta.metric, Metric::L2);
    assert!(!meta.normalized);

    let loaded =
        DenseIndexer::load(out.path(), Arc::new(MockEmbeddingProvider::new(DIM))).unwrap();
    assert_eq!(loaded.index().metric(), Metric::L2);
    let hits = loaded.search("X2", 1).await.unwrap();
    assert_eq!(hits[0].doc_id, "d2");
}

#[tokio::test]
async fn oversized_sample_clamps_to_corpus() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let corpus = write_fever(data.path());
    let mut opts = options(out.path());
    opts.sample = Some(10);

    let (report, lines) = run(&opts, &corpus).await;

    assert_eq!(lines[0], "Sampling 2 of 2 docs (seed=42)");
    assert_eq!(report.selection.as_ref().map(|s| s.len()), Some(2));
    assert_eq!(read_doc_ids(&report.artifacts.doc_ids).unwrap(), ["d1", "d2"]);
}

#[tokio::test]
async fn sample_zero_means_full_corpus() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let corpus = write_fever(data.path());
    let mut opts = options(out.path());
    opts.sample = Some(0);

    let (report, lines) = run(&opts, &corpus).await;

    assert!(report.selection.is_none());
    assert_eq!(lines.len(), 2);
    assert_eq!(report.stats.documents_indexed, 2);
}

#[tokio::test]
async fn limit_truncates_the_stream() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let corpus = write_fever(data.path());
    let mut opts = options(out.path());
    opts.limit = Some(1);

    let (report, _) = run(&opts, &corpus).await;

    assert_eq!(report.stats.documents_indexed, 1);
    assert_eq!(read_doc_ids(&report.artifacts.doc_ids).unwrap(), ["d1"]);
    assert_eq!(load_metadata(&report.artifacts.meta).unwrap().document_count, 1);
}

#[tokio::test]
async fn empty_corpus_saves_empty_index() {
    let out = TempDir::new().unwrap();
    let corpus = Corpus::new();
    let mut opts = options(out.path());
    opts.sample = Some(5);

    let (report, lines) = run(&opts, &corpus).await;

    assert_eq!(lines[0], "Sampling 0 of 0 docs (seed=42)");
    assert_eq!(report.stats.documents_indexed, 0);
    assert!(read_doc_ids(&report.artifacts.doc_ids).unwrap().is_empty());
    assert_eq!(load_metadata(&report.artifacts.meta).unwrap().dimension, DIM);
}

#[test]
fn missing_corpus_is_an_error() {
    let data = TempDir::new().unwrap();
    let err = ensure_beir_fever(data.path(), "test").unwrap_err();
    assert!(err.is_not_found());
}
