//! Corpus side of the Mosaic index builder.
//!
//! This crate loads a BEIR-format dataset from disk, optionally draws a
//! reproducible random subset of its documents, and exposes the result as a
//! lazy stream of `(doc_id, title, text)` items for the indexer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     mosaic-corpus                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  beir:   corpus.jsonl / queries.jsonl / qrels/*.tsv      │
//! │  sample: sorted keys → seeded draw → SampleSelection     │
//! │  stream: Corpus (+ selection) → DocumentStream           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use mosaic_corpus::{document_stream, ensure_beir_fever, sample_corpus};
//!
//! let dataset = ensure_beir_fever(Path::new("data/beir/fever"), "test")?;
//! let selection = sample_corpus(&dataset.corpus, Some(1000), 42);
//! for doc in document_stream(&dataset.corpus, selection.as_ref()) {
//!     println!("{}: {}", doc.doc_id, doc.title);
//! }
//! ```

pub mod beir;
pub mod sample;
pub mod stream;

pub use beir::{
    BeirDataset, Corpus, CorpusRecord, Qrels, Queries, ensure_beir_fever, load_corpus, load_qrels,
    load_queries,
};
pub use sample::{SampleSelection, sample_corpus, sample_ids};
pub use stream::{DocumentStream, StreamDocument, document_stream};
