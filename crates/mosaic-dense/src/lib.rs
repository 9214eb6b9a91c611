//! Dense index construction for Mosaic.
//!
//! This crate turns a stream of corpus documents into an exhaustive
//! inner-product vector index and persists it in the FAISS `IndexFlat` file
//! layout, next to a row-ordered id list and a JSON metadata file.
//!
//! # Features
//!
//! - `fastembed`: Enable local sentence embeddings via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      mosaic-dense                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: fastembed)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FlatIndex + FAISS codec (index.faiss)                      │
//! │  DenseIndexer (batch embed → index → save / load / search)  │
//! │  Persistence (docids.txt, meta.json)                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use mosaic_dense::{DenseConfig, DenseIndexer, MockEmbeddingProvider};
//! use std::sync::Arc;
//!
//! let provider = Arc::new(MockEmbeddingProvider::new(384));
//! let mut indexer = DenseIndexer::new("data/faiss", DenseConfig::default(), provider)?;
//! indexer.build_from_corpus(stream, Some(1000)).await?;
//! let saved = indexer.save()?;
//! ```

pub mod embedding;
pub mod flat;
pub mod indexer;
pub mod persistence;
pub mod types;

#[cfg(feature = "fastembed")]
pub mod fastembed;

// Re-exports: core types
pub use types::{BuildStats, DenseConfig, SavedArtifacts, SearchHit};

// Re-exports: traits and providers
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider};

// Re-exports: index
pub use flat::{FlatIndex, Metric};
pub use indexer::DenseIndexer;

// Re-exports: persistence
pub use persistence::{DOC_IDS_FILE, INDEX_FILE, IndexMetadata, META_FILE};

#[cfg(feature = "fastembed")]
pub use fastembed::FastEmbedProvider;
