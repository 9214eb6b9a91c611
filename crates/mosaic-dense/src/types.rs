//! Common types for the dense indexer.

use crate::flat::Metric;
use mosaic_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Configuration
// ============================================================================

/// Default sentence-embedding model.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Default number of passages per embedding call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Dense indexer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseConfig {
    /// Embedding model identifier, recorded in `meta.json`.
    #[serde(default = "default_model")]
    pub model_name: String,

    /// Passages per embedding call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Scale every vector to unit length before indexing.
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Ranking metric of the flat index.
    #[serde(default)]
    pub metric: Metric,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self {
            model_name: default_model(),
            batch_size: default_batch_size(),
            normalize: default_true(),
            metric: Metric::default(),
        }
    }
}

impl DenseConfig {
    /// Create a config for `model_name` with the given batch size.
    pub fn new(model_name: impl Into<String>, batch_size: usize) -> Self {
        Self {
            model_name: model_name.into(),
            batch_size,
            ..Default::default()
        }
    }

    /// Set the ranking metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Enable or disable normalization.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Reject settings the indexer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be a positive integer"));
        }
        if self.model_name.trim().is_empty() {
            return Err(Error::config("model_name must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// Statistics from one `build_from_corpus` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Documents added to the index.
    pub documents_indexed: usize,

    /// Embedding calls made.
    pub batches: usize,

    /// Embedding dimension used.
    pub dimension: usize,

    /// blake3 hash over the indexed ids and passages.
    pub content_hash: String,

    /// Build duration in milliseconds.
    pub build_duration_ms: u64,
}

/// Paths written by `DenseIndexer::save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifacts {
    /// `index.faiss`
    pub index: PathBuf,
    /// `docids.txt`
    pub doc_ids: PathBuf,
    /// `meta.json`
    pub meta: PathBuf,
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Corpus document id.
    pub doc_id: String,

    /// Similarity score (higher is more similar).
    pub score: f32,
}

// ============================================================================
// Tests
// ============================================================================
