//! FastEmbed embedding provider.
//!
//! Wraps the `fastembed` crate to run sentence-transformers models locally
//! through ONNX Runtime. Model ids are accepted in the spelling used on the
//! Hugging Face hub (`all-MiniLM-L6-v2`, `sentence-transformers/all-MiniLM-L6-v2`)
//! as well as fastembed's enum names.
//!
//! # Thread Safety
//!
//! `fastembed::TextEmbedding` is not `Sync`, so it lives behind
//! `Arc<Mutex<>>` and every call runs on `tokio::task::spawn_blocking`.
//!
//! # Feature Gate
//!
//! This module requires the `fastembed` feature.

use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use mosaic_core::{Error, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SUPPORTED: &str = "all-MiniLM-L6-v2, all-MiniLM-L12-v2, \
    bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5";

/// Map a model id to a fastembed `EmbeddingModel` variant.
///
/// Matching ignores case and an optional `sentence-transformers/` or
/// `BAAI/` organisation prefix.
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    let lowered = name.trim().to_ascii_lowercase();
    let bare = lowered
        .strip_prefix("sentence-transformers/")
        .or_else(|| lowered.strip_prefix("baai/"))
        .unwrap_or(&lowered);

    match bare {
        "all-minilm-l6-v2" | "allminilml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" | "allminilml12v2" => Ok(fastembed::EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" | "bgelargeenv15" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        _ => Err(Error::config(format!(
            "Unknown embedding model: '{name}'. Supported: {SUPPORTED}"
        ))),
    }
}

/// FastEmbed-based embedding provider.
///
/// The model is downloaded on first use (into `cache_dir` when given) and
/// loaded once; all later calls reuse it.
///
/// # Supported Models
///
/// | Name | Dimension |
/// |------|-----------|
/// | `all-MiniLM-L6-v2` | 384 |
/// | `all-MiniLM-L12-v2` | 384 |
/// | `bge-small-en-v1.5` | 384 |
/// | `bge-base-en-v1.5` | 768 |
/// | `bge-large-en-v1.5` | 1024 |
pub struct FastEmbedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Load `model_name`, optionally caching model files under `cache_dir`.
    pub fn new(model_name: &str, cache_dir: Option<&Path>) -> Result<Self> {
        let model_enum = resolve_model(model_name)?;

        let mut init = fastembed::InitOptions::new(model_enum).with_show_download_progress(true);
        if let Some(dir) = cache_dir {
            init = init.with_cache_dir(dir.to_path_buf());
        }

        log::info!("Loading embedding model '{model_name}'");
        let mut text_embedding = fastembed::TextEmbedding::try_new(init)
            .map_err(|e| Error::operation(format!("Failed to initialize fastembed model: {e}")))?;

        // Dimension from a one-off embedding
        let sample = text_embedding
            .embed(vec!["dimension check"], None)
            .map_err(|e| Error::operation(format!("Failed to read embedding dimension: {e}")))?;

        let dimension = sample
            .first()
            .map(|v| v.len())
            .ok_or_else(|| Error::operation("Empty embedding while reading dimension"))?;
        log::debug!("Model '{model_name}' produces {dimension}-d vectors");

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            dimension,
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| Error::operation("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model.clone();
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let batch_size = texts.len();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::operation(format!("Batch embedding failed: {e}")))
        })
        .await
        .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
