//! Embedding provider trait and mock implementation.
//!
//! The indexer never talks to a model directly; it goes through
//! [`EmbeddingProvider`], so the sentence-embedding backend can be swapped
//! (fastembed in the binary, a hash-based mock in tests).
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: Deterministic unit vectors for testing
//! - `FastEmbedProvider`: Local sentence embeddings (requires `fastembed` feature)

use async_trait::async_trait;
use mosaic_core::Result;

/// Trait for generating text embeddings.
///
/// Implementations wrap a specific embedding library and provide a uniform
/// async interface. The trait requires `Send + Sync` so a provider can be
/// held in an `Arc` and moved into blocking tasks.
///
/// # Thread Safety
///
/// Implementations should handle internal synchronization (e.g., `Arc<Mutex<>>`)
/// for thread-unsafe underlying libraries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts, one vector per input, in order.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    /// Backends that support native batching should override this.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The provider/model name recorded in index metadata.
    fn name(&self) -> &str;
}

/// A mock embedding provider for testing.
///
/// Each vector is expanded from the blake3 XOF of the input text and scaled
/// to unit length, so equal texts embed identically and distinct texts are
/// nearly orthogonal at realistic dimensions.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hashed_embedding(&self, text: &str) -> Vec<f32> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(text.as_bytes());
        let mut reader = hasher.finalize_xof();

        let mut bytes = vec![0u8; self.dimension * 4];
        reader.fill(&mut bytes);

        let mut embedding: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| {
                let raw = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                (raw as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hashed_embedding(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.hashed_embedding(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Tests
// ============================================================================
