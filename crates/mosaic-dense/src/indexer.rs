//! Batch embedding and index construction.
//!
//! [`DenseIndexer`] consumes a document stream once, encodes it in
//! `batch_size` chunks through an [`EmbeddingProvider`], and keeps the
//! vectors and their ids in row order until [`DenseIndexer::save`] writes
//! them out.

use crate::embedding::EmbeddingProvider;
use crate::flat::{self, FlatIndex};
use crate::persistence::{self, DOC_IDS_FILE, INDEX_FILE, IndexMetadata, META_FILE};
use crate::types::{BuildStats, DenseConfig, SavedArtifacts, SearchHit};
use mosaic_core::{Error, Result};
use mosaic_corpus::StreamDocument;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Log an info line every this many batches.
const PROGRESS_EVERY: usize = 100;

/// Builds a flat dense index from a document stream.
pub struct DenseIndexer {
    index_dir: PathBuf,
    config: DenseConfig,
    provider: Arc<dyn EmbeddingProvider>,
    index: FlatIndex,
    doc_ids: Vec<String>,
    hasher: blake3::Hasher,
    /// Content hash read from `meta.json` by [`DenseIndexer::load`].
    /// A loaded indexer is read-only.
    loaded: Option<String>,
}

impl DenseIndexer {
    /// Create an indexer that will save into `index_dir`.
    ///
    /// Fails when the config is invalid or the provider reports a zero
    /// dimension.
    pub fn new(
        index_dir: impl Into<PathBuf>,
        config: DenseConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let dimension = provider.dimension();
        if dimension == 0 {
            return Err(Error::config(format!(
                "embedding provider '{}' reports dimension 0",
                provider.name()
            )));
        }

        Ok(Self {
            index_dir: index_dir.into(),
            index: FlatIndex::new(dimension, config.metric),
            config,
            provider,
            doc_ids: Vec::new(),
            hasher: blake3::Hasher::new(),
            loaded: None,
        })
    }

    /// Open an index previously written by [`DenseIndexer::save`].
    ///
    /// The row counts of `index.faiss`, `docids.txt` and `meta.json` must
    /// agree, and `provider` must produce vectors of the stored dimension.
    pub fn load(
        index_dir: impl Into<PathBuf>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let index_dir = index_dir.into();
        let meta_path = index_dir.join(META_FILE);
        let index_path = index_dir.join(INDEX_FILE);
        let ids_path = index_dir.join(DOC_IDS_FILE);

        let metadata = persistence::load_metadata(&meta_path)?;
        let file = File::open(&index_path).map_err(|e| Error::io_with_path(e, &index_path))?;
        let index = flat::read_faiss(BufReader::new(file))?;
        let doc_ids = persistence::read_doc_ids(&ids_path)?;

        if index.len() != doc_ids.len() || index.len() != metadata.document_count {
            return Err(Error::invalid_data(format!(
                "{}: row counts disagree (index {}, docids {}, meta {})",
                index_dir.display(),
                index.len(),
                doc_ids.len(),
                metadata.document_count
            )));
        }
        if index.dimension() != metadata.dimension || index.metric() != metadata.metric {
            return Err(Error::invalid_data(format!(
                "{}: {} does not match {}",
                index_dir.display(),
                INDEX_FILE,
                META_FILE
            )));
        }
        if provider.dimension() != index.dimension() {
            return Err(Error::config(format!(
                "provider '{}' produces {}-d vectors but the index stores {}-d vectors",
                provider.name(),
                provider.dimension(),
                index.dimension()
            )));
        }

        let config = DenseConfig {
            model_name: metadata.model_name,
            batch_size: metadata.batch_size,
            normalize: metadata.normalized,
            metric: metadata.metric,
        };
        config.validate()?;

        log::debug!("Loaded {} vectors from {}", index.len(), index_dir.display());

        Ok(Self {
            index_dir,
            config,
            provider,
            index,
            doc_ids,
            hasher: blake3::Hasher::new(),
            loaded: Some(metadata.content_hash),
        })
    }

    /// Output directory.
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Active configuration.
    pub fn config(&self) -> &DenseConfig {
        &self.config
    }

    /// Number of documents indexed so far.
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    /// True before any document has been indexed.
    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Indexed ids in row order.
    pub fn doc_ids(&self) -> &[String] {
        &self.doc_ids
    }

    /// The in-memory index.
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Hex blake3 hash over every id and passage indexed so far.
    ///
    /// For a loaded index this is the hash stored in `meta.json`.
    pub fn content_hash(&self) -> String {
        match &self.loaded {
            Some(hash) => hash.clone(),
            None => self.hasher.finalize().to_hex().to_string(),
        }
    }

    /// Embed `query` and return the `k` most similar documents, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let mut vector = self.provider.embed(query).await?;
        if self.config.normalize {
            l2_normalize(&mut vector);
        }

        let hits = self
            .index
            .search(&vector, k)?
            .into_iter()
            .filter_map(|(row, score)| {
                self.doc_ids.get(row).map(|doc_id| SearchHit {
                    doc_id: doc_id.clone(),
                    score,
                })
            })
            .collect();
        Ok(hits)
    }

    /// Encode and index documents from `docs`, stopping after `limit` items.
    ///
    /// The stream is consumed once. `limit` caps how many items are pulled
    /// from it; `None` drains it. An embedding failure aborts the build and
    /// leaves the rows of earlier batches in place.
    ///
    /// An indexer opened with [`DenseIndexer::load`] refuses to build.
    pub async fn build_from_corpus<'a, I>(
        &mut self,
        docs: I,
        limit: Option<usize>,
    ) -> Result<BuildStats>
    where
        I: IntoIterator<Item = StreamDocument<'a>>,
    {
        if self.loaded.is_some() {
            return Err(Error::operation(format!(
                "index loaded from {} is read-only; build into a new DenseIndexer",
                self.index_dir.display()
            )));
        }

        let started = Instant::now();
        let batch_size = self.config.batch_size;
        let mut docs = docs.into_iter().take(limit.unwrap_or(usize::MAX));

        let mut ids: Vec<&'a str> = Vec::with_capacity(batch_size);
        let mut passages: Vec<String> = Vec::with_capacity(batch_size);
        let mut indexed = 0usize;
        let mut batches = 0usize;

        loop {
            ids.clear();
            passages.clear();
            for doc in docs.by_ref().take(batch_size) {
                ids.push(doc.doc_id);
                passages.push(compose_passage(&doc));
            }
            if ids.is_empty() {
                break;
            }

            self.ingest_batch(&ids, &passages).await?;
            indexed += ids.len();
            batches += 1;

            log::debug!("Encoded batch {batches} ({indexed} documents)");
            if batches % PROGRESS_EVERY == 0 {
                log::info!("Indexed {indexed} documents");
            }
        }

        let stats = BuildStats {
            documents_indexed: indexed,
            batches,
            dimension: self.index.dimension(),
            content_hash: self.content_hash(),
            build_duration_ms: started.elapsed().as_millis() as u64,
        };
        log::info!(
            "Indexed {} documents in {} batches ({} ms)",
            stats.documents_indexed,
            stats.batches,
            stats.build_duration_ms
        );
        Ok(stats)
    }

    /// Embed one batch and append it. Nothing is appended unless every
    /// vector in the batch is valid.
    async fn ingest_batch(&mut self, ids: &[&str], passages: &[String]) -> Result<()> {
        let texts: Vec<&str> = passages.iter().map(String::as_str).collect();
        let mut vectors = self.provider.embed_batch(&texts).await?;

        if vectors.len() != texts.len() {
            return Err(Error::operation(format!(
                "provider '{}' returned {} embeddings for {} passages",
                self.provider.name(),
                vectors.len(),
                texts.len()
            )));
        }
        let dimension = self.index.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(Error::operation(format!(
                "provider '{}' returned a {}-d vector, expected {}",
                self.provider.name(),
                bad.len(),
                dimension
            )));
        }

        for ((id, passage), vector) in ids.iter().zip(passages).zip(vectors.iter_mut()) {
            if self.config.normalize {
                l2_normalize(vector);
            }
            self.index.add(vector)?;
            self.doc_ids.push((*id).to_string());

            self.hasher.update(id.as_bytes());
            self.hasher.update(&[0]);
            self.hasher.update(passage.as_bytes());
            self.hasher.update(&[0]);
        }
        Ok(())
    }

    /// Metadata describing the current index contents.
    pub fn metadata(&self) -> IndexMetadata {
        IndexMetadata {
            model_name: self.config.model_name.clone(),
            provider: self.provider.name().to_string(),
            dimension: self.index.dimension(),
            document_count: self.doc_ids.len(),
            metric: self.config.metric,
            normalized: self.config.normalize,
            batch_size: self.config.batch_size,
            content_hash: self.content_hash(),
            built_at: chrono::Utc::now().to_rfc3339(),
            builder_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Write `index.faiss`, `docids.txt` and `meta.json` into the index
    /// directory, creating it if needed.
    pub fn save(&self) -> Result<SavedArtifacts> {
        std::fs::create_dir_all(&self.index_dir)
            .map_err(|e| Error::io_with_path(e, &self.index_dir))?;

        let artifacts = SavedArtifacts {
            index: self.index_dir.join(INDEX_FILE),
            doc_ids: self.index_dir.join(DOC_IDS_FILE),
            meta: self.index_dir.join(META_FILE),
        };

        let file =
            File::create(&artifacts.index).map_err(|e| Error::io_with_path(e, &artifacts.index))?;
        flat::write_faiss(&self.index, BufWriter::new(file)).map_err(|e| match e {
            Error::Io(source) => Error::io_with_path(source, &artifacts.index),
            other => other,
        })?;
        persistence::write_doc_ids(&artifacts.doc_ids, &self.doc_ids)?;
        persistence::save_metadata(&artifacts.meta, &self.metadata())?;

        log::info!(
            "Saved {} vectors to {}",
            self.doc_ids.len(),
            self.index_dir.display()
        );
        Ok(artifacts)
    }
}

impl std::fmt::Debug for DenseIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseIndexer")
            .field("index_dir", &self.index_dir)
            .field("provider", &self.provider.name())
            .field("documents", &self.doc_ids.len())
            .finish()
    }
}

/// Text that gets embedded for one document: title and body joined by a
/// space, either side omitted when blank.
pub fn compose_passage(doc: &StreamDocument<'_>) -> String {
    match (doc.title.trim(), doc.text.trim()) {
        ("", text) => text.to_string(),
        (title, "") => title.to_string(),
        (title, text) => format!("{title} {text}"),
    }
}

/// Scale `vector` to unit length. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
