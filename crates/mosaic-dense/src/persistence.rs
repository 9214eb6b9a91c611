//! On-disk artifacts of a dense index.
//!
//! An index directory holds three files:
//!
//! - `index.faiss`: the vectors, see [`crate::flat`]
//! - `docids.txt`: one document id per line, line `n` is row `n`
//! - `meta.json`: [`IndexMetadata`]

use crate::flat::Metric;
use mosaic_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Vector index file name.
pub const INDEX_FILE: &str = "index.faiss";

/// Row-ordered document id list file name.
pub const DOC_IDS_FILE: &str = "docids.txt";

/// Metadata file name.
pub const META_FILE: &str = "meta.json";

/// Metadata stored alongside a dense index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Embedding model identifier.
    pub model_name: String,

    /// Embedding provider name.
    pub provider: String,

    /// Embedding dimension.
    pub dimension: usize,

    /// Number of indexed documents (rows in `index.faiss`).
    pub document_count: usize,

    /// Ranking metric.
    pub metric: Metric,

    /// Whether vectors were scaled to unit length.
    pub normalized: bool,

    /// Encoding batch size used.
    pub batch_size: usize,

    /// blake3 hash over indexed ids and passages.
    pub content_hash: String,

    /// Build timestamp (RFC 3339).
    pub built_at: String,

    /// Version of the builder that wrote the index.
    pub builder_version: String,
}

/// Save index metadata to a JSON file.
pub fn save_metadata(metadata_path: &Path, metadata: &IndexMetadata) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(metadata_path, json).map_err(|e| Error::io_with_path(e, metadata_path))?;
    Ok(())
}

/// Load index metadata from a JSON file.
pub fn load_metadata(metadata_path: &Path) -> Result<IndexMetadata> {
    let json = std::fs::read_to_string(metadata_path)
        .map_err(|e| Error::io_with_path(e, metadata_path))?;
    let metadata: IndexMetadata = serde_json::from_str(&json)?;
    Ok(metadata)
}

/// Write ids one per line, in row order.
///
/// Ids containing a line break would corrupt the row mapping and are rejected.
pub fn write_doc_ids(path: &Path, ids: &[String]) -> Result<()> {
    if let Some(bad) = ids.iter().find(|id| id.contains(['\n', '\r'])) {
        return Err(Error::invalid_data(format!(
            "document id {bad:?} contains a line break"
        )));
    }

    let file = File::create(path).map_err(|e| Error::io_with_path(e, path))?;
    let mut writer = BufWriter::new(file);
    for id in ids {
        writeln!(writer, "{id}").map_err(|e| Error::io_with_path(e, path))?;
    }
    writer.flush().map_err(|e| Error::io_with_path(e, path))?;
    Ok(())
}

/// Read ids written by [`write_doc_ids`].
pub fn read_doc_ids(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| Error::io_with_path(e, path))?;
    BufReader::new(file)
        .lines()
        .map(|line| line.map_err(|e| Error::io_with_path(e, path)))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
