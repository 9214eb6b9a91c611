//! BEIR dataset loading.
//!
//! Reads the on-disk BEIR layout for a single dataset directory:
//!
//! ```text
//! <data_dir>/
//! ├── corpus.jsonl        {"_id": "...", "title": "...", "text": "..."}
//! ├── queries.jsonl       {"_id": "...", "text": "..."}
//! └── qrels/<split>.tsv   query-id <TAB> corpus-id <TAB> score
//! ```
//!
//! Downloading and unpacking the archive is left to the caller; these
//! functions only read files that are already present.

use indexmap::IndexMap;
use mosaic_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// File name of the corpus inside a BEIR dataset directory.
pub const CORPUS_FILE: &str = "corpus.jsonl";

/// File name of the queries inside a BEIR dataset directory.
pub const QUERIES_FILE: &str = "queries.jsonl";

/// Directory holding per-split relevance judgements.
pub const QRELS_DIR: &str = "qrels";

// ============================================================================
// Types
// ============================================================================

/// A single corpus document. Either field may be missing in the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Document title (FEVER uses the Wikipedia page title).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CorpusRecord {
    /// Create a record with both fields present.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            text: Some(text.into()),
        }
    }

    /// Create a record with only a body.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            title: None,
            text: Some(text.into()),
        }
    }
}

/// Document id → record, in the order the records were read.
pub type Corpus = IndexMap<String, CorpusRecord>;

/// Query id → query text.
pub type Queries = IndexMap<String, String>;

/// Query id → (corpus id → relevance score).
pub type Qrels = IndexMap<String, IndexMap<String, i32>>;

/// A loaded BEIR dataset.
#[derive(Debug, Clone, Default)]
pub struct BeirDataset {
    /// All corpus documents.
    pub corpus: Corpus,

    /// Queries; empty when `queries.jsonl` is absent.
    pub queries: Queries,

    /// Relevance judgements for the requested split; empty when absent.
    pub qrels: Qrels,
}

#[derive(Deserialize)]
struct CorpusLine {
    #[serde(rename = "_id")]
    id: serde_json::Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct QueryLine {
    #[serde(rename = "_id")]
    id: serde_json::Value,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct QrelRow {
    #[serde(rename = "query-id")]
    query_id: String,
    #[serde(rename = "corpus-id")]
    corpus_id: String,
    score: i32,
}

// ============================================================================
// Loading
// ============================================================================

/// Load the FEVER dataset from a local BEIR directory.
///
/// `corpus.jsonl` is required. `queries.jsonl` and `qrels/<split>.tsv` are
/// loaded when present and left empty otherwise, since only the corpus is
/// needed to build an index.
pub fn ensure_beir_fever(data_dir: &Path, split: &str) -> Result<BeirDataset> {
    let corpus_path = data_dir.join(CORPUS_FILE);
    if !corpus_path.exists() {
        return Err(Error::not_found(format!(
            "{} (download and unzip the BEIR 'fever' archive into {})",
            corpus_path.display(),
            data_dir.display()
        )));
    }

    let corpus = load_corpus(&corpus_path)?;
    log::info!(
        "Loaded {} corpus documents from {}",
        corpus.len(),
        corpus_path.display()
    );

    let queries_path = data_dir.join(QUERIES_FILE);
    let queries = if queries_path.exists() {
        load_queries(&queries_path)?
    } else {
        log::debug!("No queries file at {}", queries_path.display());
        Queries::new()
    };

    let qrels_path = qrels_path(data_dir, split);
    let qrels = if qrels_path.exists() {
        load_qrels(&qrels_path)?
    } else {
        log::debug!("No qrels file at {}", qrels_path.display());
        Qrels::new()
    };

    Ok(BeirDataset {
        corpus,
        queries,
        qrels,
    })
}

/// Path of the qrels file for a split.
pub fn qrels_path(data_dir: &Path, split: &str) -> PathBuf {
    data_dir.join(QRELS_DIR).join(format!("{split}.tsv"))
}

/// Load `corpus.jsonl`.
///
/// Blank lines are skipped. When an id appears twice, the later record wins
/// and keeps the position of the first.
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let mut corpus = Corpus::new();
    for_each_json_line(path, |line_no, line| {
        let parsed: CorpusLine = serde_json::from_str(line).map_err(|e| {
            Error::parse(format!("{}:{}: {}", path.display(), line_no, e))
        })?;
        let id = json_id(&parsed.id)
            .ok_or_else(|| Error::parse(format!("{}:{}: invalid _id", path.display(), line_no)))?;
        corpus.insert(
            id,
            CorpusRecord {
                title: parsed.title,
                text: parsed.text,
            },
        );
        Ok(())
    })?;
    Ok(corpus)
}

/// Load `queries.jsonl`. A query without text maps to an empty string.
pub fn load_queries(path: &Path) -> Result<Queries> {
    let mut queries = Queries::new();
    for_each_json_line(path, |line_no, line| {
        let parsed: QueryLine = serde_json::from_str(line).map_err(|e| {
            Error::parse(format!("{}:{}: {}", path.display(), line_no, e))
        })?;
        let id = json_id(&parsed.id)
            .ok_or_else(|| Error::parse(format!("{}:{}: invalid _id", path.display(), line_no)))?;
        queries.insert(id, parsed.text.unwrap_or_default());
        Ok(())
    })?;
    Ok(queries)
}

/// Load a tab-separated qrels file with a `query-id corpus-id score` header.
pub fn load_qrels(path: &Path) -> Result<Qrels> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .map_err(|e| Error::parse(format!("{}: {e}", path.display())))?;

    let mut qrels = Qrels::new();
    for row in reader.deserialize::<QrelRow>() {
        let row = row.map_err(|e| Error::parse(format!("{}: {e}", path.display())))?;
        qrels
            .entry(row.query_id)
            .or_default()
            .insert(row.corpus_id, row.score);
    }
    Ok(qrels)
}

// ============================================================================
// Helpers
// ============================================================================

/// Call `f` with the 1-based line number and contents of every non-blank line.
fn for_each_json_line<F>(path: &Path, mut f: F) -> Result<()>
where
    F: FnMut(usize, &str) -> Result<()>,
{
    let file = File::open(path).map_err(|e| Error::io_with_path(e, path))?;
    let reader = BufReader::new(file);

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io_with_path(e, path))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        f(idx + 1, trimmed)?;
    }
    Ok(())
}

/// BEIR ids are strings, but some exports write numeric ids.
fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
