//! CLI argument parsing.
//!
//! Every value flag is optional so that unset flags fall through to the
//! config file, then `MOSAIC_*` environment variables, then built-in
//! defaults.

use clap::Parser;
use mosaic_dense::Metric;
use std::path::PathBuf;

/// Arguments of `build-faiss`.
#[derive(Parser, Debug, Default)]
#[command(
    name = "build-faiss",
    author,
    version,
    about = "Build a dense FAISS index over the BEIR FEVER corpus",
    long_about = None
)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "MOSAIC_CONFIG")]
    pub config: Option<String>,

    /// Output directory for index.faiss, docids.txt and meta.json [default: data/faiss].
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Sentence-embedding model [default: all-MiniLM-L6-v2].
    #[arg(long)]
    pub model: Option<String>,

    /// Passages per embedding call [default: 64].
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Index a reproducible random subset of this many documents.
    #[arg(long)]
    pub sample: Option<usize>,

    /// Seed for --sample [default: 42].
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after ingesting this many documents.
    #[arg(long)]
    pub limit: Option<usize>,

    /// BEIR FEVER directory containing corpus.jsonl [default: data/beir/fever].
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Qrels split to load alongside the corpus [default: test].
    #[arg(long)]
    pub split: Option<String>,

    /// Ranking metric of the index: inner_product or l2 [default: inner_product].
    #[arg(long)]
    pub metric: Option<Metric>,

    /// Index raw vectors instead of L2-normalised ones.
    #[arg(long)]
    pub no_normalize: bool,

    /// Directory for downloaded model files.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the resolved configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

// ============================================================================
// Tests
// ============================================================================
