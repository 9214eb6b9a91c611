//! The index-building pipeline behind `build-faiss`.
//!
//! [`run`] wires config, logging, the dataset and the embedding model
//! together; [`run_pipeline`] is the part that turns a loaded corpus into
//! saved index artifacts and can be driven with any
//! [`EmbeddingProvider`].

use crate::cli::CliArgs;
use crate::config::MosaicConfig;
use mosaic_core::Result;
use mosaic_corpus::{Corpus, SampleSelection, document_stream, ensure_beir_fever, sample_corpus};
use mosaic_dense::{
    BuildStats, DenseConfig, DenseIndexer, EmbeddingProvider, Metric, SavedArtifacts,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialise tracing-based logging.
///
/// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
/// Library crates log through `log`; those records are forwarded too.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Ignore error if a subscriber is already set (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// Options
// ============================================================================

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// BEIR FEVER directory containing `corpus.jsonl`.
    pub data_dir: PathBuf,
    /// Qrels split loaded with the corpus.
    pub split: String,
    /// Where the three index artifacts are written.
    pub index_dir: PathBuf,
    /// Sentence-embedding model id.
    pub model: String,
    /// Passages per embedding call.
    pub batch_size: usize,
    /// Sample size; `None` or `Some(0)` indexes the whole corpus.
    pub sample: Option<usize>,
    /// Seed of the sampler.
    pub seed: u64,
    /// Cap on documents pulled from the stream.
    pub limit: Option<usize>,
    /// Ranking metric of the saved index.
    pub metric: Metric,
    /// L2-normalise vectors before indexing.
    pub normalize: bool,
    /// Model download cache.
    pub cache_dir: Option<PathBuf>,
}

impl PipelineOptions {
    /// Overlay command-line flags on the loaded config.
    pub fn resolve(args: &CliArgs, config: &MosaicConfig) -> Self {
        Self {
            data_dir: args
                .data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.dataset.data_dir)),
            split: args
                .split
                .clone()
                .unwrap_or_else(|| config.dataset.split.clone()),
            index_dir: args
                .index_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.index.dir)),
            model: args
                .model
                .clone()
                .unwrap_or_else(|| config.index.model.clone()),
            batch_size: args.batch_size.unwrap_or(config.index.batch_size),
            sample: args.sample,
            seed: args.seed.unwrap_or(config.sampling.seed),
            limit: args.limit,
            metric: args.metric.unwrap_or(config.index.metric),
            normalize: config.index.normalize && !args.no_normalize,
            cache_dir: args
                .cache_dir
                .clone()
                .or_else(|| config.index.cache_dir.as_ref().map(PathBuf::from)),
        }
    }

    /// Indexer configuration for these options.
    pub fn dense_config(&self) -> DenseConfig {
        DenseConfig::new(&self.model, self.batch_size)
            .with_metric(self.metric)
            .with_normalize(self.normalize)
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::resolve(&CliArgs::default(), &MosaicConfig::default())
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// The sampled subset, when `--sample` was given.
    pub selection: Option<SampleSelection>,
    /// Counts and timing of the build.
    pub stats: BuildStats,
    /// Paths of the files written.
    pub artifacts: SavedArtifacts,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Sample, stream, embed and save `corpus`.
///
/// Progress notices go to `out`. `make_provider` is called once, after the
/// notices for sampling and the build target, so a slow model load shows up
/// after them.
pub async fn run_pipeline<W, F>(
    options: &PipelineOptions,
    corpus: &Corpus,
    make_provider: F,
    out: &mut W,
) -> Result<PipelineReport>
where
    W: Write,
    F: FnOnce(&PipelineOptions) -> Result<Arc<dyn EmbeddingProvider>>,
{
    let config = options.dense_config();
    config.validate()?;

    let selection = sample_corpus(corpus, options.sample, options.seed);
    if let Some(selection) = &selection {
        writeln!(out, "{}", selection.notice())?;
    }

    writeln!(
        out,
        "Building FAISS at {} using model '{}' ...",
        options.index_dir.display(),
        options.model
    )?;

    let provider = make_provider(options)?;
    let mut indexer = DenseIndexer::new(&options.index_dir, config, provider)?;

    let stream = document_stream(corpus, selection.as_ref());
    let stats = indexer.build_from_corpus(stream, options.limit).await?;
    let artifacts = indexer.save()?;

    writeln!(out, "Saved index.faiss, docids.txt, meta.json")?;
    out.flush()?;

    Ok(PipelineReport {
        selection,
        stats,
        artifacts,
    })
}

/// Load the sentence-embedding model named in `options`.
#[cfg(feature = "fastembed")]
pub fn load_model(options: &PipelineOptions) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider =
        mosaic_dense::FastEmbedProvider::new(&options.model, options.cache_dir.as_deref())?;
    Ok(Arc::new(provider))
}

/// Load the sentence-embedding model named in `options`.
#[cfg(not(feature = "fastembed"))]
pub fn load_model(options: &PipelineOptions) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(mosaic_core::Error::config(format!(
        "cannot load '{}': build-faiss was built without the `fastembed` feature",
        options.model
    )))
}

/// Run `build-faiss` with parsed arguments.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    use anyhow::Context;

    init_logging(args.verbose, args.quiet);

    let config = MosaicConfig::load(args.config.as_deref()).context("loading configuration")?;
    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let options = PipelineOptions::resolve(&args, &config);
    tracing::debug!(?options, "Resolved options");

    let dataset = ensure_beir_fever(&options.data_dir, &options.split)
        .with_context(|| format!("loading BEIR FEVER from {}", options.data_dir.display()))?;
    tracing::info!(
        documents = dataset.corpus.len(),
        queries = dataset.queries.len(),
        "Loaded corpus"
    );

    let mut stdout = std::io::stdout();
    let report = run_pipeline(&options, &dataset.corpus, load_model, &mut stdout)
        .await
        .with_context(|| format!("building index at {}", options.index_dir.display()))?;

    tracing::info!(
        documents = report.stats.documents_indexed,
        dimension = report.stats.dimension,
        duration_ms = report.stats.build_duration_ms,
        "Build finished"
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
