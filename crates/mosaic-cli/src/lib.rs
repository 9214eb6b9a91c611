//! Command-line front end of the Mosaic dense index builder.
//!
//! The `build-faiss` binary loads a BEIR FEVER corpus, optionally samples
//! it, embeds every document and writes `index.faiss`, `docids.txt` and
//! `meta.json`.
//!
//! # Modules
//!
//! - [`cli`]: clap argument definitions
//! - [`config`]: file and environment configuration
//! - [`app`]: the pipeline and its entry point

pub mod app;
pub mod cli;
pub mod config;

pub use app::{PipelineOptions, PipelineReport, run, run_pipeline};
pub use cli::CliArgs;
pub use config::MosaicConfig;
