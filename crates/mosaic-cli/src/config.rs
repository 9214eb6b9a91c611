//! Configuration for the index builder.
//!
//! [`MosaicConfig`] is loaded from a TOML file and `MOSAIC_*` environment
//! variables using the `confyg` crate, on top of built-in defaults.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `MOSAIC_CONFIG` environment variable
//! 3. XDG default: `~/.config/mosaic/config.toml`
//! 4. Built-in defaults
//!
//! Environment variables such as `MOSAIC_INDEX_MODEL` overlay the file.
//! Command-line flags overlay both; see [`crate::app::PipelineOptions`].

use confyg::{Confygery, env};
use mosaic_core::{Error, Result};
use mosaic_dense::Metric;
use mosaic_dense::types::{DEFAULT_BATCH_SIZE, DEFAULT_MODEL};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

const ENV_PREFIX: &str = "MOSAIC";
const CONFIG_PATH_VAR: &str = "MOSAIC_CONFIG";

// ============================================================================
// Configuration structs
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Where the BEIR dataset lives.
    pub dataset: DatasetConfig,

    /// Index output and embedding settings.
    pub index: IndexConfig,

    /// Sampling settings.
    pub sampling: SamplingConfig,
}

/// Dataset location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory containing `corpus.jsonl`.
    pub data_dir: String,

    /// Qrels split name.
    pub split: String,
}

/// Index output and embedding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Output directory for the index artifacts.
    pub dir: String,

    /// Sentence-embedding model id.
    pub model: String,

    /// Passages per embedding call.
    #[serde(deserialize_with = "native_or_string")]
    pub batch_size: usize,

    /// Ranking metric: `inner_product` or `l2`.
    pub metric: Metric,

    /// L2-normalise vectors before indexing.
    #[serde(deserialize_with = "native_or_string")]
    pub normalize: bool,

    /// Model download cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
}

/// Sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seed of the sampler's generator.
    #[serde(deserialize_with = "native_or_string")]
    pub seed: u64,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/beir/fever".to_string(),
            split: "test".to_string(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: "data/faiss".to_string(),
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            metric: Metric::default(),
            normalize: true,
            cache_dir: None,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

/// Accept either a native TOML value or its string form.
///
/// `confyg` hands environment values over as strings.
fn native_or_string<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Native(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Native(v) => Ok(v),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl MosaicConfig {
    /// Load configuration from file, environment, and defaults.
    ///
    /// A config path that does not exist is skipped.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            log::debug!("Reading config from {}", path.display());
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level(ENV_PREFIX);
        env_opts.add_section("dataset");
        env_opts.add_section("index");
        env_opts.add_section("sampling");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        resolve_config_path_from(explicit, std::env::var(CONFIG_PATH_VAR).ok())
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mosaic").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

fn resolve_config_path_from(
    explicit: Option<&str>,
    from_env: Option<String>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    if let Some(path) = from_env.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    MosaicConfig::default_config_path()
}

// ============================================================================
// Tests
// ============================================================================
