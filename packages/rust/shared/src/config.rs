//! Application configuration for TopicLens.
//!
//! User config lives at `~/.topiclens/topiclens.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopicLensError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "topiclens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".topiclens";

// ---------------------------------------------------------------------------
// Failure policy
// ---------------------------------------------------------------------------

/// What the loader does with a document whose extraction failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep the document as an empty text (an all-zero matrix row).
    #[default]
    Substitute,
    /// Drop the document from the corpus.
    Exclude,
}

impl FromStr for FailurePolicy {
    type Err = TopicLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substitute" => Ok(Self::Substitute),
            "exclude" => Ok(Self::Exclude),
            other => Err(TopicLensError::invalid_parameter(
                "failure_policy",
                format!("unknown policy '{other}': expected 'substitute' or 'exclude'"),
            )),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Substitute => f.write_str("substitute"),
            Self::Exclude => f.write_str("exclude"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config structs (matching topiclens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Tokenization and vocabulary settings.
    #[serde(default)]
    pub vectorizer: VectorizerConfig,

    /// Topic model settings.
    #[serde(default)]
    pub model: ModelConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Number of topics (K).
    #[serde(default = "default_topics")]
    pub topics: usize,

    /// Number of top terms reported per topic (N).
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,

    /// File extensions considered when the location is a directory.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Extraction failure policy.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Descend into sub-directories.
    #[serde(default)]
    pub recursive: bool,

    /// Maximum documents extracted at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            top_terms: default_top_terms(),
            extensions: default_extensions(),
            failure_policy: FailurePolicy::default(),
            recursive: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_topics() -> usize {
    5
}
fn default_top_terms() -> usize {
    10
}
fn default_extensions() -> Vec<String> {
    vec!["pdf".into()]
}
fn default_concurrency() -> usize {
    4
}

/// `[vectorizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Tokens shorter than this (in characters) are dropped.
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,

    /// Stopwords added on top of the built-in English list.
    #[serde(default)]
    pub extra_stopwords: Vec<String>,

    /// Minimum number of documents a term must occur in.
    #[serde(default = "default_min_df")]
    pub min_df: usize,

    /// Maximum document frequency as a fraction of the corpus.
    #[serde(default = "default_max_df_ratio")]
    pub max_df_ratio: f64,

    /// Keep only the most frequent terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_features: Option<usize>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            min_token_len: default_min_token_len(),
            extra_stopwords: Vec::new(),
            min_df: default_min_df(),
            max_df_ratio: default_max_df_ratio(),
            max_features: None,
        }
    }
}

fn default_min_token_len() -> usize {
    2
}
fn default_min_df() -> usize {
    1
}
fn default_max_df_ratio() -> f64 {
    1.0
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Seed for the topic-word initialization.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// EM iterations over the whole corpus.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Inner iterations per document in the E-step.
    #[serde(default = "default_max_doc_update_iter")]
    pub max_doc_update_iter: usize,

    /// E-step stopping tolerance (mean absolute change).
    #[serde(default = "default_mean_change_tol")]
    pub mean_change_tol: f64,

    /// Evaluate perplexity every this many iterations (0 disables).
    #[serde(default)]
    pub evaluate_every: usize,

    /// Early-stop tolerance on perplexity change.
    #[serde(default = "default_perp_tol")]
    pub perp_tol: f64,

    /// Document-topic prior; `1/K` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,

    /// Topic-term prior; `1/K` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,

    /// Abort fitting after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_iter: default_max_iter(),
            max_doc_update_iter: default_max_doc_update_iter(),
            mean_change_tol: default_mean_change_tol(),
            evaluate_every: 0,
            perp_tol: default_perp_tol(),
            alpha: None,
            eta: None,
            timeout_secs: None,
        }
    }
}

fn default_seed() -> u64 {
    42
}
fn default_max_iter() -> usize {
    10
}
fn default_max_doc_update_iter() -> usize {
    100
}
fn default_mean_change_tol() -> f64 {
    1e-3
}
fn default_perp_tol() -> f64 {
    1e-1
}

// ---------------------------------------------------------------------------
// Analysis config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime analysis configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Number of topics (K).
    pub topics: usize,
    /// Top terms per topic (N).
    pub top_terms: usize,
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    /// Extraction failure policy.
    pub failure_policy: FailurePolicy,
    /// Descend into sub-directories.
    pub recursive: bool,
    /// Maximum concurrent extractions.
    pub concurrency: usize,
    /// Vectorizer settings.
    pub vectorizer: VectorizerConfig,
    /// Model settings.
    pub model: ModelConfig,
}

impl From<&AppConfig> for AnalysisConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            topics: config.defaults.topics,
            top_terms: config.defaults.top_terms,
            extensions: normalize_extensions(&config.defaults.extensions),
            failure_policy: config.defaults.failure_policy,
            recursive: config.defaults.recursive,
            concurrency: config.defaults.concurrency,
            vectorizer: config.vectorizer.clone(),
            model: config.model.clone(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl AnalysisConfig {
    /// Reject out-of-range parameters before any I/O or fitting happens.
    pub fn validate(&self) -> Result<()> {
        if self.topics == 0 {
            return Err(TopicLensError::invalid_parameter(
                "topics",
                "topic count must be at least 1",
            ));
        }
        if self.top_terms == 0 {
            return Err(TopicLensError::invalid_parameter(
                "top_terms",
                "top term count must be at least 1",
            ));
        }
        if self.extensions.is_empty() {
            return Err(TopicLensError::invalid_parameter(
                "extensions",
                "at least one file extension is required",
            ));
        }
        if self.concurrency == 0 {
            return Err(TopicLensError::invalid_parameter(
                "concurrency",
                "concurrency must be at least 1",
            ));
        }
        if self.vectorizer.min_token_len == 0 {
            return Err(TopicLensError::invalid_parameter(
                "min_token_len",
                "minimum token length must be at least 1",
            ));
        }
        let ratio = self.vectorizer.max_df_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(TopicLensError::invalid_parameter(
                "max_df_ratio",
                format!("{ratio} is outside (0, 1]"),
            ));
        }
        if self.vectorizer.max_features == Some(0) {
            return Err(TopicLensError::invalid_parameter(
                "max_features",
                "max_features must be at least 1 when set",
            ));
        }
        if self.model.max_iter == 0 {
            return Err(TopicLensError::invalid_parameter(
                "max_iter",
                "at least one EM iteration is required",
            ));
        }
        for (name, prior) in [("alpha", self.model.alpha), ("eta", self.model.eta)] {
            if let Some(p) = prior {
                if !(p.is_finite() && p > 0.0) {
                    return Err(TopicLensError::invalid_parameter(
                        name,
                        format!("prior must be positive, got {p}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Lowercase, strip leading dots, drop empties and duplicates (order kept).
pub fn normalize_extensions(exts: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ext in exts {
        let e = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if !e.is_empty() && !out.contains(&e) {
            out.push(e);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.topiclens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TopicLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.topiclens/topiclens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TopicLensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TopicLensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TopicLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TopicLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TopicLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
