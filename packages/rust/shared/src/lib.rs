//! Shared types, error model, and configuration for TopicLens.
//!
//! This crate is the foundation depended on by all other TopicLens crates.
//! It provides:
//! - [`TopicLensError`]: the unified error type
//! - Domain types ([`Document`], [`Corpus`], [`TopicSummary`], [`DocumentTopicAssignment`])
//! - Configuration ([`AppConfig`], [`AnalysisConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalysisConfig, AppConfig, DefaultsConfig, FailurePolicy, ModelConfig, VectorizerConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
    normalize_extensions,
};
pub use error::{ErrorKind, Result, TopicLensError};
pub use types::{
    Corpus, Document, DocumentFormat, DocumentId, DocumentTopicAssignment, ExcludedDocument,
    ExtractionStatus, RunId, TermWeight, TopicSummary, content_hash,
};
