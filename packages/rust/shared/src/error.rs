//! Error types for TopicLens.
//!
//! Library crates use [`TopicLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use serde::Serialize;

/// Top-level error type for all TopicLens operations.
#[derive(Debug, thiserror::Error)]
pub enum TopicLensError {
    /// A single document could not be turned into text.
    #[error("extraction error for {document}: {reason}")]
    Extraction { document: String, reason: String },

    /// No usable documents were found at the requested location.
    #[error("empty corpus: {message}")]
    EmptyCorpus { message: String },

    /// Tokenization and filtering removed every term.
    #[error("empty vocabulary: {message}")]
    EmptyVocabulary { message: String },

    /// The topic model could not be fitted (bad K, degenerate matrix, timeout).
    #[error("model fit error: {message}")]
    ModelFit { message: String },

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: String, message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The run was cancelled before completion.
    #[error("analysis cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TopicLensError>;

/// Stable, machine-readable discriminant of a [`TopicLensError`].
///
/// Presentation layers match on this to pick an actionable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Extraction,
    EmptyCorpus,
    EmptyVocabulary,
    ModelFit,
    InvalidParameter,
    Config,
    Io,
    Cancelled,
}

impl TopicLensError {
    /// Create an extraction error for the named document.
    pub fn extraction(document: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            document: document.into(),
            reason: reason.into(),
        }
    }

    /// Create an empty-corpus error from any displayable message.
    pub fn empty_corpus(msg: impl Into<String>) -> Self {
        Self::EmptyCorpus {
            message: msg.into(),
        }
    }

    /// Create an empty-vocabulary error from any displayable message.
    pub fn empty_vocabulary(msg: impl Into<String>) -> Self {
        Self::EmptyVocabulary {
            message: msg.into(),
        }
    }

    /// Create a model fit error from any displayable message.
    pub fn model_fit(msg: impl Into<String>) -> Self {
        Self::ModelFit {
            message: msg.into(),
        }
    }

    /// Create an invalid-parameter error naming the offending parameter.
    pub fn invalid_parameter(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::EmptyCorpus { .. } => ErrorKind::EmptyCorpus,
            Self::EmptyVocabulary { .. } => ErrorKind::EmptyVocabulary,
            Self::ModelFit { .. } => ErrorKind::ModelFit,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether the pipeline can continue past this error.
    ///
    /// Only per-document extraction failures are recoverable; everything
    /// else aborts the invocation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Extraction { .. })
    }
}
