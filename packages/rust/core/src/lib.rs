//! Core pipeline orchestration for TopicLens.
//!
//! This crate ties together corpus loading, vectorizing, model fitting, and
//! topic interpretation into one end-to-end call (`analyze`) that returns an
//! explicit [`AnalysisReport`].

pub mod pipeline;
pub mod report;

pub use pipeline::{ProgressReporter, SilentProgress, analyze, analyze_corpus};
pub use report::{AnalysisReport, CorpusStats, DocumentOutcome, ModelDiagnostics, ReportParams};
