//! End-to-end `analyze` pipeline: location → corpus → vocabulary → LDA → report.

use std::path::Path;
use std::time::Instant;

use tracing::{info, instrument};

use topiclens_corpus::{CancellationFlag, CorpusLoader, LoadOptions};
use topiclens_model::{LdaConfig, LdaModel, assign_topics, summarize_topics};
use topiclens_shared::{AnalysisConfig, Corpus, DocumentId, Result, RunId, TopicLensError};
use topiclens_text::Vectorizer;

use crate::report::{
    AnalysisReport, CorpusStats, ModelDiagnostics, ReportParams, document_outcomes,
};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each document is collected by the loader.
    fn document_loaded(&self, document: &DocumentId, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &AnalysisReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_loaded(&self, _document: &DocumentId, _current: usize, _total: usize) {}
    fn done(&self, _report: &AnalysisReport) {}
}

/// Run the full pipeline on the documents at `location`.
///
/// 1. Validate parameters
/// 2. Load the corpus (extraction + failure policy)
/// 3. Vectorize, fit, summarize, assign (see [`analyze_corpus`])
#[instrument(skip_all, fields(location = %location.display(), topics = config.topics))]
pub async fn analyze(
    location: &Path,
    config: &AnalysisConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancellationFlag,
) -> Result<AnalysisReport> {
    config.validate()?;

    progress.phase("Loading documents");
    let loader = CorpusLoader::new(LoadOptions::from(config)).with_cancellation(cancel.clone());
    let corpus = loader
        .load_with(location, |doc, current, total| {
            progress.document_loaded(&doc.id, current, total);
        })
        .await?;

    analyze_corpus(corpus, config, progress, cancel).await
}

/// Run the pipeline on an already-loaded corpus.
#[instrument(skip_all, fields(documents = corpus.len(), topics = config.topics))]
pub async fn analyze_corpus(
    corpus: Corpus,
    config: &AnalysisConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancellationFlag,
) -> Result<AnalysisReport> {
    let start = Instant::now();
    let run_id = RunId::new();
    config.validate()?;

    if corpus.is_empty() {
        return Err(TopicLensError::empty_corpus("corpus has no documents"));
    }

    info!(%run_id, documents = corpus.len(), "starting analysis");

    // --- Phase 1: Vocabulary ---
    progress.phase("Building vocabulary");
    let (vocabulary, dtm) = Vectorizer::from(&config.vectorizer).vectorize(&corpus)?;
    let stats = CorpusStats::from_corpus(&corpus, vocabulary.len(), dtm.total());

    info!(
        documents = dtm.n_documents(),
        vocabulary_size = vocabulary.len(),
        total_tokens = stats.total_tokens,
        "vectorized corpus"
    );

    cancel.check()?;

    // --- Phase 2: Fit ---
    progress.phase("Fitting topic model");
    let fit_start = Instant::now();
    let lda_config = LdaConfig::from_model_config(config.topics, &config.model);
    let model = tokio::task::spawn_blocking(move || LdaModel::fit(&dtm, &lda_config))
        .await
        .map_err(|e| TopicLensError::model_fit(format!("fit task failed: {e}")))??;

    let diagnostics = ModelDiagnostics {
        iterations: model.iterations(),
        perplexity: model.perplexity(),
        elapsed_ms: fit_start.elapsed().as_millis() as u64,
    };

    // --- Phase 3: Interpret ---
    progress.phase("Summarizing topics");
    let topics = summarize_topics(&model, &vocabulary, config.top_terms)?;
    let assignments = assign_topics(model.doc_topic(), &corpus)?;

    let report = AnalysisReport {
        run_id,
        generated_at: chrono::Utc::now(),
        params: ReportParams::from(config),
        stats,
        topics,
        assignments,
        documents: document_outcomes(&corpus),
        diagnostics,
    };

    info!(
        run_id = %report.run_id,
        topics = report.topics.len(),
        documents = report.assignments.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "analysis complete"
    );

    progress.done(&report);
    Ok(report)
}
