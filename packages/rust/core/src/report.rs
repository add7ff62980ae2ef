//! The result object of one analysis run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use topiclens_shared::{
    AnalysisConfig, Corpus, DocumentFormat, DocumentId, DocumentTopicAssignment,
    ExtractionStatus, FailurePolicy, RunId, TopicSummary,
};

/// Everything one `analyze` call produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub generated_at: DateTime<Utc>,
    pub params: ReportParams,
    pub stats: CorpusStats,
    /// One summary per topic, in topic order.
    pub topics: Vec<TopicSummary>,
    /// One assignment per corpus document, in corpus order.
    pub assignments: Vec<DocumentTopicAssignment>,
    /// Extraction outcome of every enumerated document, including excluded ones.
    pub documents: Vec<DocumentOutcome>,
    pub diagnostics: ModelDiagnostics,
}

/// Effective parameters of the run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportParams {
    pub topics: usize,
    pub top_terms: usize,
    pub seed: u64,
    pub failure_policy: FailurePolicy,
    pub extensions: Vec<String>,
}

impl From<&AnalysisConfig> for ReportParams {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            topics: config.topics,
            top_terms: config.top_terms,
            seed: config.model.seed,
            failure_policy: config.failure_policy,
            extensions: config.extensions.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    /// Documents enumerated at the location.
    pub considered: usize,
    /// Documents that extracted successfully.
    pub loaded: usize,
    /// Documents kept as empty rows after a failed extraction.
    pub failed: usize,
    /// Documents dropped by the exclude policy.
    pub excluded: usize,
    pub vocabulary_size: usize,
    pub total_tokens: u64,
}

/// Per-document extraction outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    /// Row in the corpus, `None` when the document was excluded.
    pub index: Option<usize>,
    pub document: DocumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<DocumentFormat>,
    pub byte_len: usize,
    pub content_hash: String,
    pub status: ExtractionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelDiagnostics {
    pub iterations: usize,
    pub perplexity: f64,
    pub elapsed_ms: u64,
}

impl CorpusStats {
    pub(crate) fn from_corpus(corpus: &Corpus, vocabulary_size: usize, total_tokens: u64) -> Self {
        let failed = corpus.failed_count();
        Self {
            considered: corpus.len() + corpus.excluded.len(),
            loaded: corpus.len() - failed,
            failed,
            excluded: corpus.excluded.len(),
            vocabulary_size,
            total_tokens,
        }
    }
}

/// Outcomes for kept documents (in corpus order) followed by excluded ones.
pub(crate) fn document_outcomes(corpus: &Corpus) -> Vec<DocumentOutcome> {
    let kept = corpus.iter().enumerate().map(|(i, doc)| DocumentOutcome {
        index: Some(i),
        document: doc.id.clone(),
        format: doc.format,
        byte_len: doc.byte_len,
        content_hash: doc.content_hash.clone(),
        status: doc.status.clone(),
    });
    let excluded = corpus.excluded.iter().map(|ex| DocumentOutcome {
        index: None,
        document: ex.id.clone(),
        format: ex.format,
        byte_len: ex.byte_len,
        content_hash: ex.content_hash.clone(),
        status: ExtractionStatus::Failed {
            reason: ex.reason.clone(),
        },
    });
    kept.chain(excluded).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use topiclens_shared::{Document, ExcludedDocument, content_hash};

    fn corpus() -> Corpus {
        let mut failed = Document::from_text("b.txt", "");
        failed.text = None;
        failed.status = ExtractionStatus::Failed {
            reason: "unreadable".into(),
        };
        let mut corpus = Corpus::new(vec![Document::from_text("a.txt", "alpha"), failed]);
        corpus.excluded.push(ExcludedDocument {
            id: DocumentId::from("c.pdf"),
            reason: "no extractable text layer".into(),
            format: Some(DocumentFormat::Pdf),
            byte_len: 2048,
            content_hash: content_hash(b"scanned pages"),
        });
        corpus
    }

    #[test]
    fn stats_count_every_outcome() {
        let stats = CorpusStats::from_corpus(&corpus(), 7, 12);
        assert_eq!(
            stats,
            CorpusStats {
                considered: 3,
                loaded: 1,
                failed: 1,
                excluded: 1,
                vocabulary_size: 7,
                total_tokens: 12,
            }
        );
    }

    #[test]
    fn outcomes_list_kept_then_excluded() {
        let outcomes = document_outcomes(&corpus());
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].index, Some(0));
        assert_eq!(outcomes[1].index, Some(1));
        assert!(!outcomes[1].status.is_ok());
        assert_eq!(outcomes[2].index, None);
        assert_eq!(outcomes[2].document.0, "c.pdf");
        assert_eq!(outcomes[2].format, Some(DocumentFormat::Pdf));
        assert_eq!(outcomes[2].byte_len, 2048);
        assert_eq!(outcomes[2].content_hash, content_hash(b"scanned pages"));
    }
}
