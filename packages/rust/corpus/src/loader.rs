//! Concurrent corpus loading with a single failure policy.
//!
//! Extraction is CPU-bound and runs on the blocking pool, at most
//! `concurrency` documents at a time. Results are collected in enumeration
//! order, so row `i` of the corpus is always the `i`-th enumerated path no
//! matter which extraction finishes first.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use topiclens_extract::{DefaultExtractor, Extractor};
use topiclens_shared::{
    AnalysisConfig, Corpus, Document, DocumentFormat, DocumentId, ExcludedDocument,
    ExtractionStatus, FailurePolicy, Result, TopicLensError, content_hash, normalize_extensions,
};

use crate::walk;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation shared between a caller and a running analysis.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TopicLensError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Loader settings, usually derived from an [`AnalysisConfig`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    pub recursive: bool,
    /// Maximum documents extracted at once.
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for LoadOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            extensions: normalize_extensions(&config.extensions),
            recursive: config.recursive,
            concurrency: config.concurrency,
            failure_policy: config.failure_policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Builds a [`Corpus`] from a file or directory.
pub struct CorpusLoader {
    options: LoadOptions,
    extractor: Arc<dyn Extractor>,
    cancel: CancellationFlag,
}

impl CorpusLoader {
    /// Create a loader using the built-in extractor.
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            extractor: Arc::new(DefaultExtractor),
            cancel: CancellationFlag::new(),
        }
    }

    /// Replace the extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Observe `flag` before each document's extraction starts.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Load the corpus at `location`.
    pub async fn load(&self, location: &Path) -> Result<Corpus> {
        self.load_with(location, |_, _, _| {}).await
    }

    /// Load the corpus at `location`, calling `on_document(doc, current, total)`
    /// as each document is collected (in corpus order).
    #[instrument(
        skip_all,
        fields(location = %location.display(), policy = %self.options.failure_policy)
    )]
    pub async fn load_with<F>(&self, location: &Path, mut on_document: F) -> Result<Corpus>
    where
        F: FnMut(&Document, usize, usize),
    {
        let start = Instant::now();
        self.cancel.check()?;

        let paths = self.enumerate(location).await?;
        if paths.is_empty() {
            return Err(TopicLensError::empty_corpus(format!(
                "no documents matching [{}] in {}",
                self.options.extensions.join(", "),
                location.display()
            )));
        }

        let total = paths.len();
        info!(
            documents = total,
            concurrency = self.options.concurrency,
            "loading corpus"
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut handles = Vec::with_capacity(total);

        for path in paths.iter().cloned() {
            let sem = semaphore.clone();
            let cancel = self.cancel.clone();
            let extractor = self.extractor.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|_| TopicLensError::Cancelled)?;
                cancel.check()?;

                let task_path = path.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    load_document(extractor.as_ref(), &task_path)
                })
                .await;
                let document = match joined {
                    Ok(document) => document,
                    Err(e) => failed_document(&path, format!("extraction task failed: {e}")),
                };
                Ok::<Document, TopicLensError>(document)
            }));
        }

        let mut documents = Vec::with_capacity(total);
        let mut excluded = Vec::new();

        for (i, (path, handle)) in paths.iter().zip(handles).enumerate() {
            let document = match handle.await {
                Ok(outcome) => outcome?,
                Err(e) => failed_document(path, format!("loader task failed: {e}")),
            };

            on_document(&document, i + 1, total);

            if let (ExtractionStatus::Failed { reason }, FailurePolicy::Exclude) =
                (&document.status, self.options.failure_policy)
            {
                excluded.push(ExcludedDocument {
                    id: document.id.clone(),
                    reason: reason.clone(),
                    format: document.format,
                    byte_len: document.byte_len,
                    content_hash: document.content_hash.clone(),
                });
                continue;
            }
            documents.push(document);
        }

        if documents.is_empty() {
            return Err(TopicLensError::empty_corpus(format!(
                "all {total} documents failed extraction"
            )));
        }

        let corpus = Corpus {
            documents,
            excluded,
        };

        info!(
            loaded = corpus.len(),
            failed = corpus.failed_count(),
            excluded = corpus.excluded.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "corpus loaded"
        );

        Ok(corpus)
    }

    async fn enumerate(&self, location: &Path) -> Result<Vec<PathBuf>> {
        let location_for_error = location.to_path_buf();
        let location = location_for_error.clone();
        let extensions = self.options.extensions.clone();
        let recursive = self.options.recursive;

        tokio::task::spawn_blocking(move || walk::enumerate(&location, &extensions, recursive))
            .await
            .map_err(|e| TopicLensError::io(location_for_error, std::io::Error::other(e)))?
    }
}

// ---------------------------------------------------------------------------
// Per-document work (blocking)
// ---------------------------------------------------------------------------

/// Read and extract one document. Failures are recorded in the returned
/// document's status, never raised.
fn load_document(extractor: &dyn Extractor, path: &Path) -> Document {
    let id = DocumentId::from_path(path);

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return failed_document(path, format!("unreadable: {e}")),
    };

    let format = DocumentFormat::from_path(path);
    let outcome = match format {
        Some(format) => extractor.extract(&id, &bytes, format),
        None => Err(TopicLensError::extraction(
            id.to_string(),
            "unsupported document format",
        )),
    };

    let (text, status) = match outcome {
        Ok(text) => {
            debug!(document = %id, chars = text.len(), "document extracted");
            (Some(text), ExtractionStatus::Ok)
        }
        Err(e) => {
            let reason = match e {
                TopicLensError::Extraction { reason, .. } => reason,
                other => other.to_string(),
            };
            warn!(document = %id, %reason, "extraction failed");
            (None, ExtractionStatus::Failed { reason })
        }
    };

    Document {
        id,
        path: path.to_path_buf(),
        format,
        byte_len: bytes.len(),
        content_hash: content_hash(&bytes),
        text,
        status,
    }
}

fn failed_document(path: &Path, reason: String) -> Document {
    let id = DocumentId::from_path(path);
    warn!(document = %id, %reason, "extraction failed");
    Document {
        id,
        path: path.to_path_buf(),
        format: DocumentFormat::from_path(path),
        byte_len: 0,
        content_hash: content_hash(&[]),
        text: None,
        status: ExtractionStatus::Failed { reason },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
