//! Core domain types shared by every pipeline stage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one analysis run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DocumentId / DocumentFormat
// ---------------------------------------------------------------------------

/// Identity of a document: its path as given to the loader.
///
/// Owned and cheap to clone, so presentation code can hand an independent
/// copy to every per-file handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Build an identity from a filesystem path.
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    /// The final path component, for compact display.
    pub fn file_name(&self) -> &str {
        Path::new(&self.0)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(self.0.as_str())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Binary formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Html,
    PlainText,
}

impl DocumentFormat {
    /// Detect the format from a file extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "html" | "htm" | "xhtml" => Some(Self::Html),
            "txt" | "text" | "md" | "markdown" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

// ---------------------------------------------------------------------------
// Document / Corpus
// ---------------------------------------------------------------------------

/// Outcome of running the extractor on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionStatus {
    Ok,
    Failed { reason: String },
}

impl ExtractionStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// A single document in the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Identity (path as enumerated by the loader).
    pub id: DocumentId,
    /// Location of the raw bytes.
    pub path: PathBuf,
    /// Detected format, if the extension is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DocumentFormat>,
    /// Size of the raw bytes.
    pub byte_len: usize,
    /// SHA-256 of the raw bytes (hex).
    pub content_hash: String,
    /// Extracted text; `None` when extraction failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Extraction outcome.
    pub status: ExtractionStatus,
}

impl Document {
    /// Build a document from in-memory text (already extracted).
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        let text = text.into();
        Self {
            path: PathBuf::from(&id),
            id: DocumentId(id),
            format: Some(DocumentFormat::PlainText),
            byte_len: text.len(),
            content_hash: content_hash(text.as_bytes()),
            text: Some(text),
            status: ExtractionStatus::Ok,
        }
    }

    /// The text to vectorize: extracted text, or empty for a failed document.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// A document dropped from the corpus by the `exclude` failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedDocument {
    pub id: DocumentId,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DocumentFormat>,
    #[serde(default)]
    pub byte_len: usize,
    /// Kept so duplicates stay traceable even when the document is dropped.
    #[serde(default)]
    pub content_hash: String,
}

/// Ordered sequence of documents. Row `i` of every downstream matrix is
/// `documents[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<Document>,
    /// Documents that were enumerated but not kept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<ExcludedDocument>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            excluded: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    /// Texts in corpus order (empty string for failed documents).
    pub fn texts(&self) -> Vec<&str> {
        self.documents.iter().map(Document::text_or_empty).collect()
    }

    /// Number of kept documents whose extraction failed.
    pub fn failed_count(&self) -> usize {
        self.documents.iter().filter(|d| !d.status.is_ok()).count()
    }
}

/// Hex-encoded SHA-256 of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Analysis output
// ---------------------------------------------------------------------------

/// A vocabulary term and its weight in a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

/// Top terms of one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    /// Topic index in `0..K`.
    pub topic: usize,
    /// Terms in descending weight order.
    pub terms: Vec<TermWeight>,
    /// Share of the corpus' document-topic mass held by this topic.
    pub prevalence: f64,
}

impl TopicSummary {
    /// Just the term strings, in rank order.
    pub fn term_list(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.term.as_str()).collect()
    }
}

impl std::fmt::Display for TopicSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Topic {}: {}", self.topic, self.term_list().join(", "))
    }
}

/// The dominant topic of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTopicAssignment {
    /// Row index in the corpus.
    pub index: usize,
    pub document: DocumentId,
    pub topic: usize,
    /// Probability of `topic` for this document.
    pub score: f64,
}

impl std::fmt::Display for DocumentTopicAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> Topic {} (score: {:.2})",
            self.document.file_name(),
            self.topic,
            self.score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(
            DocumentFormat::from_path(Path::new("/tmp/notes.Md")),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("/tmp/archive.zip")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("/tmp/README")), None);
    }

    #[test]
    fn document_id_file_name() {
        let id = DocumentId::from_path(Path::new("/data/papers/lda.pdf"));
        assert_eq!(id.file_name(), "lda.pdf");
        assert_eq!(DocumentId::from("plain").file_name(), "plain");
    }

    #[test]
    fn failed_documents_read_as_empty() {
        let mut doc = Document::from_text("a.txt", "hello");
        assert_eq!(doc.text_or_empty(), "hello");

        doc.text = None;
        doc.status = ExtractionStatus::Failed {
            reason: "encrypted".into(),
        };
        assert_eq!(doc.text_or_empty(), "");

        let corpus = Corpus::new(vec![doc, Document::from_text("b.txt", "world")]);
        assert_eq!(corpus.failed_count(), 1);
        assert_eq!(corpus.texts(), vec!["", "world"]);
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn extraction_status_serialization() {
        let json = serde_json::to_string(&ExtractionStatus::Failed {
            reason: "bad".into(),
        })
        .expect("serialize");
        assert_eq!(json, r#"{"status":"failed","reason":"bad"}"#);
    }

    #[test]
    fn assignment_display_uses_file_name() {
        let a = DocumentTopicAssignment {
            index: 0,
            document: DocumentId::from("/docs/report.pdf"),
            topic: 3,
            score: 0.8734,
        };
        assert_eq!(a.to_string(), "report.pdf -> Topic 3 (score: 0.87)");
    }
}
