//! Text extraction from binary documents.
//!
//! Turns the raw bytes of a PDF, HTML, or plain-text document into clean
//! plain text. PDF text layers are read with `pdf-extract`, HTML visible text
//! is collected with `scraper`, and every format then runs through the
//! cleanup pipeline in [`cleanup`].
//!
//! Extraction is a pure transform: it never touches the filesystem.

mod cleanup;

use std::panic::{self, AssertUnwindSafe};

use scraper::{Html, Node};
use tracing::{debug, instrument};

use topiclens_shared::{DocumentFormat, DocumentId, Result, TopicLensError};

/// Magic header every PDF file starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Elements whose text is never part of the document body.
const SKIP_TAGS: &[&str] = &[
    "head", "script", "style", "nav", "header", "footer", "noscript", "svg", "template",
];

// ---------------------------------------------------------------------------
// Extractor trait
// ---------------------------------------------------------------------------

/// Converts one document's bytes into plain text.
///
/// Implementations must be pure and thread-safe: the corpus loader calls
/// them from a pool of blocking threads.
pub trait Extractor: Send + Sync {
    /// Extract text from `bytes`, interpreting them as `format`.
    ///
    /// `document` names the source in errors and logs only.
    fn extract(
        &self,
        document: &DocumentId,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<String>;
}

/// The built-in extractor covering PDF, HTML, and plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl Extractor for DefaultExtractor {
    #[instrument(skip_all, fields(document = %document, bytes = bytes.len(), format = ?format))]
    fn extract(
        &self,
        document: &DocumentId,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<String> {
        let raw = match format {
            DocumentFormat::Pdf => extract_pdf(document, bytes)?,
            DocumentFormat::Html => extract_html(document, bytes)?,
            DocumentFormat::PlainText => decode_utf8(document, bytes)?,
        };

        let text = cleanup::run_pipeline(&raw);

        if format == DocumentFormat::Pdf && text.is_empty() {
            return Err(TopicLensError::extraction(
                document.to_string(),
                "no extractable text layer",
            ));
        }

        debug!(
            raw_len = raw.len(),
            clean_len = text.len(),
            words = text.split_whitespace().count(),
            "extraction complete"
        );

        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Per-format extraction
// ---------------------------------------------------------------------------

/// Read the text layer of a PDF.
///
/// The third-party parser can panic on malformed input; the panic is
/// contained here and reported like any other unreadable document.
fn extract_pdf(document: &DocumentId, bytes: &[u8]) -> Result<String> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(TopicLensError::extraction(
            document.to_string(),
            "unreadable: missing %PDF- header",
        ));
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(TopicLensError::extraction(
            document.to_string(),
            format!("unreadable: {e}"),
        )),
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            Err(TopicLensError::extraction(
                document.to_string(),
                format!("unreadable: {detail}"),
            ))
        }
    }
}

/// Collect the visible text of an HTML page.
fn extract_html(document: &DocumentId, bytes: &[u8]) -> Result<String> {
    let source = decode_utf8(document, bytes)?;
    let page = Html::parse_document(&source);

    let mut out = String::with_capacity(source.len() / 2);
    for node in page.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIP_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let chunk: &str = text;
        if chunk.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(chunk.trim());
    }

    Ok(out)
}

/// Decode bytes as UTF-8, dropping a leading byte-order mark.
fn decode_utf8(document: &DocumentId, bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| {
            TopicLensError::extraction(document.to_string(), format!("invalid UTF-8: {e}"))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use topiclens_shared::ErrorKind;

    fn id(name: &str) -> DocumentId {
        DocumentId::from(name)
    }

    fn extract(bytes: &[u8], format: DocumentFormat) -> Result<String> {
        DefaultExtractor.extract(&id("doc"), bytes, format)
    }

    /// A one-page PDF whose page draws `content` with Helvetica as `/F1`.
    fn single_page_pdf(content: &str) -> Vec<u8> {
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            concat!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] ",
                "/Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            )
            .to_string(),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }

        let xref = pdf.len();
        let size = objects.len() + 1;
        pdf.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(
            format!("trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n")
                .as_bytes(),
        );
        pdf
    }

    #[test]
    fn plain_text_passes_through_cleanup() {
        let text = extract(b"Topic   models\n\n\n\nfind themes.", DocumentFormat::PlainText)
            .expect("plain text");
        assert_eq!(text, "Topic models\n\nfind themes.");
    }

    #[test]
    fn plain_text_strips_bom() {
        let text = extract(b"\xEF\xBB\xBFhello", DocumentFormat::PlainText).expect("bom");
        assert_eq!(text, "hello");
    }

    #[test]
    fn invalid_utf8_is_an_extraction_error() {
        let err = extract(&[0x66, 0x6f, 0xff, 0xfe], DocumentFormat::PlainText).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.to_string().contains("invalid UTF-8"));
    }

    #[test]
    fn empty_plain_text_is_not_an_error() {
        assert_eq!(extract(b"", DocumentFormat::PlainText).expect("empty"), "");
    }

    #[test]
    fn html_keeps_body_text_only() {
        let html = br#"<html>
            <head><title>Ignored title</title><style>p { color: red }</style></head>
            <body>
              <nav><a href="/">Home</a></nav>
              <header>Site banner</header>
              <main>
                <h1>Latent topics</h1>
                <p>Documents are <strong>mixtures</strong> of topics.</p>
                <script>var tracking = true;</script>
              </main>
              <footer>Copyright 2024</footer>
            </body></html>"#;

        let text = extract(html, DocumentFormat::Html).expect("html");
        assert!(text.contains("Latent topics"));
        assert!(text.contains("mixtures"));
        assert!(!text.contains("Home"));
        assert!(!text.contains("Site banner"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Ignored title"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn html_without_body_text_is_empty() {
        let text = extract(b"<html><body><script>x()</script></body></html>", DocumentFormat::Html)
            .expect("html");
        assert!(text.is_empty());
    }

    #[test]
    fn pdf_without_magic_is_unreadable() {
        let err = extract(b"this is not a pdf", DocumentFormat::Pdf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.to_string().contains("%PDF-"));
    }

    #[test]
    fn pdf_text_layer_is_extracted() {
        let pdf = single_page_pdf("BT /F1 24 Tf 72 700 Td (Latent topics) Tj ET");
        let text = extract(&pdf, DocumentFormat::Pdf).expect("pdf");
        assert!(text.contains("Latent"), "got {text:?}");
        assert!(text.contains("topics"), "got {text:?}");
    }

    #[test]
    fn pdf_without_text_layer_is_an_extraction_error() {
        let pdf = single_page_pdf("");
        let err = extract(&pdf, DocumentFormat::Pdf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.to_string().contains("no extractable text layer"));
    }

    #[test]
    fn truncated_pdf_is_unreadable() {
        let err = extract(b"%PDF-1.4\n%%EOF\n", DocumentFormat::Pdf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.is_recoverable());
    }

    #[test]
    fn errors_name_the_document() {
        let err = DefaultExtractor
            .extract(&id("reports/q3.pdf"), b"garbage", DocumentFormat::Pdf)
            .unwrap_err();
        assert!(err.to_string().contains("reports/q3.pdf"));
    }
}
