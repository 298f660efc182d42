//! Text extraction for uploaded documents.
//!
//! A [`Document`] pairs raw upload bytes with the text-bearing format declared by its filename.
//! Extraction consumes the document exactly once and yields a [`DocumentText`], a non-empty
//! string; a document that yields no text at all is an explicit [`ExtractError`], never an
//! empty string, so the pipeline can tell "unreadable source" apart from a degraded result.

use thiserror::Error;

/// Text-bearing formats accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format, extracted via `pdf-extract`.
    Pdf,
    /// Plain UTF-8 text; stray invalid bytes are decoded lossily.
    PlainText,
}

impl DocumentFormat {
    /// Infer the format from an uploaded filename, if it is one we accept.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lowered = filename.to_ascii_lowercase();
        if lowered.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lowered.ends_with(".txt") {
            Some(Self::PlainText)
        } else {
            None
        }
    }
}

/// An uploaded document awaiting extraction. Consumed once; no identity is retained afterward.
#[derive(Debug)]
pub struct Document {
    /// Raw upload bytes.
    pub bytes: Vec<u8>,
    /// Declared text-bearing format.
    pub format: DocumentFormat,
}

impl Document {
    /// Wrap already-textual content as a plain-text document.
    pub fn plain_text(text: String) -> Self {
        Self {
            bytes: text.into_bytes(),
            format: DocumentFormat::PlainText,
        }
    }
}

/// Full extracted textual content of a document. Invariant: non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText(String);

impl DocumentText {
    /// Borrow the extracted text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors raised while turning a document into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The PDF parser rejected the document.
    #[error("Could not read text from PDF: {0}")]
    Pdf(#[from] pdf_extract::OutputError),
    /// The document parsed but contained no textual content.
    #[error("Document contains no extractable text")]
    NoText,
}

/// Extract the full text of a document.
///
/// PDF extraction walks every page; plain text is decoded lossily so stray non-UTF-8 bytes do
/// not reject the whole upload. Whitespace-only output counts as no text.
pub fn extract_text(document: Document) -> Result<DocumentText, ExtractError> {
    let text = match document.format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(&document.bytes)?,
        DocumentFormat::PlainText => String::from_utf8_lossy(&document.bytes).into_owned(),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(DocumentText(trimmed.to_string()))
}
