//! Text extraction boundary.
//!
//! Binary document decoding (PDF/DOCX byte handling) lives outside this
//! service. This module defines the contract that upstream extraction must
//! meet — ordered lines with stable indices — and a plain-text
//! implementation that rejects binary uploads instead of guessing at them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A single line of extracted text with its stable position in the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Line {
    pub index: usize,
    pub text: String,
}

/// Extracted resume text with line boundaries preserved.
///
/// Immutable once produced: indices are dense from zero, and every
/// downstream entry keeps a line range into this document as provenance.
/// Blank lines are kept (they carry their index); each line is trimmed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocumentText {
    pub lines: Vec<Line>,
}

impl RawDocumentText {
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(index, raw)| Line {
                index,
                text: raw.trim().to_string(),
            })
            .collect();
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the document carries no text at all.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text.is_empty())
    }

    /// Count of lines with content, used for layout-sanity ratios.
    pub fn non_empty_count(&self) -> usize {
        self.lines.iter().filter(|l| !l.text.is_empty()).count()
    }
}

/// Supplies `RawDocumentText` from an uploaded document.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, filename: &str, data: &Bytes) -> Result<RawDocumentText, AppError>;
}

/// Accepts UTF-8 text uploads and rejects binary containers outright.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, filename: &str, data: &Bytes) -> Result<RawDocumentText, AppError> {
        if looks_binary(data) {
            return Err(AppError::Extraction(format!(
                "'{filename}' is a binary document; extract it to plain text before uploading"
            )));
        }

        let text = std::str::from_utf8(data)
            .map_err(|_| AppError::Extraction(format!("'{filename}' is not valid UTF-8 text")))?;

        Ok(RawDocumentText::from_text(text))
    }
}

/// PDF and ZIP (DOCX) magic bytes, plus NUL bytes for anything else binary.
fn looks_binary(data: &Bytes) -> bool {
    data.starts_with(b"%PDF")
        || data.starts_with(b"PK\x03\x04")
        || data.iter().take(512).any(|b| *b == 0)
}
