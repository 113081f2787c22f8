//! Plain-text and PDF extraction for uploaded files.

use async_trait::async_trait;
use ragdesk_core::{ExtractError, TextExtractor};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
}

impl FileKind {
    /// Detect the kind from the file extension, ignoring case.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension().and_then(|e| e.to_str())?;
        if ext.eq_ignore_ascii_case("txt") {
            Some(Self::Text)
        } else if ext.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

/// [`TextExtractor`] for `.txt` (UTF-8) and `.pdf` uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract_text(&self, content: &[u8], filename: &str) -> Result<String, ExtractError> {
        let kind = FileKind::from_filename(filename).ok_or_else(|| ExtractError::UnsupportedFormat(filename.to_string()))?;
        debug!(filename, ?kind, bytes = content.len(), "extracting_text");
        match kind {
            FileKind::Text => String::from_utf8(content.to_vec())
                .map_err(|e| ExtractError::Decode { filename: filename.to_string(), reason: e.to_string() }),
            FileKind::Pdf => {
                let bytes = content.to_vec();
                // pdf-extract may panic on malformed input; the join error covers that.
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string()))
                    .await
                    .map_err(|e| ExtractError::Parse { filename: filename.to_string(), reason: format!("PDF parser aborted: {e}") })?
                    .map_err(|reason| ExtractError::Parse { filename: filename.to_string(), reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kind_case_insensitively() {
        assert_eq!(FileKind::from_filename("notes.TXT"), Some(FileKind::Text));
        assert_eq!(FileKind::from_filename("report.Pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_filename("slides.pptx"), None);
        assert_eq!(FileKind::from_filename("README"), None);
    }
}
