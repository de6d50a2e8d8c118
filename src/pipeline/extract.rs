//! Text extraction: PDF bytes → [`ExtractedText`] via pdfium.
//!
//! Extraction sits behind the [`TextExtractor`] trait so the pipeline can be
//! exercised without a pdfium library on the machine (tests plug in a fake)
//! and so a different PDF backend can be swapped in later.
//!
//! pdfium is a C++ library with thread-local state; every call here is
//! blocking and the pipeline runs it inside `spawn_blocking`.

use crate::error::FlashcardError;
use crate::output::ExtractedText;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// PDF readers must find the header within this many leading bytes.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Pulls plain text out of a PDF byte stream, page by page.
pub trait TextExtractor: Send + Sync {
    /// Extract every page's text in document order.
    ///
    /// `filename` is only used to make error messages useful.
    fn extract(
        &self,
        pdf: &[u8],
        filename: &str,
        password: Option<&str>,
    ) -> Result<ExtractedText, FlashcardError>;
}

/// Reject byte streams that cannot be a PDF before any reader sees them.
pub fn ensure_pdf_header(pdf: &[u8], filename: &str) -> Result<(), FlashcardError> {
    let window = &pdf[..pdf.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }
    Err(FlashcardError::NotAPdf {
        filename: filename.to_string(),
        magic: pdf.iter().take(4).copied().collect(),
    })
}

/// The default extractor, backed by the pdfium C++ library.
///
/// Without an explicit path the library comes from `pdfium-auto`:
/// `PDFIUM_LIB_PATH`, the working directory, the user cache, a one-time
/// download into that cache, then the system loader.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the pdfium library at this path (file or directory); never downloads.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, FlashcardError> {
        match &self.library_path {
            Some(path) => {
                debug!("Binding pdfium from {}", path.display());
                pdfium_auto::bind_pdfium_from_path(path)
            }
            None => pdfium_auto::bind_pdfium_silent(),
        }
        .map_err(|e| FlashcardError::PdfiumBindingFailed(e.to_string()))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract(
        &self,
        pdf: &[u8],
        filename: &str,
        password: Option<&str>,
    ) -> Result<ExtractedText, FlashcardError> {
        ensure_pdf_header(pdf, filename)?;

        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                FlashcardError::PasswordRequired {
                    filename: filename.to_string(),
                }
            } else {
                FlashcardError::CorruptPdf {
                    filename: filename.to_string(),
                    detail: err_str,
                }
            }
        })?;

        let mut pages = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| FlashcardError::CorruptPdf {
                filename: filename.to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            let text = text.all();
            debug!("Page {}: {} chars", idx + 1, text.len());
            pages.push(text);
        }

        let extracted = ExtractedText::from_pages(pages);
        info!(
            "Extracted {} chars from {} pages of '{}'",
            extracted.char_count(),
            extracted.page_count,
            filename
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_at_start_is_accepted() {
        assert!(ensure_pdf_header(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n", "a.pdf").is_ok());
    }

    #[test]
    fn header_after_junk_is_accepted() {
        let mut bytes = vec![b' '; 100];
        bytes.extend_from_slice(b"%PDF-1.4\n");
        assert!(ensure_pdf_header(&bytes, "a.pdf").is_ok());
    }

    #[test]
    fn non_pdf_is_rejected_with_magic() {
        let err = ensure_pdf_header(b"PK\x03\x04zipdata", "notes.pdf").unwrap_err();
        match err {
            FlashcardError::NotAPdf { filename, magic } => {
                assert_eq!(filename, "notes.pdf");
                assert_eq!(magic, b"PK\x03\x04".to_vec());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_stream_is_rejected() {
        assert!(matches!(
            ensure_pdf_header(b"", "empty.pdf"),
            Err(FlashcardError::NotAPdf { .. })
        ));
    }

    #[test]
    fn missing_explicit_library_is_a_binding_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = PdfiumExtractor::with_library_path(dir.path().join("nope.so"));

        let err = extractor.extract(b"%PDF-1.4\n", "a.pdf", None).unwrap_err();
        assert!(matches!(err, FlashcardError::PdfiumBindingFailed(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }

    #[test]
    fn pdfium_extractor_rejects_garbage_before_binding() {
        // Never reaches pdfium, so this passes without the library installed.
        let err = PdfiumExtractor::new()
            .extract(b"definitely not a pdf", "x.pdf", None)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Extraction);
    }
}
