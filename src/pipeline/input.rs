//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! Extraction works from an in-memory byte slice, so URL inputs are
//! downloaded straight into memory and local files are read whole. The PDF
//! header is not checked here; [`crate::pipeline::extract::ensure_pdf_header`]
//! does that for every source, uploads included.

use crate::error::FlashcardError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A PDF ready for the pipeline: its bytes plus the name it arrived under.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    /// Original file name (used for the deck title and error messages).
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input string as a PDF upload.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<PdfUpload, FlashcardError> {
    if input.trim().is_empty() {
        return Err(FlashcardError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local file, mapping I/O failures onto input errors.
async fn read_local(path: &Path) -> Result<PdfUpload, FlashcardError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => FlashcardError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => FlashcardError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(PdfUpload { filename, bytes })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfUpload, FlashcardError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FlashcardError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FlashcardError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FlashcardError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(FlashcardError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FlashcardError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(PdfUpload {
        filename: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last non-empty path segment of the URL if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// File name component of a path string, for uploads that carry a full path.
pub fn base_name(name: &str) -> String {
    PathBuf::from(name.replace('\\', "/"))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_path() {
        assert_eq!(
            filename_from_url("https://example.com/papers/cell_biology.pdf?x=1"),
            "cell_biology.pdf"
        );
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://example.com/download"), "downloaded.pdf");
    }

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(base_name("/home/me/notes.pdf"), "notes.pdf");
        assert_eq!(base_name("C:\\Users\\me\\notes.pdf"), "notes.pdf");
        assert_eq!(base_name("notes.pdf"), "notes.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = load_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, FlashcardError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = load_input("   ", 5).await.unwrap_err();
        assert!(matches!(err, FlashcardError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_file_is_read_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture_01.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();

        let upload = load_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(upload.filename, "lecture_01.pdf");
        assert_eq!(upload.bytes, b"%PDF-1.4 fake");
    }
}
