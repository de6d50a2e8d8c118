//! Error types for the edgequake-pdf2cards library.
//!
//! Every failure of a pipeline run is terminal for that run: nothing is
//! retried automatically. The variants of [`FlashcardError`] are grouped into
//! a small set of [`ErrorKind`]s so transport layers (the HTTP API, the CLI)
//! can react per kind without matching on every variant:
//!
//! * [`ErrorKind::Extraction`] — the bytes are not a readable PDF.
//! * [`ErrorKind::EmptyContent`] — the PDF parsed but carries no text.
//! * [`ErrorKind::Generation`] — the model call failed, timed out, or its
//!   reply contained no parseable flashcards.
//!
//! Storage failures live in [`crate::store::StoreError`]; the pipeline never
//! touches storage.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`FlashcardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The caller handed us something we cannot even start on.
    Input,
    /// The PDF reader rejected the byte stream.
    Extraction,
    /// The PDF was readable but had no extractable text.
    EmptyContent,
    /// The model call failed or produced nothing usable.
    Generation,
    /// Invalid configuration or unconfigured provider.
    Config,
    /// Unexpected internal error.
    Internal,
}

impl ErrorKind {
    /// Short, stable identifier used in API error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Input => "invalid_input",
            ErrorKind::Extraction => "extraction_error",
            ErrorKind::EmptyContent => "empty_content",
            ErrorKind::Generation => "generation_error",
            ErrorKind::Config => "config_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

/// All fatal errors returned by the flashcard pipeline.
#[derive(Debug, Error)]
pub enum FlashcardError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The byte stream does not start with a PDF header.
    #[error("'{filename}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { filename: String, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("Error extracting text from PDF '{filename}': {detail}")]
    CorruptPdf { filename: String, detail: String },

    /// PDF requires a password but none (or the wrong one) was provided.
    #[error("PDF '{filename}' is encrypted and the password is missing or wrong.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { filename: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The library is downloaded to the user cache on first use. Offline, set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium or place it in the working directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Content errors ────────────────────────────────────────────────────
    /// Every page of the PDF was blank (or image-only).
    #[error("No text could be extracted from '{filename}' ({pages} pages)")]
    EmptyContent { filename: String, pages: usize },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("Error generating flashcards: {message}")]
    LlmApiError { message: String },

    /// The LLM API rejected our credentials (401/403).
    #[error("Authentication error from the LLM provider: {detail}")]
    AuthError { detail: String },

    /// The model call did not complete within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The model replied, but not with a single parseable flashcard.
    #[error("No flashcards could be generated from the content (model reply: {reply_chars} chars)")]
    NoCardsParsed { reply_chars: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlashcardError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use FlashcardError::*;
        match self {
            FileNotFound { .. }
            | PermissionDenied { .. }
            | InvalidInput { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. } => ErrorKind::Input,
            NotAPdf { .. } | CorruptPdf { .. } | PasswordRequired { .. } => ErrorKind::Extraction,
            EmptyContent { .. } => ErrorKind::EmptyContent,
            LlmApiError { .. } | AuthError { .. } | ApiTimeout { .. } | NoCardsParsed { .. } => {
                ErrorKind::Generation
            }
            ProviderNotConfigured { .. } | InvalidConfig(_) => ErrorKind::Config,
            PdfiumBindingFailed(_) | OutputWriteFailed { .. } | Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for the timeout flavour of a generation failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FlashcardError::ApiTimeout { .. })
    }
}
