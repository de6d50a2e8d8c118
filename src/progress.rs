//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to hear about
//! each stage of a run. The CLI drives its spinner from these events; a
//! server could forward them to a log or a websocket instead.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2cards::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl GenerationProgressCallback for Log {
//!     fn on_parse_complete(&self, cards: usize, strategy: Option<&str>) {
//!         eprintln!("{cards} cards ({strategy:?})");
//!     }
//! }
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as a run moves through its stages.
///
/// All methods have no-op defaults. Stages fire in order; a failing stage
/// fires `on_error` and nothing after it.
pub trait GenerationProgressCallback: Send + Sync {
    /// Text extraction is about to start on `bytes` bytes of PDF.
    fn on_extraction_start(&self, filename: &str, bytes: usize) {
        let _ = (filename, bytes);
    }

    /// Text extraction finished.
    fn on_extraction_complete(&self, pages: usize, chars: usize) {
        let _ = (pages, chars);
    }

    /// The model call is about to be sent.
    ///
    /// * `prompt_chars` — characters of document text in the prompt
    /// * `truncated`    — whether the document was cut to fit
    fn on_generation_start(&self, prompt_chars: usize, truncated: bool) {
        let _ = (prompt_chars, truncated);
    }

    /// The model replied with `reply_chars` characters.
    fn on_generation_complete(&self, reply_chars: usize) {
        let _ = reply_chars;
    }

    /// The reply was parsed into `cards` flashcards.
    fn on_parse_complete(&self, cards: usize, strategy: Option<&str>) {
        let _ = (cards, strategy);
    }

    /// The run failed; `error` is human-readable.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
