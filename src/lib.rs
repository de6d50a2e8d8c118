//! # edgequake-pdf2cards
//!
//! Turn PDF documents into question/answer flashcard decks using an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    read local file or download from URL
//!  ├─ 2. Extract  page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Prompt   first 4000 chars + "exactly N cards" format instructions
//!  ├─ 4. LLM      one call to gpt-4.1-nano / claude / gemini / … (no retry)
//!  ├─ 5. Parse    numbered "Q: … | A: …" lines, then a blank-line block fallback
//!  └─ 6. Output   ordered cards + title + stats, optionally saved to SQLite
//! ```
//!
//! The model's reply is free text. Most replies follow the requested
//! `1. Q: … | A: …` format; the parser tolerates preambles, wrapped lines,
//! mixed case and `Q:`/`A:` on separate lines, and skips entries it cannot
//! read rather than failing the whole batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2cards::{generate_cards, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = GenerationConfig::default();
//!     let deck = generate_cards("lecture_notes.pdf", None, &config).await?;
//!     println!("{} ({} cards)", deck.title, deck.cards.len());
//!     for card in &deck.cards {
//!         println!("{}. {} → {}", card.order + 1, card.question, card.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `pdf2cards` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `server` | on      | The [`server`] module and `pdf2cards-server` binary (axum + tower-http) |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-pdf2cards = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, MAX_CARD_COUNT};
pub use error::{ErrorKind, FlashcardError};
pub use generate::{
    default_title, generate_cards, generate_from_bytes, generate_sync, generate_to_file,
    write_json, FlashcardPipeline,
};
pub use output::{
    ExtractedText, FlashcardBatch, FlashcardRecord, GenerationOutput, GenerationStats, ModelReply,
};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::input::PdfUpload;
pub use pipeline::llm::{CardGenerator, ProviderGenerator};
pub use pipeline::parse::{parse_reply, ParseStrategy, ResponseParser};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{Card, Deck, DeckStore, NewCard, NewDeck, StoreError};
