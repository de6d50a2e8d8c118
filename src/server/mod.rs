//! JSON HTTP API over the pipeline and the deck store.
//!
//! ```text
//! POST   /api/upload                  multipart `file` (+ `title`) → new deck
//! GET    /api/decks                   all decks with cards
//! POST   /api/decks                   empty deck
//! GET    /api/decks/{id}              one deck
//! DELETE /api/decks/{id}              deck and its cards
//! POST   /api/decks/{id}/flashcards   add a card
//! PATCH  /api/flashcards/{id}         set `mastered`
//! GET    /health
//! ```
//!
//! Upload is two-phase: generate, then persist. A storage failure after a
//! successful generation loses that generation; nothing is rolled back.

mod error;
mod handlers;
mod upload;

pub use error::{ApiError, ErrorBody};
pub use handlers::{CardUpdate, MessageResponse, UploadParams, UploadResponse};

use crate::config::GenerationConfig;
use crate::error::FlashcardError;
use crate::generate::FlashcardPipeline;
use crate::store::DeckStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state accessible from all handlers.
#[derive(Debug)]
pub struct AppState {
    pub pipeline: FlashcardPipeline,
    pub store: Arc<DeckStore>,
}

/// Server settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub max_upload_bytes: usize,
    pub generation: GenerationConfig,
}

impl ServerConfig {
    /// Read `PDF2CARDS_*` variables; unset ones take defaults.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `PDF2CARDS_ADDR` | `0.0.0.0:8000` |
    /// | `PDF2CARDS_DB` | `pdf2cards.db` |
    /// | `PDF2CARDS_MAX_UPLOAD_MB` | `50` |
    /// | `PDF2CARDS_NUM_CARDS` | `10` |
    /// | `PDF2CARDS_MAX_INPUT_CHARS` | `4000` |
    /// | `PDF2CARDS_MODEL` / `PDF2CARDS_PROVIDER` | auto |
    /// | `PDF2CARDS_TEMPERATURE` | `0.7` |
    /// | `PDF2CARDS_MAX_TOKENS` | `2000` |
    /// | `PDF2CARDS_API_TIMEOUT` | `60` |
    pub fn from_env() -> Result<Self, FlashcardError> {
        let addr = env_parse("PDF2CARDS_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));
        let db_path = std::env::var("PDF2CARDS_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pdf2cards.db"));
        let max_upload_mb: usize = env_parse("PDF2CARDS_MAX_UPLOAD_MB")?.unwrap_or(50);

        let mut builder = GenerationConfig::builder();
        if let Some(n) = env_parse("PDF2CARDS_NUM_CARDS")? {
            builder = builder.card_count(n);
        }
        if let Some(n) = env_parse("PDF2CARDS_MAX_INPUT_CHARS")? {
            builder = builder.max_input_chars(n);
        }
        if let Some(t) = env_parse("PDF2CARDS_TEMPERATURE")? {
            builder = builder.temperature(t);
        }
        if let Some(n) = env_parse("PDF2CARDS_MAX_TOKENS")? {
            builder = builder.max_tokens(n);
        }
        if let Some(secs) = env_parse("PDF2CARDS_API_TIMEOUT")? {
            builder = builder.api_timeout_secs(secs);
        }
        if let Some(model) = env_string("PDF2CARDS_MODEL") {
            builder = builder.model(model);
        }
        if let Some(provider) = env_string("PDF2CARDS_PROVIDER") {
            builder = builder.provider_name(provider);
        }

        Ok(Self {
            addr,
            db_path,
            max_upload_bytes: upload_limit_bytes(max_upload_mb)?,
            generation: builder.build()?,
        })
    }
}

fn upload_limit_bytes(megabytes: usize) -> Result<usize, FlashcardError> {
    megabytes.checked_mul(1024 * 1024).ok_or_else(|| {
        FlashcardError::InvalidConfig(format!(
            "PDF2CARDS_MAX_UPLOAD_MB={} overflows the byte limit",
            megabytes
        ))
    })
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, FlashcardError>
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            FlashcardError::InvalidConfig(format!("{}='{}': {}", key, raw, e))
        }),
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/upload", post(handlers::upload))
        .route(
            "/api/decks",
            get(handlers::list_decks).post(handlers::create_deck),
        )
        .route(
            "/api/decks/{id}",
            get(handlers::get_deck).delete(handlers::delete_deck),
        )
        .route("/api/decks/{id}/flashcards", post(handlers::add_card))
        .route("/api/flashcards/{id}", patch(handlers::update_card))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
