//! HTTP server binary for edgequake-pdf2cards.
//!
//! Reads `PDF2CARDS_*` settings (a `.env` file is honoured), opens the deck
//! database and serves the JSON API.

use anyhow::{Context, Result};
use edgequake_pdf2cards::server::{router, AppState, ServerConfig};
use edgequake_pdf2cards::{DeckStore, FlashcardPipeline};
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    info!("Generation settings: {:?}", config.generation);

    if !pdfium_auto::is_pdfium_cached() {
        info!("PDF engine not found locally; downloading it once");
        if let Err(e) = tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None)) {
            warn!("PDF engine unavailable: {e}; falling back to the system library");
        }
    }

    let store = DeckStore::open(&config.db_path)
        .with_context(|| format!("Failed to open deck database {:?}", config.db_path))?;
    let pipeline = FlashcardPipeline::new(config.generation.clone())
        .context("No LLM provider available")?;

    let state = Arc::new(AppState {
        pipeline,
        store: Arc::new(store),
    });
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    info!("Listening on http://{}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}
