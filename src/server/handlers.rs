use super::error::ApiError;
use super::upload::parse_multipart;
use super::AppState;
use crate::config::MAX_CARD_COUNT;
use crate::store::{Card, Deck, DeckStore, NewCard, NewDeck, StoreError};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub title: Option<String>,
    pub num_cards: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub deck_id: i64,
    pub title: String,
    pub card_count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardUpdate {
    pub mastered: bool,
}

/// Run a store call on the blocking pool; SQLite I/O and the connection
/// mutex never hold up a runtime worker.
async fn with_store<T, F>(store: &Arc<DeckStore>, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&DeckStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    Ok(tokio::task::spawn_blocking(move || op(&*store)).await??)
}

/// `POST /api/upload`: generate a deck from a PDF and persist it.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    params: Result<Query<UploadParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Query(params) = params?;
    let card_count = match params.num_cards {
        None => state.pipeline.config().card_count,
        Some(n) if (1..=MAX_CARD_COUNT).contains(&n) => n,
        Some(n) => {
            return Err(ApiError::bad_request(
                "invalid_request",
                format!("num_cards must be 1–{}, got {}", MAX_CARD_COUNT, n),
            ))
        }
    };

    let form = parse_multipart(multipart?).await?;
    let title = form.title.or(params.title);
    info!(
        "Upload '{}' ({} bytes), {} cards requested",
        form.file.filename,
        form.file.bytes.len(),
        card_count
    );

    let output = state
        .pipeline
        .run_with_count(form.file, title.as_deref(), card_count)
        .await?;
    let deck = with_store(&state.store, move |store| store.save_generated(&output)).await?;

    Ok(Json(UploadResponse {
        deck_id: deck.id,
        title: deck.title,
        card_count: deck.card_count,
        message: format!("Successfully generated {} flashcards", deck.card_count),
    }))
}

pub async fn list_decks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Deck>>, ApiError> {
    Ok(Json(with_store(&state.store, |store| store.list_decks()).await?))
}

pub async fn get_deck(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Deck>, ApiError> {
    let Path(id) = id?;
    Ok(Json(with_store(&state.store, move |store| store.get_deck(id)).await?))
}

pub async fn create_deck(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewDeck>, JsonRejection>,
) -> Result<(StatusCode, Json<Deck>), ApiError> {
    let Json(payload) = payload?;
    let deck = with_store(&state.store, move |store| store.create_deck(&payload)).await?;
    Ok((StatusCode::CREATED, Json(deck)))
}

pub async fn delete_deck(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    with_store(&state.store, move |store| store.delete_deck(id)).await?;
    Ok(Json(MessageResponse {
        message: "Deck deleted successfully".to_string(),
    }))
}

pub async fn add_card(
    State(state): State<Arc<AppState>>,
    deck_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewCard>, JsonRejection>,
) -> Result<(StatusCode, Json<Card>), ApiError> {
    let Path(deck_id) = deck_id?;
    let Json(payload) = payload?;
    let card = with_store(&state.store, move |store| store.add_card(deck_id, &payload)).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_card(
    State(state): State<Arc<AppState>>,
    card_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CardUpdate>, JsonRejection>,
) -> Result<Json<Card>, ApiError> {
    let Path(card_id) = card_id?;
    let Json(update) = payload?;
    let card = with_store(&state.store, move |store| {
        store.set_mastered(card_id, update.mastered)
    })
    .await?;
    Ok(Json(card))
}

pub async fn health() -> &'static str {
    "ok"
}
