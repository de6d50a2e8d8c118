use crate::error::{ErrorKind, FlashcardError};
use crate::store::StoreError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::task::JoinError;

/// JSON error body: a short machine-readable kind plus a human detail.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

/// Handler error; each variant fixes the status code.
#[derive(Debug)]
pub enum ApiError {
    BadRequest { error: &'static str, detail: String },
    /// A request the extractors or the body limit turned away, with their status.
    Rejected {
        status: StatusCode,
        error: &'static str,
        detail: String,
    },
    Pipeline(FlashcardError),
    Store(StoreError),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(error: &'static str, detail: impl Into<String>) -> Self {
        ApiError::BadRequest {
            error,
            detail: detail.into(),
        }
    }

    pub fn rejected(status: StatusCode, error: &'static str, detail: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            error,
            detail: detail.into(),
        }
    }

    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::BadRequest { error, detail } => {
                (StatusCode::BAD_REQUEST, body(error, detail.clone()))
            }
            ApiError::Rejected {
                status,
                error,
                detail,
            } => (*status, body(error, detail.clone())),
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("internal_error", detail.clone()),
            ),
            ApiError::Pipeline(e) => {
                let status = match e.kind() {
                    ErrorKind::Input => StatusCode::BAD_REQUEST,
                    ErrorKind::Extraction | ErrorKind::EmptyContent => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ErrorKind::Generation if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
                    ErrorKind::Generation => StatusCode::BAD_GATEWAY,
                    ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, body(e.kind().as_str(), e.to_string()))
            }
            ApiError::Store(e) => match e {
                StoreError::DeckNotFound(_) | StoreError::CardNotFound(_) => {
                    (StatusCode::NOT_FOUND, body("not_found", e.to_string()))
                }
                StoreError::EmptyField { .. } => {
                    (StatusCode::BAD_REQUEST, body("invalid_request", e.to_string()))
                }
                StoreError::Sqlite(_) | StoreError::Poisoned => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    body("storage_error", e.to_string()),
                ),
            },
        }
    }
}

fn body(error: &str, detail: String) -> ErrorBody {
    ErrorBody {
        error: error.to_string(),
        detail,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), body.error, body.detail);
        } else {
            tracing::debug!("{} {}: {}", status.as_u16(), body.error, body.detail);
        }
        (status, Json(body)).into_response()
    }
}

impl From<FlashcardError> for ApiError {
    fn from(err: FlashcardError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Internal(format!("Background task failed: {}", err))
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),+ $(,)?) => {$(
        impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                ApiError::rejected(rejection.status(), "invalid_request", rejection.body_text())
            }
        }
    )+};
}

from_rejection!(JsonRejection, QueryRejection, PathRejection, MultipartRejection);
