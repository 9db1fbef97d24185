use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use parley_store::StoreError;

/// Request-level failure. The only business error in the system is a
/// reference to an unknown user or channel; everything else (empty queries,
/// unknown cursors, empty filter sets) yields a normal, possibly empty,
/// result instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(err) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response(),
        }
    }
}
