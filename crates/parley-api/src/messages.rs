use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use parley_types::api::PostMessageRequest;
use parley_types::models::Message;

use crate::error::ApiError;
use crate::service::AppState;

/// `POST /channels/{channel_id}/messages` — the one mutation in the system.
/// 404 with the missing entity in the body if the author or channel is
/// unknown; in that case nothing is appended and nothing is published.
pub async fn post_message(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.post_message(&channel_id, &req.author_id, &req.text)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// `GET /channels/{channel_id}/messages` — full sequence in append order.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.messages(&channel_id)?))
}
