use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use parley_types::api::ChannelResponse;

use crate::error::ApiError;
use crate::service::AppState;

#[derive(Debug, Deserialize)]
pub struct ChannelsQuery {
    /// Restrict the listing to channels containing this member.
    pub member_id: Option<String>,
}

pub async fn list_channels(
    State(state): State<AppState>,
    Query(query): Query<ChannelsQuery>,
) -> Json<Vec<ChannelResponse>> {
    Json(state.channels(query.member_id.as_deref()))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelResponse>, ApiError> {
    Ok(Json(state.channel(&channel_id)?))
}
