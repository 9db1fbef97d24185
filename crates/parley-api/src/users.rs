use axum::Json;
use axum::extract::{Path, State};

use parley_types::models::User;

use crate::error::ApiError;
use crate::service::AppState;

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.users())
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user(&user_id)?))
}
