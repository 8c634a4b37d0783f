use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{AppState, error::ApiError};

#[utoipa::path(
    get,
    path = "/free/organization-structures",
    responses((status = 200, description = "All structure slots, ordered ascending")),
    tag = "free"
)]
pub async fn list_structures(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let structures = state.repo.list_structures().await?;

    Ok(Json(json!({
        "message": "Structure organization found successfully",
        "count": structures.len(),
        "data": structures,
    })))
}
