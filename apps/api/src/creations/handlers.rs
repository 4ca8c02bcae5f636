use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::creation::CreationRow;
use crate::response::{ApiResponse, Empty};
use crate::state::AppState;

/// `id` is kept loose so a malformed id resolves to "not found" rather than a
/// body rejection.
#[derive(Debug, Deserialize)]
pub struct ToggleLikeRequest {
    pub id: Option<Value>,
}

fn creation_id(raw: Option<Value>) -> Result<Uuid, AppError> {
    let raw = match raw {
        None => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    };
    let value =
        raw.ok_or_else(|| AppError::Validation("Creation ID is required.".to_string()))?;

    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| AppError::NotFound("Creation not found.".to_string()))
}

/// GET /api/user/get-user-creations
pub async fn handle_get_user_creations(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<Vec<CreationRow>>>, AppError> {
    let creations = state.creations.list_by_user(&identity.user_id).await?;
    Ok(ApiResponse::ok("Creations fetched successfully", creations))
}

/// GET /api/user/get-published-creations
pub async fn handle_get_published_creations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CreationRow>>>, AppError> {
    let creations = state.creations.list_published().await?;
    Ok(ApiResponse::ok(
        "Published creations fetched successfully",
        creations,
    ))
}

/// POST /api/user/toggle-like-creations
pub async fn handle_toggle_like(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(request): AppJson<ToggleLikeRequest>,
) -> Result<Json<ApiResponse<Empty>>, AppError> {
    let id = creation_id(request.id)?;

    let outcome = state
        .creations
        .toggle_like(id, &identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Creation not found.".to_string()))?;

    info!(creation_id = %id, user_id = %identity.user_id, ?outcome, "Toggled like");
    Ok(ApiResponse::ok(outcome.message(), Empty {}))
}
