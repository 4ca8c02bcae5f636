use axum::Json;
use serde::Serialize;

/// Success envelope shared by every endpoint. Errors render the same shape
/// through `AppError::into_response`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

/// `data` payload for every generation endpoint.
#[derive(Debug, Serialize)]
pub struct GeneratedContent {
    pub content: String,
}

/// Empty object payload, serialized as `{}`.
#[derive(Debug, Serialize)]
pub struct Empty {}
