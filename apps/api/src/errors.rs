use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every variant renders the `{success, message, data}` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Free usage limit reached")]
    QuotaExceeded,

    #[error("Premium plan required")]
    PlanRequired,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider refused the request itself (bad parameter), as opposed to failing.
    #[error("Upstream rejected request: {0}")]
    UpstreamRejected(String),

    #[error("Upstream failure: {detail}")]
    Upstream { message: String, detail: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps an external provider failure with the user-facing message for the operation.
    pub fn upstream(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        AppError::Upstream {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::PlanRequired => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamRejected(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AppError::Unauthorized => (
                "UNAUTHORIZED",
                "Unauthorized: a valid session is required.".to_string(),
            ),
            AppError::QuotaExceeded => (
                "QUOTA_EXCEEDED",
                "Limit reached. Upgrade your plan to continue.".to_string(),
            ),
            AppError::PlanRequired => (
                "PLAN_REQUIRED",
                "Upgrade your plan to use this feature.".to_string(),
            ),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::UpstreamRejected(msg) => {
                tracing::warn!("Upstream rejected request: {msg}");
                ("UPSTREAM_REJECTED", msg.clone())
            }
            AppError::Upstream { message, detail } => {
                tracing::error!("Upstream error: {detail}");
                ("UPSTREAM_ERROR", message.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                ("DATABASE_ERROR", "A database error occurred".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ("INTERNAL_ERROR", "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "data": { "code": code }
        }));

        (self.status(), body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}
