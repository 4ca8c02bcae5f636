//! Session authentication. Every `/api/*` route runs behind `require_auth`,
//! which resolves the bearer token into an [`Identity`] stored in request extensions.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub mod clerk;

pub use clerk::ClerkTokenVerifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    pub fn is_premium(self) -> bool {
        matches!(self, Plan::Premium)
    }
}

/// The authenticated caller, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub plan: Plan,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("token issued for unauthorized party {0:?}")]
    UnauthorizedParty(Option<String>),
}

/// Verifies session tokens. Carried in `AppState` as `Arc<dyn IdentityProvider>`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Middleware: rejects the request with 401 unless it carries a valid bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Owned so no borrow of the (non-Sync) request is held across the await.
    let token = bearer_token(&req).map(str::to_owned).ok_or_else(|| {
        warn!(path = %req.uri().path(), "Request without bearer token");
        AppError::Unauthorized
    })?;

    let identity = state.identity.verify(&token).await.map_err(|e| {
        warn!(error = %e, "Session verification failed");
        AppError::Unauthorized
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim_start().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}
