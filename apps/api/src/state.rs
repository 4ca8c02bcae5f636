use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::creations::CreationStore;
use crate::imaging::ImageProvider;
use crate::llm_client::TextGenerator;
use crate::usage::UsageGate;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every external collaborator sits behind a trait object so tests can swap it.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub usage: UsageGate,
    pub creations: Arc<dyn CreationStore>,
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageProvider>,
}
