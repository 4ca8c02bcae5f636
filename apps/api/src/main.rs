mod auth;
mod config;
mod creations;
mod db;
mod errors;
mod extract;
mod generation;
mod imaging;
mod llm_client;
mod models;
mod response;
mod routes;
mod state;
mod upload;
mod usage;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::ClerkTokenVerifier;
use crate::config::Config;
use crate::creations::PgCreationStore;
use crate::db::create_pool;
use crate::imaging::{CloudinaryCredentials, CloudinaryImageProvider};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::usage::{RedisEntitlementStore, UsageGate};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Creator API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis (entitlement counters)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let entitlements = RedisEntitlementStore::connect(&redis).await?;
    info!(
        "Entitlement store connected (free usage limit: {})",
        config.free_usage_limit
    );

    // Session verification
    let identity = ClerkTokenVerifier::new(
        &config.clerk_jwt_key,
        config.clerk_authorized_parties.clone(),
    )?;

    // One HTTP client shared by every upstream provider
    let http = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()?;

    let llm = LlmClient::new(
        http.clone(),
        config.gemini_api_key.clone(),
        &config.llm_base_url,
        config.llm_model.clone(),
    );
    info!("LLM client initialized (model: {})", llm.model());

    let images = CloudinaryImageProvider::new(
        http,
        CloudinaryCredentials {
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
        },
        config.clipdrop_api_key.clone(),
    );
    info!("Image provider initialized (cloud: {})", config.cloudinary_cloud_name);

    // Build app state
    let state = AppState {
        identity: Arc::new(identity),
        usage: UsageGate::new(Arc::new(entitlements), config.free_usage_limit),
        creations: Arc::new(PgCreationStore::new(db)),
        text: Arc::new(llm),
        images: Arc::new(images),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
