use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    /// PEM-encoded public key used to verify session tokens without a network call.
    pub clerk_jwt_key: String,
    /// Allowed `azp` values on session tokens. Empty means any origin is accepted.
    pub clerk_authorized_parties: Vec<String>,
    pub gemini_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub clipdrop_api_key: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
    pub free_usage_limit: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            clerk_jwt_key: require_env("CLERK_JWT_KEY")?,
            clerk_authorized_parties: parse_list(
                &std::env::var("CLERK_AUTHORIZED_PARTIES").unwrap_or_default(),
            ),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| crate::llm_client::DEFAULT_BASE_URL.to_string()),
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| crate::llm_client::DEFAULT_MODEL.to_string()),
            clipdrop_api_key: require_env("CLIPDROP_API_KEY")?,
            cloudinary_cloud_name: require_env("CLOUDINARY_CLOUD_NAME")?,
            cloudinary_api_key: require_env("CLOUDINARY_API_KEY")?,
            cloudinary_api_secret: require_env("CLOUDINARY_API_SECRET")?,
            free_usage_limit: std::env::var("FREE_USAGE_LIMIT")
                .unwrap_or_else(|_| crate::usage::FREE_USAGE_LIMIT.to_string())
                .parse::<u32>()
                .context("FREE_USAGE_LIMIT must be a non-negative integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
