//! Image generation and transformation providers.
//!
//! All image work is delegated: text-to-image comes from ClipDrop, hosting and
//! transformations from Cloudinary. Handlers only see [`ImageProvider`].

use async_trait::async_trait;
use thiserror::Error;

use crate::upload::UploadedFile;

pub mod cloudinary;

pub use cloudinary::{CloudinaryCredentials, CloudinaryImageProvider};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider understood the request and refused it (bad parameter, unsupported input).
    #[error("provider rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Every method returns the public URL of the hosted result.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError>;

    async fn remove_background(&self, image: &UploadedFile) -> Result<String, ImageError>;

    /// `object` must already be sanitized with [`sanitize_object_name`].
    async fn remove_object(&self, image: &UploadedFile, object: &str)
        -> Result<String, ImageError>;
}

/// Reduces a free-text object description to a single transformation keyword:
/// the last whitespace-delimited token, lower-cased, keeping only
/// `[a-z0-9_-]`. Multi-word phrases therefore only honour their last word.
pub fn sanitize_object_name(raw: &str) -> Option<String> {
    let token = raw.split_whitespace().last()?;
    let cleaned: String = token
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}
