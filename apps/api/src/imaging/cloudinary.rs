use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use super::{ImageError, ImageProvider};
use crate::upload::UploadedFile;

const CLIPDROP_TEXT_TO_IMAGE_URL: &str = "https://clipdrop-api.co/text-to-image/v1";
const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const CLOUDINARY_DELIVERY_BASE: &str = "https://res.cloudinary.com";
const BACKGROUND_REMOVAL: &str = "e_background_removal";

#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    format: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    error: CloudinaryErrorBody,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ClipdropError {
    error: String,
}

/// ClipDrop for text-to-image, Cloudinary for hosting and transformations.
#[derive(Clone)]
pub struct CloudinaryImageProvider {
    client: Client,
    credentials: CloudinaryCredentials,
    clipdrop_api_key: String,
}

impl CloudinaryImageProvider {
    pub fn new(client: Client, credentials: CloudinaryCredentials, clipdrop_api_key: String) -> Self {
        Self {
            client,
            credentials,
            clipdrop_api_key,
        }
    }

    /// Signed upload. `transformation`, when given, is applied on ingest so
    /// `secure_url` already points at the transformed asset.
    async fn upload(
        &self,
        file: Part,
        transformation: Option<&str>,
    ) -> Result<UploadResponse, ImageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut signed: Vec<(&str, String)> = vec![("timestamp", timestamp.clone())];
        if let Some(t) = transformation {
            signed.push(("transformation", t.to_string()));
        }
        let signature = sign_params(&signed, &self.credentials.api_secret);

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);
        if let Some(t) = transformation {
            form = form.text("transformation", t.to_string());
        }

        let url = format!(
            "{CLOUDINARY_API_BASE}/{}/image/upload",
            self.credentials.cloud_name
        );
        let response = self.client.post(url).multipart(form).send().await?;
        let response = check_status(response, cloudinary_error_message).await?;

        let uploaded: UploadResponse = response.json().await?;
        debug!("Uploaded image {} to Cloudinary", uploaded.public_id);
        Ok(uploaded)
    }

    fn delivery_url(&self, transformation: &str, public_id: &str, format: &str) -> String {
        format!(
            "{CLOUDINARY_DELIVERY_BASE}/{}/image/upload/{transformation}/{public_id}.{format}",
            self.credentials.cloud_name
        )
    }
}

#[async_trait]
impl ImageProvider for CloudinaryImageProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let form = Form::new().text("prompt", prompt.to_string());
        let response = self
            .client
            .post(CLIPDROP_TEXT_TO_IMAGE_URL)
            .header("x-api-key", &self.clipdrop_api_key)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, clipdrop_error_message).await?;

        let png = response.bytes().await?;
        info!("ClipDrop generated {} bytes", png.len());

        let file = Part::bytes(png.to_vec())
            .file_name("generated.png")
            .mime_str("image/png")?;
        let uploaded = self.upload(file, None).await?;
        Ok(uploaded.secure_url)
    }

    async fn remove_background(&self, image: &UploadedFile) -> Result<String, ImageError> {
        let uploaded = self
            .upload(file_part(image)?, Some(BACKGROUND_REMOVAL))
            .await?;
        Ok(uploaded.secure_url)
    }

    async fn remove_object(
        &self,
        image: &UploadedFile,
        object: &str,
    ) -> Result<String, ImageError> {
        let uploaded = self.upload(file_part(image)?, None).await?;
        Ok(self.delivery_url(
            &gen_remove_transformation(object),
            &uploaded.public_id,
            &uploaded.format,
        ))
    }
}

fn file_part(image: &UploadedFile) -> Result<Part, ImageError> {
    let name = image
        .file_name
        .clone()
        .unwrap_or_else(|| "upload".to_string());
    let part = Part::bytes(image.bytes.to_vec()).file_name(name);
    match &image.content_type {
        Some(mime) => Ok(part.mime_str(mime)?),
        None => Ok(part),
    }
}

fn gen_remove_transformation(object: &str) -> String {
    format!("e_gen_remove:prompt_{object}")
}

/// Cloudinary API signature: parameters sorted by name, joined as
/// `k=v&k=v`, the API secret appended, SHA-1 hex digest.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Maps non-success responses: 400/422 are rejections of the input, the rest provider failures.
async fn check_status(
    response: Response,
    extract_message: fn(String) -> String,
) -> Result<Response, ImageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(body);
    let status = status.as_u16();
    if status == 400 || status == 422 {
        Err(ImageError::Rejected { status, message })
    } else {
        Err(ImageError::Api { status, message })
    }
}

fn cloudinary_error_message(body: String) -> String {
    serde_json::from_str::<CloudinaryError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

fn clipdrop_error_message(body: String) -> String {
    serde_json::from_str::<ClipdropError>(&body)
        .map(|e| e.error)
        .unwrap_or(body)
}
