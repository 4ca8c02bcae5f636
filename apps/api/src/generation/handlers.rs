//! Axum route handlers for the generation API. Each one validates its payload
//! into a [`GenerationRequest`] and hands it to the shared pipeline.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::generation::{
    generate, GenerationRequest, DEFAULT_ARTICLE_LENGTH, MAX_ARTICLE_LENGTH,
};
use crate::imaging::sanitize_object_name;
use crate::response::{ApiResponse, GeneratedContent};
use crate::state::AppState;
use crate::upload::MultipartForm;

type GenerationResponse = Result<Json<ApiResponse<GeneratedContent>>, AppError>;

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    #[serde(default)]
    pub prompt: String,
    pub length: Option<u32>,
}

/// Accepts `{"prompt": "..."}` or a bare JSON string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BlogTitleRequest {
    Object { prompt: String },
    Bare(String),
}

impl BlogTitleRequest {
    fn into_prompt(self) -> String {
        match self {
            BlogTitleRequest::Object { prompt } | BlogTitleRequest::Bare(prompt) => prompt,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub publish: bool,
}

/// POST /api/ai/generate-article
pub async fn handle_generate_article(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(request): AppJson<ArticleRequest>,
) -> GenerationResponse {
    let prompt = require_prompt(request.prompt)?;
    let length = request.length.unwrap_or(DEFAULT_ARTICLE_LENGTH);
    if length == 0 || length > MAX_ARTICLE_LENGTH {
        return Err(AppError::Validation(format!(
            "length must be between 1 and {MAX_ARTICLE_LENGTH}"
        )));
    }

    run(&state, &identity, GenerationRequest::Article { prompt, length }).await
}

/// POST /api/ai/generate-blog-title
pub async fn handle_generate_blog_title(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(request): AppJson<BlogTitleRequest>,
) -> GenerationResponse {
    let prompt = require_prompt(request.into_prompt())?;
    run(&state, &identity, GenerationRequest::BlogTitle { prompt }).await
}

/// POST /api/ai/generate-image
pub async fn handle_generate_image(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(request): AppJson<ImageRequest>,
) -> GenerationResponse {
    let prompt = require_prompt(request.prompt)?;
    run(
        &state,
        &identity,
        GenerationRequest::Image {
            prompt,
            publish: request.publish,
        },
    )
    .await
}

/// POST /api/ai/remove-image-background (multipart: `image`)
pub async fn handle_remove_background(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GenerationResponse {
    let mut form = MultipartForm::read(multipart?).await?;
    let image = form
        .take_file("image")
        .ok_or_else(|| AppError::Validation("Image file is required.".to_string()))?;

    run(&state, &identity, GenerationRequest::BackgroundRemoval { image }).await
}

/// POST /api/ai/remove-image-object (multipart: `image`, `object`)
pub async fn handle_remove_object(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GenerationResponse {
    let mut form = MultipartForm::read(multipart?).await?;
    let object = form.text("object").and_then(sanitize_object_name);
    let (Some(image), Some(object)) = (form.take_file("image"), object) else {
        return Err(AppError::Validation(
            "Image and object prompt are required.".to_string(),
        ));
    };

    run(&state, &identity, GenerationRequest::ObjectRemoval { image, object }).await
}

/// POST /api/ai/resume-review (multipart: `resume`, at most 5 MiB)
pub async fn handle_review_resume(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GenerationResponse {
    let mut form = MultipartForm::read(multipart?).await?;
    let resume = form
        .take_file("resume")
        .ok_or_else(|| AppError::Validation("Resume file is required.".to_string()))?;

    run(&state, &identity, GenerationRequest::ResumeReview { resume }).await
}

async fn run(state: &AppState, identity: &Identity, request: GenerationRequest) -> GenerationResponse {
    let kind = request.kind();
    let content = generate(state, identity, request).await?;
    Ok(ApiResponse::ok(
        kind.success_message(),
        GeneratedContent { content },
    ))
}

fn require_prompt(prompt: String) -> Result<String, AppError> {
    if prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }
    Ok(prompt)
}
