//! Content generation: one pipeline for every feature.
//!
//! Flow: usage gate admit (reserves quota) → provider call → persist one
//!       Creation Record → usage gate commit → return content.
//! A failed provider call persists nothing and its reservation is released.
//! All text calls go through llm_client; all image calls through imaging.

use tracing::info;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::imaging::ImageError;
use crate::models::creation::{CreationRow, CreationType, NewCreation};
use crate::state::AppState;
use crate::upload::UploadedFile;
use crate::usage::Access;

pub mod handlers;
pub mod prompts;
pub mod resume;

/// Token budget used when an article request omits `length`.
pub const DEFAULT_ARTICLE_LENGTH: u32 = 800;
pub const MAX_ARTICLE_LENGTH: u32 = 4096;
const BLOG_TITLE_MAX_TOKENS: u32 = 100;
const RESUME_REVIEW_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Article,
    BlogTitle,
    Image,
    BackgroundRemoval,
    ObjectRemoval,
    ResumeReview,
}

impl GenerationKind {
    pub fn access(self) -> Access {
        match self {
            GenerationKind::Article | GenerationKind::BlogTitle => Access::Metered,
            GenerationKind::Image
            | GenerationKind::BackgroundRemoval
            | GenerationKind::ObjectRemoval
            | GenerationKind::ResumeReview => Access::PremiumOnly,
        }
    }

    pub fn creation_type(self) -> CreationType {
        match self {
            GenerationKind::Article => CreationType::Article,
            GenerationKind::BlogTitle => CreationType::BlogTitle,
            GenerationKind::Image
            | GenerationKind::BackgroundRemoval
            | GenerationKind::ObjectRemoval => CreationType::Image,
            GenerationKind::ResumeReview => CreationType::ResumeReview,
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            GenerationKind::Article => "Article created successfully",
            GenerationKind::BlogTitle => "Blog Title created successfully",
            GenerationKind::Image => "Image generated successfully",
            GenerationKind::BackgroundRemoval => "Background removed successfully",
            GenerationKind::ObjectRemoval => "Object removed successfully",
            GenerationKind::ResumeReview => "Resume reviewed successfully",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            GenerationKind::Article => "Failed to create article",
            GenerationKind::BlogTitle => "Failed to create blog title",
            GenerationKind::Image => "Failed to generate image",
            GenerationKind::BackgroundRemoval => "Failed to remove image background",
            GenerationKind::ObjectRemoval => "Failed to remove object from image",
            GenerationKind::ResumeReview => "Failed to review resume",
        }
    }

    fn rejection_hint(self) -> &'static str {
        match self {
            GenerationKind::ObjectRemoval => {
                "The image provider could not process the transformation. Check if the object \
                 name is valid and if your plan supports this feature."
            }
            _ => "The image provider could not process this request.",
        }
    }
}

/// A validated generation request. Constructed by the HTTP handlers.
#[derive(Debug)]
pub enum GenerationRequest {
    Article { prompt: String, length: u32 },
    BlogTitle { prompt: String },
    Image { prompt: String, publish: bool },
    BackgroundRemoval { image: UploadedFile },
    /// `object` is already reduced by `imaging::sanitize_object_name`.
    ObjectRemoval { image: UploadedFile, object: String },
    ResumeReview { resume: UploadedFile },
}

impl GenerationRequest {
    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationRequest::Article { .. } => GenerationKind::Article,
            GenerationRequest::BlogTitle { .. } => GenerationKind::BlogTitle,
            GenerationRequest::Image { .. } => GenerationKind::Image,
            GenerationRequest::BackgroundRemoval { .. } => GenerationKind::BackgroundRemoval,
            GenerationRequest::ObjectRemoval { .. } => GenerationKind::ObjectRemoval,
            GenerationRequest::ResumeReview { .. } => GenerationKind::ResumeReview,
        }
    }
}

/// What the provider produced, plus how it is recorded.
struct Generated {
    prompt: String,
    content: String,
    publish: bool,
}

/// Runs one generation request end to end and returns the produced content.
pub async fn generate(
    state: &AppState,
    identity: &Identity,
    request: GenerationRequest,
) -> Result<String, AppError> {
    let kind = request.kind();
    let permit = state.usage.admit(identity, kind.access()).await?;

    let creation = match produce_and_record(state, identity, kind, request).await {
        Ok(creation) => creation,
        Err(e) => {
            state.usage.release(permit).await;
            return Err(e);
        }
    };

    info!(
        creation_id = %creation.id,
        user_id = %identity.user_id,
        ?kind,
        metered = permit.is_metered(),
        "Generation completed"
    );
    state.usage.commit(permit);

    Ok(creation.content)
}

async fn produce_and_record(
    state: &AppState,
    identity: &Identity,
    kind: GenerationKind,
    request: GenerationRequest,
) -> Result<CreationRow, AppError> {
    let generated = produce(state, kind, request).await?;

    let creation = state
        .creations
        .insert(NewCreation {
            user_id: identity.user_id.clone(),
            prompt: generated.prompt,
            content: generated.content,
            creation_type: kind.creation_type(),
            publish: generated.publish,
        })
        .await?;
    Ok(creation)
}

async fn produce(
    state: &AppState,
    kind: GenerationKind,
    request: GenerationRequest,
) -> Result<Generated, AppError> {
    match request {
        GenerationRequest::Article { prompt, length } => {
            let content = complete(state, kind, &prompt, length).await?;
            Ok(Generated {
                prompt,
                content,
                publish: false,
            })
        }
        GenerationRequest::BlogTitle { prompt } => {
            let content = complete(state, kind, &prompt, BLOG_TITLE_MAX_TOKENS).await?;
            Ok(Generated {
                prompt,
                content,
                publish: false,
            })
        }
        GenerationRequest::Image { prompt, publish } => {
            let url = state
                .images
                .generate(&prompt)
                .await
                .map_err(|e| image_failure(kind, e))?;
            Ok(Generated {
                prompt,
                content: url,
                publish,
            })
        }
        GenerationRequest::BackgroundRemoval { image } => {
            let url = state
                .images
                .remove_background(&image)
                .await
                .map_err(|e| image_failure(kind, e))?;
            Ok(Generated {
                prompt: "Removed background from image".to_string(),
                content: url,
                publish: false,
            })
        }
        GenerationRequest::ObjectRemoval { image, object } => {
            let url = state
                .images
                .remove_object(&image, &object)
                .await
                .map_err(|e| image_failure(kind, e))?;
            Ok(Generated {
                prompt: format!("Remove {object} from image"),
                content: url,
                publish: false,
            })
        }
        GenerationRequest::ResumeReview { resume } => {
            if resume::exceeds_size_limit(resume.size()) {
                return Err(AppError::Validation(
                    "Resume size exceeds 5MB limit.".to_string(),
                ));
            }

            let text = resume::extract_text(resume.bytes).await.map_err(|e| {
                AppError::upstream("Could not read text from the uploaded resume.", e)
            })?;

            let prompt = prompts::resume_review_prompt(&text);
            let content = complete(state, kind, &prompt, RESUME_REVIEW_MAX_TOKENS).await?;
            Ok(Generated {
                prompt: "Review the uploaded resume".to_string(),
                content,
                publish: false,
            })
        }
    }
}

async fn complete(
    state: &AppState,
    kind: GenerationKind,
    prompt: &str,
    max_tokens: u32,
) -> Result<String, AppError> {
    state
        .text
        .complete(prompt, max_tokens)
        .await
        .map_err(|e| AppError::upstream(kind.failure_message(), e))
}

fn image_failure(kind: GenerationKind, err: ImageError) -> AppError {
    match err {
        ImageError::Rejected { status, message } => {
            tracing::warn!(?kind, status, "Image provider rejected request: {message}");
            AppError::UpstreamRejected(kind.rejection_hint().to_string())
        }
        other => AppError::upstream(kind.failure_message(), other),
    }
}
