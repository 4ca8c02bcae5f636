//! Resume intake: size limit and PDF text extraction.

use bytes::Bytes;
use thiserror::Error;

/// Uploads above this size are rejected before any provider call.
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF extraction failed: {0}")]
    Extract(#[from] pdf_extract::OutputError),

    #[error("PDF extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("PDF contains no extractable text")]
    NoText,
}

pub fn exceeds_size_limit(size: usize) -> bool {
    size > MAX_RESUME_BYTES
}

/// Extracts the text layer of a PDF. Parsing is CPU-bound, so it runs on the
/// blocking pool; a panic inside the parser surfaces as `PdfError::Task`.
pub async fn extract_text(pdf: Bytes) -> Result<String, PdfError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf)).await??;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(PdfError::NoText);
    }
    Ok(text)
}
