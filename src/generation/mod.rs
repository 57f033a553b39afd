//! Generative image model
//!
//! Thin wrapper over a hosted multimodal model: a text prompt plus optional
//! reference images in, one image out as a base64 data URL.

pub mod gemini;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to image model failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image model returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("no image data in response")]
    NoImage,
}

/// Reference image sent along with the prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    /// Data URL or raw base64
    pub data: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "image/png".to_string()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub images: Vec<InlineImage>,
}

/// Anything that can turn a prompt into an image data URL
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String, GenerationError>>;
}
