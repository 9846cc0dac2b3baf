//! Model adapters: object detection and the shared image/text embedding space.
//!
//! Models are constructed once at startup and handed to services as
//! `Arc<dyn Detector>` / `Arc<dyn Embedder>`.

use async_trait::async_trait;
use std::path::Path;

pub mod clip;
pub mod detector;

pub use clip::ClipEmbedder;
pub use detector::{HttpDetector, NoopDetector};

/// Errors raised by model adapters.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The model failed to load or run.
    #[error("Model error: {0}")]
    Model(String),

    /// The model produced no output for the input.
    #[error("Model returned no output")]
    Empty,

    /// A remote inference service failed.
    #[error("Inference service error: {0}")]
    Service(String),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The input file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object detection over a single image.
#[async_trait]
pub trait Detector: Send + Sync + std::fmt::Debug {
    /// Labels of the objects found in the image at `path`.
    async fn detect(&self, path: &Path) -> Result<Vec<String>, InferenceError>;

    fn provider_name(&self) -> &'static str;
}

/// Encoder mapping images and text into one vector space.
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Embed encoded image bytes (JPEG, PNG, ...).
    async fn embed_image(&self, image: Vec<u8>) -> Result<Vec<f32>, InferenceError>;

    /// Embed a text query.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, InferenceError>;
}
