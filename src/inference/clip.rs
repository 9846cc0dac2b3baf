use super::{Embedder, InferenceError};
use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, TextEmbedding,
    TextInitOptions,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

/// CLIP image and text encoders sharing one embedding space.
///
/// Inference is synchronous and CPU bound, so every call runs on the blocking
/// pool with the model behind a mutex.
#[derive(Clone)]
pub struct ClipEmbedder {
    image_model: Arc<Mutex<ImageEmbedding>>,
    text_model: Arc<Mutex<TextEmbedding>>,
    model_key: String,
}

impl std::fmt::Debug for ClipEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipEmbedder")
            .field("model", &self.model_key)
            .finish_non_exhaustive()
    }
}

fn models_for_key(key: &str) -> Result<(ImageEmbeddingModel, EmbeddingModel), InferenceError> {
    match key {
        "clip-vit-b32" | "clip-ViT-B-32" => {
            Ok((ImageEmbeddingModel::ClipVitB32, EmbeddingModel::ClipVitB32))
        }
        other => Err(InferenceError::Model(format!(
            "unsupported embedding model: {other}"
        ))),
    }
}

impl ClipEmbedder {
    /// Load both encoders, downloading weights on first use.
    pub fn load(config: &EmbeddingConfig) -> Result<Self, InferenceError> {
        let (image_kind, text_kind) = models_for_key(&config.model)?;
        info!(model = %config.model, "Initializing fastembed CLIP encoders...");

        let mut image_options =
            ImageInitOptions::new(image_kind).with_show_download_progress(config.show_download_progress);
        let mut text_options =
            TextInitOptions::new(text_kind).with_show_download_progress(config.show_download_progress);
        if let Some(dir) = &config.cache_dir {
            image_options = image_options.with_cache_dir(PathBuf::from(dir));
            text_options = text_options.with_cache_dir(PathBuf::from(dir));
        }

        let image_model =
            ImageEmbedding::try_new(image_options).map_err(|e| InferenceError::Model(e.to_string()))?;
        let text_model =
            TextEmbedding::try_new(text_options).map_err(|e| InferenceError::Model(e.to_string()))?;

        Ok(Self {
            image_model: Arc::new(Mutex::new(image_model)),
            text_model: Arc::new(Mutex::new(text_model)),
            model_key: config.model.clone(),
        })
    }
}

fn first_embedding(mut out: Vec<Vec<f32>>) -> Result<Vec<f32>, InferenceError> {
    if out.is_empty() {
        return Err(InferenceError::Empty);
    }
    Ok(out.swap_remove(0))
}

#[async_trait]
impl Embedder for ClipEmbedder {
    async fn embed_image(&self, image: Vec<u8>) -> Result<Vec<f32>, InferenceError> {
        let model = Arc::clone(&self.image_model);
        let out = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|e| InferenceError::Model(format!("image model poisoned: {e}")))?;
            guard
                .embed_bytes(&[image.as_slice()], None)
                .map_err(|e| InferenceError::Model(e.to_string()))
        })
        .await
        .map_err(|e| InferenceError::Model(e.to_string()))??;

        first_embedding(out)
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        let model = Arc::clone(&self.text_model);
        let text = text.to_string();
        let out = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|e| InferenceError::Model(format!("text model poisoned: {e}")))?;
            guard
                .embed(vec![text], None)
                .map_err(|e| InferenceError::Model(e.to_string()))
        })
        .await
        .map_err(|e| InferenceError::Model(e.to_string()))??;

        first_embedding(out)
    }
}
