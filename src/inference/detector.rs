//! Object detection providers.
//!
//! Detection runs in a separate inference service (for example a YOLOv8 server)
//! reached over HTTP. The service receives the image as multipart part `file`
//! and answers with the detected boxes.

use super::{Detector, InferenceError};
use crate::config::DetectionConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// One detected object.
#[derive(Debug, Clone, Deserialize)]
pub struct Detection {
    pub label: String,
    #[serde(default = "Detection::default_confidence")]
    pub confidence: f32,
}

impl Detection {
    fn default_confidence() -> f32 {
        1.0
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetectionResponse {
    Bare(Vec<Detection>),
    Wrapped { detections: Vec<Detection> },
}

impl DetectionResponse {
    fn into_detections(self) -> Vec<Detection> {
        match self {
            Self::Bare(d) | Self::Wrapped { detections: d } => d,
        }
    }
}

/// Detector backed by a remote inference endpoint.
#[derive(Debug)]
pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
    min_confidence: f32,
}

impl HttpDetector {
    pub fn new(config: &DetectionConfig) -> Result<Self, InferenceError> {
        let url = config
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| InferenceError::Service("detection.url is not set".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            url,
            min_confidence: config.min_confidence,
        })
    }

    fn labels(&self, detections: Vec<Detection>) -> Vec<String> {
        detections
            .into_iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .map(|d| d.label.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect()
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, path: &Path) -> Result<Vec<String>, InferenceError> {
        let file_bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| InferenceError::Service(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Service(format!(
                "Detection API error ({status}): {error_text}"
            )));
        }

        let parsed: DetectionResponse = response.json().await?;
        Ok(self.labels(parsed.into_detections()))
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

/// Detector that never finds anything; tags then come from the user only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

#[async_trait]
impl Detector for NoopDetector {
    async fn detect(&self, _path: &Path) -> Result<Vec<String>, InferenceError> {
        Ok(Vec::new())
    }

    fn provider_name(&self) -> &'static str {
        "none"
    }
}
