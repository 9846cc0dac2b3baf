//! Photo upload handler.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;

use crate::AppState;
use crate::error::RecallError;
use crate::ingest::ScanRequest;

/// Body of `POST /scan`.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// `saved` or `failed`.
    pub status: &'static str,
    pub tags: Vec<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl ScanResponse {
    fn failed(err: &RecallError) -> Self {
        Self {
            status: "failed",
            tags: Vec::new(),
            url: String::new(),
            id: None,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
        }
    }
}

#[derive(Debug, Default)]
struct ScanForm {
    file: Option<(String, String, Vec<u8>)>,
    user_id: Option<String>,
    location: Option<String>,
    manual_tags: Option<String>,
}

impl ScanForm {
    async fn read(mut multipart: Multipart) -> Result<Self, RecallError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RecallError::Validation(format!("Failed to read multipart field: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field.content_type().map_or_else(
                        || {
                            mime_guess::from_path(&file_name)
                                .first_or_octet_stream()
                                .to_string()
                        },
                        str::to_string,
                    );
                    let data = field.bytes().await.map_err(|e| {
                        RecallError::Validation(format!("Failed to read file '{file_name}': {e}"))
                    })?;
                    form.file = Some((file_name, content_type, data.to_vec()));
                }
                "user_id" | "location" | "manual_tags" => {
                    let value = field.text().await.map_err(|e| {
                        RecallError::Validation(format!("Failed to read field '{name}': {e}"))
                    })?;
                    match name.as_str() {
                        "user_id" => form.user_id = Some(value),
                        "location" => form.location = Some(value),
                        _ => form.manual_tags = Some(value),
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn into_request(self) -> Result<ScanRequest, RecallError> {
        let missing = |field: &str| RecallError::Validation(format!("missing form field: {field}"));

        let (file_name, content_type, data) = self.file.ok_or_else(|| missing("file"))?;
        Ok(ScanRequest {
            file_name,
            content_type,
            data,
            user_id: self.user_id.ok_or_else(|| missing("user_id"))?,
            location: self.location.ok_or_else(|| missing("location"))?,
            manual_tags: self.manual_tags.ok_or_else(|| missing("manual_tags"))?,
        })
    }
}

/// POST /scan - store a photo, tag it and cache its embedding.
///
/// Always answers 200; failures are reported as `status: "failed"` with empty
/// tags and URL.
pub async fn scan_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Json<ScanResponse> {
    let result = match ScanForm::read(multipart).await.and_then(ScanForm::into_request) {
        Ok(request) => state.ingest.scan(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(record) => Json(ScanResponse {
            status: "saved",
            tags: record.tags,
            url: record.image_url,
            id: Some(record.id),
            error: None,
            kind: None,
        }),
        Err(e) => {
            e.log("scan");
            Json(ScanResponse::failed(&e))
        }
    }
}
