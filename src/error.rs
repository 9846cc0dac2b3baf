//! Service-level error type and its HTTP mapping.

use crate::cache::CacheError;
use crate::inference::InferenceError;
use crate::persistence::StoreError;
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum RecallError {
    /// The request itself is malformed.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The addressed memory does not exist.
    #[error("Memory not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl From<StoreError> for RecallError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl RecallError {
    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
            Self::Cache(_) => "cache",
            Self::Inference(_) => "inference",
        }
    }

    /// Whether the caller, rather than a backing service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }

    /// Log the failure once, at a level matching its category.
    pub fn log(&self, operation: &'static str) {
        if self.is_client_error() {
            tracing::info!(operation, kind = self.kind(), error = %self, "Request rejected");
        } else {
            tracing::error!(operation, kind = self.kind(), error = %self, "Request failed");
        }
    }
}

/// Soft failure: `200 {status: "failed", error, kind}`.
///
/// Clients branch on `status`, never on the HTTP code.
impl IntoResponse for RecallError {
    fn into_response(self) -> Response {
        Json(json!({
            "status": "failed",
            "error": self.to_string(),
            "kind": self.kind(),
        }))
        .into_response()
    }
}

/// Failure of a list endpoint, answered as `200 []`.
#[derive(Debug)]
pub struct EmptyListFailure(pub RecallError);

impl IntoResponse for EmptyListFailure {
    fn into_response(self) -> Response {
        Json(json!([])).into_response()
    }
}
