use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;
use crate::error::RecallError;

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub status: &'static str,
    pub updated: usize,
    pub scanned: usize,
    pub failed: usize,
}

/// POST /reindex - embed stored photos missing from the cache.
pub async fn reindex_handler(
    State(state): State<AppState>,
) -> Result<Json<ReindexResponse>, RecallError> {
    let report = state
        .ingest
        .reindex()
        .await
        .inspect_err(|e| e.log("reindex"))?;

    Ok(Json(ReindexResponse {
        status: "success",
        updated: report.updated,
        scanned: report.scanned,
        failed: report.failed,
    }))
}
