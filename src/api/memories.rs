use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::api::form::FormFields;
use crate::domain::{MemoryRecord, MemoryUpdate};
use crate::error::{EmptyListFailure, RecallError};

#[derive(Debug, Deserialize)]
pub struct ListMemoriesQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub status: &'static str,
    pub data: MemoryUpdate,
}

/// GET /memories?user_id=
pub async fn list_memories_handler(
    State(state): State<AppState>,
    Query(query): Query<ListMemoriesQuery>,
) -> Result<Json<Vec<MemoryRecord>>, EmptyListFailure> {
    state
        .memories
        .list(&query.user_id)
        .await
        .map(Json)
        .inspect_err(|e| e.log("list_memories"))
        .map_err(EmptyListFailure)
}

/// DELETE /memories/{id}
pub async fn delete_memory_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, RecallError> {
    state
        .memories
        .delete(&id)
        .await
        .inspect_err(|e| e.log("delete_memory"))?;
    Ok(Json(StatusResponse { status: "deleted" }))
}

/// PUT /memories/{id} with form fields `location` and `manual_tags`.
pub async fn update_memory_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: FormFields,
) -> Result<Json<UpdateResponse>, RecallError> {
    let result = async {
        let location = form.require("location")?.to_string();
        let manual_tags = form.require("manual_tags")?;
        state.memories.update(&id, location, manual_tags).await
    }
    .await;

    let data = result.inspect_err(|e| e.log("update_memory"))?;
    Ok(Json(UpdateResponse {
        status: "updated",
        data,
    }))
}
