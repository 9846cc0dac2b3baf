//! HTTP handlers and routes.

pub mod form;
pub mod memories;
pub mod rate_limit;
pub mod reindex;
pub mod scan;
pub mod search;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/scan", post(scan::scan_handler))
        .route("/memories", get(memories::list_memories_handler))
        .route(
            "/memories/{id}",
            delete(memories::delete_memory_handler).put(memories::update_memory_handler),
        )
        .route("/search", get(search::search_handler))
        .route("/reindex", post(reindex::reindex_handler))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
