use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::AppState;
use crate::domain::ScoredMemory;
use crate::error::EmptyListFailure;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub user_id: String,
}

/// GET /search?q=&user_id=
pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ScoredMemory>>, EmptyListFailure> {
    state
        .search
        .search(&query.q, &query.user_id)
        .await
        .map(Json)
        .inspect_err(|e| e.log("search"))
        .map_err(EmptyListFailure)
}
