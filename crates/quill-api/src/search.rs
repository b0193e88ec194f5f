use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use quill_types::models::Post;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::posts::post_response;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or("");
    if q.is_empty() {
        return Err(ApiError::Validation("Search query is required".to_string()));
    }

    let rows = state.db.search_published(q)?;
    Ok(Json(
        rows.into_iter().map(|row| post_response(row, None)).collect(),
    ))
}
