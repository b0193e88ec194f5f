use axum::Json;
use axum::extract::State;

use quill_types::models::TagCount;

use crate::auth::AppState;
use crate::error::ApiError;

/// Tag frequencies over published posts, for the tag cloud.
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagCount>>, ApiError> {
    let counts = state.db.tag_counts()?;
    Ok(Json(
        counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect(),
    ))
}
