use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use quill_types::api::CreateCategoryRequest;
use quill_types::models::Category;

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let rows = state.db.list_categories()?;
    Ok(Json(
        rows.into_iter()
            .map(|row| Category {
                id: row.id,
                name: row.name,
            })
            .collect(),
    ))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("Category name is required".to_string()));
    }

    let row = state
        .db
        .create_category(&req.name)?
        .ok_or_else(|| ApiError::Conflict("Category already exists".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(Category {
            id: row.id,
            name: row.name,
        }),
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_category(id)?;
    Ok(StatusCode::NO_CONTENT)
}
