use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use quill_db::models::SeriesRow;
use quill_types::api::SeriesPayload;
use quill_types::models::{Series, SeriesWithPosts};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::posts::post_response;

fn series_response(row: SeriesRow) -> Series {
    Series {
        id: row.id,
        title: row.title,
        slug: row.slug,
    }
}

fn validate(payload: &SeriesPayload) -> Result<(), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    if payload.slug.trim().is_empty() {
        return Err(ApiError::Validation("Slug is required".to_string()));
    }
    Ok(())
}

fn with_posts(state: &AppState, row: SeriesRow) -> Result<SeriesWithPosts, ApiError> {
    let posts = state
        .db
        .series_posts(row.id)?
        .into_iter()
        .map(|post| post_response(post, None))
        .collect();
    Ok(SeriesWithPosts {
        series: series_response(row),
        posts,
    })
}

pub async fn list_series(State(state): State<AppState>) -> Result<Json<Vec<Series>>, ApiError> {
    let rows = state.db.list_series()?;
    Ok(Json(rows.into_iter().map(series_response).collect()))
}

pub async fn get_series_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<SeriesWithPosts>, ApiError> {
    let row = state
        .db
        .get_series_by_slug(&slug)?
        .ok_or(ApiError::NotFound("Series"))?;
    Ok(Json(with_posts(&state, row)?))
}

pub async fn get_series_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SeriesWithPosts>, ApiError> {
    let row = state
        .db
        .get_series_by_id(id)?
        .ok_or(ApiError::NotFound("Series"))?;
    Ok(Json(with_posts(&state, row)?))
}

pub async fn create_series(
    State(state): State<AppState>,
    Json(payload): Json<SeriesPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&payload)?;
    if state.db.series_slug_taken(&payload.slug, None)? {
        return Err(ApiError::Validation(format!(
            "A series with slug '{}' already exists",
            payload.slug
        )));
    }

    let row = state.db.create_series(&payload.title, &payload.slug)?;
    Ok((StatusCode::CREATED, Json(series_response(row))))
}

pub async fn update_series(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<SeriesPayload>,
) -> Result<Json<Series>, ApiError> {
    validate(&payload)?;
    if state.db.series_slug_taken(&payload.slug, Some(id))? {
        return Err(ApiError::Validation(format!(
            "A series with slug '{}' already exists",
            payload.slug
        )));
    }

    let row = state
        .db
        .update_series(id, &payload.title, &payload.slug)?
        .ok_or(ApiError::NotFound("Series"))?;
    Ok(Json(series_response(row)))
}

/// Posts in the series survive; their series_id is nulled by the store.
pub async fn delete_series(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_series(id)?;
    Ok(StatusCode::NO_CONTENT)
}
