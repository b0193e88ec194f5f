use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use quill_db::models::{PostFields, PostRow};
use quill_types::api::PostPayload;
use quill_types::models::Post;
use quill_types::tags;

use crate::auth::AppState;
use crate::error::ApiError;

pub(crate) fn post_response(row: PostRow, series: Option<(String, String)>) -> Post {
    let (series_title, series_slug) = match series {
        Some((title, slug)) => (Some(title), Some(slug)),
        None => (None, None),
    };
    Post {
        id: row.id,
        title: row.title,
        slug: row.slug,
        content: row.content,
        excerpt: row.excerpt,
        author: row.author,
        category: row.category,
        tags: row.tags,
        read_time: row.read_time,
        published: row.published,
        created_at: row.created_at,
        updated_at: row.updated_at,
        series_id: row.series_id,
        order_in_series: row.order_in_series,
        series_title,
        series_slug,
    }
}

fn validated_fields(payload: PostPayload) -> Result<PostFields, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    if payload.slug.trim().is_empty() {
        return Err(ApiError::Validation("Slug is required".to_string()));
    }
    Ok(PostFields {
        title: payload.title,
        slug: payload.slug,
        content: payload.content,
        excerpt: payload.excerpt,
        author: payload.author,
        category: payload.category,
        tags: tags::normalize(&payload.tags),
        read_time: payload.read_time,
        published: payload.published,
        series_id: payload.series_id,
        order_in_series: payload.order_in_series,
    })
}

fn check_series_reference(state: &AppState, series_id: Option<i64>) -> Result<(), ApiError> {
    if let Some(series_id) = series_id {
        if state.db.get_series_by_id(series_id)?.is_none() {
            return Err(ApiError::Validation(format!(
                "Series {series_id} does not exist"
            )));
        }
    }
    Ok(())
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    let rows = state.db.list_posts()?;
    Ok(Json(
        rows.into_iter().map(|row| post_response(row, None)).collect(),
    ))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let (row, series) = state
        .db
        .get_post_by_slug(&slug)?
        .ok_or(ApiError::NotFound("Post"))?;
    Ok(Json(post_response(row, series)))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = validated_fields(payload)?;

    // Probed up front so a duplicate reads as a 400, not a constraint 500.
    if state.db.post_slug_taken(&fields.slug, None)? {
        return Err(ApiError::Validation(format!(
            "A post with slug '{}' already exists",
            fields.slug
        )));
    }
    check_series_reference(&state, fields.series_id)?;

    let row = state.db.create_post(&fields)?;
    Ok((StatusCode::CREATED, Json(post_response(row, None))))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PostPayload>,
) -> Result<Json<Post>, ApiError> {
    let fields = validated_fields(payload)?;

    if state.db.post_slug_taken(&fields.slug, Some(id))? {
        return Err(ApiError::Validation(format!(
            "A post with slug '{}' already exists",
            fields.slug
        )));
    }
    check_series_reference(&state, fields.series_id)?;

    let row = state
        .db
        .update_post(id, &fields)?
        .ok_or(ApiError::NotFound("Post"))?;
    Ok(Json(post_response(row, None)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_post(id)?;
    Ok(StatusCode::NO_CONTENT)
}
