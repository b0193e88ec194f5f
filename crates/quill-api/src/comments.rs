use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use quill_db::models::CommentRow;
use quill_types::api::{Ack, ModerateCommentRequest, SubmitCommentRequest};
use quill_types::models::Comment;

use crate::auth::AppState;
use crate::error::ApiError;

fn comment_response(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        post_id: row.post_id,
        author: row.author,
        content: row.content,
        created_at: row.created_at,
        is_approved: row.is_approved,
    }
}

/// Public read: approved comments only, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let rows = state.db.approved_comments(post_id)?;
    Ok(Json(rows.into_iter().map(comment_response).collect()))
}

/// Public submission. The stored row is never echoed back; until a
/// moderator approves it, the comment is invisible to everyone.
pub async fn submit_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(req): Json<SubmitCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.author.trim().is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "Author and content are required".to_string(),
        ));
    }
    if !state.db.post_exists(post_id)? {
        return Err(ApiError::NotFound("Post"));
    }

    state.db.insert_comment(post_id, &req.author, &req.content)?;

    Ok((
        StatusCode::CREATED,
        Json(Ack {
            success: true,
            message: "Comment submitted and awaiting approval.".to_string(),
        }),
    ))
}

// -- Moderation --

pub async fn list_all_comments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let rows = state.db.all_comments()?;
    Ok(Json(rows.into_iter().map(comment_response).collect()))
}

pub async fn moderate_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ModerateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let row = state
        .db
        .set_comment_approval(id, req.is_approved)?
        .ok_or(ApiError::NotFound("Comment"))?;
    Ok(Json(comment_response(row)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_comment(id)?;
    Ok(StatusCode::NO_CONTENT)
}
