use serde::{Deserialize, Serialize};

use crate::models::UserInfo;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// Generic acknowledgment body for operations that deliberately return no
/// resource representation (logout, comment submission, settings update).
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

// -- Posts --

/// Create/update body for a post. `tags` arrives as a comma-separated
/// string from the editor form and is normalized before storage.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostPayload {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub category: String,
    pub tags: String,
    pub read_time: i64,
    pub published: bool,
    #[serde(default)]
    pub series_id: Option<i64>,
    #[serde(default)]
    pub order_in_series: Option<i64>,
}

// -- Series --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesPayload {
    pub title: String,
    pub slug: String,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitCommentRequest {
    pub author: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerateCommentRequest {
    pub is_approved: bool,
}

// -- Categories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    pub name: String,
}
