use serde::{Deserialize, Serialize};

/// Public identity attached to a session. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

/// A blog post as it appears on the wire. `series_title`/`series_slug` are
/// only populated on single-post reads, where the parent series is joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    pub read_time: i64,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub series_id: Option<i64>,
    pub order_in_series: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

/// Series detail view: the series row plus its published posts in
/// `order_in_series` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesWithPosts {
    #[serde(flatten)]
    pub series: Series,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}
