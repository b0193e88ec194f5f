/// Database row types — these map directly to SQLite rows.
/// Distinct from quill-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
}

pub struct PostRow {
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
}

/// Write-side post fields. Tags are already normalized by the caller.
pub struct PostFields {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    pub read_time: i64,
    pub published: bool,
    pub series_id: Option<i64>,
    pub order_in_series: Option<i64>,
}

pub struct SeriesRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub is_approved: bool,
}

pub struct CategoryRow {
    pub id: i64,
    pub name: String,
}

pub struct SettingRow {
    pub key: String,
    pub value: String,
}
