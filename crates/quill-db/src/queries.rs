use crate::Database;
use crate::models::{CategoryRow, CommentRow, PostFields, PostRow, SeriesRow, SettingRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, author, category, tags, \
     read_time, published, created_at, updated_at, series_id, order_in_series";

/// Timestamps are written from Rust rather than SQLite defaults so that
/// `updated_at` refreshes go through the same code path. Microsecond
/// precision keeps lexicographic order equal to chronological order.
fn now_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, password FROM users WHERE username = ?1")?;
            let row = stmt
                .query_row([username], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password: row.get(2)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Seeds the admin credential. The password is hashed only when the row
    /// is absent, so re-running startup never rewrites the stored hash.
    pub fn ensure_admin<F>(&self, username: &str, hash_password: F) -> Result<()>
    where
        F: FnOnce() -> Result<String>,
    {
        if self.get_user_by_username(username)?.is_some() {
            return Ok(());
        }
        let hash = hash_password()?;
        self.create_user(username, &hash)?;
        Ok(())
    }

    // -- Posts --

    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Single-post read; joins the parent series so the handler can embed
    /// its title and slug. The second tuple element is `(title, slug)`.
    pub fn get_post_by_slug(&self, slug: &str) -> Result<Option<(PostRow, Option<(String, String)>)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT p.{}, s.title, s.slug
                 FROM posts p
                 LEFT JOIN series s ON p.series_id = s.id
                 WHERE p.slug = ?1",
                POST_COLUMNS.replace(", ", ", p.")
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row([slug], |row| {
                    let post = map_post(row)?;
                    let series_title: Option<String> = row.get(14)?;
                    let series_slug: Option<String> = row.get(15)?;
                    Ok((post, series_title.zip(series_slug)))
                })
                .optional()?;
            Ok(row)
        })
    }

    fn get_post_by_id(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post_by_id(conn, id))
    }

    /// Explicit duplicate-slug probe, run before inserts/updates so the
    /// caller can answer with a clean 400 instead of a constraint error.
    pub fn post_slug_taken(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1 AND id != ?2)",
                rusqlite::params![slug, exclude_id.unwrap_or(-1)],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn create_post(&self, fields: &PostFields) -> Result<PostRow> {
        let id = self.with_conn(|conn| {
            let now = now_utc();
            conn.execute(
                "INSERT INTO posts (title, slug, content, excerpt, author, category, tags,
                                    read_time, published, created_at, updated_at,
                                    series_id, order_in_series)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    fields.title,
                    fields.slug,
                    fields.content,
                    fields.excerpt,
                    fields.author,
                    fields.category,
                    serde_json::to_string(&fields.tags)?,
                    fields.read_time,
                    fields.published,
                    now,
                    now,
                    fields.series_id,
                    fields.order_in_series,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        self.get_post_by_id(id)?
            .ok_or_else(|| anyhow::anyhow!("post {id} vanished after insert"))
    }

    /// Full-field update. `updated_at` is always refreshed; returns `None`
    /// when the id is unknown.
    pub fn update_post(&self, id: i64, fields: &PostFields) -> Result<Option<PostRow>> {
        let changed = self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET title = ?1, slug = ?2, content = ?3, excerpt = ?4,
                                  author = ?5, category = ?6, tags = ?7, read_time = ?8,
                                  published = ?9, series_id = ?10, order_in_series = ?11,
                                  updated_at = ?12
                 WHERE id = ?13",
                rusqlite::params![
                    fields.title,
                    fields.slug,
                    fields.content,
                    fields.excerpt,
                    fields.author,
                    fields.category,
                    serde_json::to_string(&fields.tags)?,
                    fields.read_time,
                    fields.published,
                    fields.series_id,
                    fields.order_in_series,
                    now_utc(),
                    id,
                ],
            )?;
            Ok(changed)
        })?;

        if changed == 0 {
            return Ok(None);
        }
        self.get_post_by_id(id)
    }

    /// Idempotent; comments cascade via the foreign key.
    pub fn delete_post(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn post_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    // -- Series --

    pub fn list_series(&self) -> Result<Vec<SeriesRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, title, slug FROM series ORDER BY title")?;
            let rows = stmt
                .query_map([], map_series)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_series_by_slug(&self, slug: &str) -> Result<Option<SeriesRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, title, slug FROM series WHERE slug = ?1")?;
            let row = stmt.query_row([slug], map_series).optional()?;
            Ok(row)
        })
    }

    pub fn get_series_by_id(&self, id: i64) -> Result<Option<SeriesRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, title, slug FROM series WHERE id = ?1")?;
            let row = stmt.query_row([id], map_series).optional()?;
            Ok(row)
        })
    }

    /// Published posts of a series, ordered by their position. Posts without
    /// a position sort last, matching how the series page displays them.
    pub fn series_posts(&self, series_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE series_id = ?1 AND published = 1
                 ORDER BY order_in_series IS NULL, order_in_series"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([series_id], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn series_slug_taken(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM series WHERE slug = ?1 AND id != ?2)",
                rusqlite::params![slug, exclude_id.unwrap_or(-1)],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn create_series(&self, title: &str, slug: &str) -> Result<SeriesRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO series (title, slug) VALUES (?1, ?2)",
                (title, slug),
            )?;
            let id = conn.last_insert_rowid();
            Ok(SeriesRow {
                id,
                title: title.to_string(),
                slug: slug.to_string(),
            })
        })
    }

    pub fn update_series(&self, id: i64, title: &str, slug: &str) -> Result<Option<SeriesRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE series SET title = ?1, slug = ?2 WHERE id = ?3",
                rusqlite::params![title, slug, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            Ok(Some(SeriesRow {
                id,
                title: title.to_string(),
                slug: slug.to_string(),
            }))
        })
    }

    /// Referencing posts keep living; the foreign key nulls their series_id.
    pub fn delete_series(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM series WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Comments --

    pub fn approved_comments(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, author, content, created_at, is_approved
                 FROM comments
                 WHERE post_id = ?1 AND is_approved = 1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Always stored unapproved. Deliberately returns nothing: the caller
    /// only acknowledges the submission, it never echoes the row.
    pub fn insert_comment(&self, post_id: i64, author: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, author, content, created_at, is_approved)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                rusqlite::params![post_id, author, content, now_utc()],
            )?;
            Ok(())
        })
    }

    pub fn all_comments(&self) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, author, content, created_at, is_approved
                 FROM comments
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_comment_approval(&self, id: i64, approved: bool) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET is_approved = ?1 WHERE id = ?2",
                rusqlite::params![approved, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(
                "SELECT id, post_id, author, content, created_at, is_approved
                 FROM comments WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_comment).optional()?;
            Ok(row)
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CategoryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `None` means the name already exists (conflict-skip insert).
    pub fn create_category(&self, name: &str) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
                [name],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            Ok(Some(CategoryRow {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
            }))
        })
    }

    pub fn delete_category(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Settings --

    pub fn all_settings(&self) -> Result<Vec<SettingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SettingRow {
                        key: row.get(0)?,
                        value: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Updates an existing key; unknown keys are ignored rather than created.
    pub fn update_setting(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE settings SET value = ?1 WHERE key = ?2",
                (value, key),
            )?;
            Ok(())
        })
    }

    // -- Derived views --

    /// Published posts where `q` substring-matches title, excerpt, or
    /// content case-insensitively, or exactly equals one tag. Newest first.
    pub fn search_published(&self, q: &str) -> Result<Vec<PostRow>> {
        let needle = q.to_lowercase();
        let mut rows = self.published_posts()?;
        rows.retain(|post| {
            post.title.to_lowercase().contains(&needle)
                || post.excerpt.to_lowercase().contains(&needle)
                || post.content.to_lowercase().contains(&needle)
                || post.tags.iter().any(|tag| tag == q)
        });
        Ok(rows)
    }

    /// Tag frequencies over published posts, count descending with the tag
    /// name as an ascending tiebreak so the ordering is stable.
    pub fn tag_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut counts: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
        for post in self.published_posts()? {
            for tag in post.tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        let mut out: Vec<(String, i64)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }

    fn published_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE published = 1
                 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_post_by_id(conn: &Connection, id: i64) -> Result<Option<PostRow>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_post).optional()?;
    Ok(row)
}

fn map_post(row: &rusqlite::Row) -> std::result::Result<PostRow, rusqlite::Error> {
    let raw_tags: String = row.get(7)?;
    let tags = serde_json::from_str(&raw_tags).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        excerpt: row.get(4)?,
        author: row.get(5)?,
        category: row.get(6)?,
        tags,
        read_time: row.get(8)?,
        published: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        series_id: row.get(12)?,
        order_in_series: row.get(13)?,
    })
}

fn map_series(row: &rusqlite::Row) -> std::result::Result<SeriesRow, rusqlite::Error> {
    Ok(SeriesRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
    })
}

fn map_comment(row: &rusqlite::Row) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        is_approved: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
