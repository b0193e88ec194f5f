use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS series (
            id          INTEGER PRIMARY KEY,
            title       TEXT NOT NULL,
            slug        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS posts (
            id              INTEGER PRIMARY KEY,
            title           TEXT NOT NULL,
            slug            TEXT NOT NULL UNIQUE,
            content         TEXT NOT NULL,
            excerpt         TEXT NOT NULL,
            author          TEXT NOT NULL,
            category        TEXT NOT NULL,
            tags            TEXT NOT NULL,
            read_time       INTEGER NOT NULL,
            published       INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL,
            series_id       INTEGER REFERENCES series(id) ON DELETE SET NULL,
            order_in_series INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at);

        CREATE INDEX IF NOT EXISTS idx_posts_series
            ON posts(series_id);

        CREATE TABLE IF NOT EXISTS comments (
            id          INTEGER PRIMARY KEY,
            post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author      TEXT NOT NULL,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            is_approved INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        CREATE TABLE IF NOT EXISTS categories (
            id    INTEGER PRIMARY KEY,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS settings (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );

        -- Seed the default categories
        INSERT OR IGNORE INTO categories (name) VALUES
            ('announcement'),
            ('tutorials'),
            ('programming'),
            ('design'),
            ('technology');

        -- Seed the default settings
        INSERT OR IGNORE INTO settings (key, value) VALUES
            ('blog_title', 'My Awesome Blog'),
            ('footer_text', '&copy; 2024 My Awesome Blog. All rights reserved.');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
