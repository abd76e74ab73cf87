//! Database schema migrations for SQLite.
//!
//! Versioned migrations recorded in `schema_migrations`. Each migration
//! transforms the schema from version N-1 to N inside one transaction.

use rusqlite::Connection;
use tracing::info;

use cage_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Tables in dependency order (dependents last).
const TABLES: [&str; 5] = ["users", "categories", "articles", "comments", "events"];

/// Initialize or migrate the database schema.
///
/// Idempotent: running it on an up-to-date database does nothing.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            info!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Drop every table and rebuild the schema from scratch.
pub fn reset(conn: &mut Connection) -> Result<()> {
    let mut sql = String::from("PRAGMA foreign_keys = OFF;\n");
    for table in TABLES.iter().rev() {
        sql.push_str(&format!("DROP TABLE IF EXISTS {table};\n"));
    }
    sql.push_str("DROP TABLE IF EXISTS schema_migrations;\nPRAGMA foreign_keys = ON;\n");
    conn.execute_batch(&sql)?;

    migrate(conn)
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,               -- hex digest, never plain text
            permission INTEGER NOT NULL DEFAULT 0,
            expired INTEGER NOT NULL DEFAULT 0,
            last_login INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            created_by TEXT REFERENCES users(id)
                ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE TABLE articles (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            text_type TEXT NOT NULL,              -- renderer extension
            source_text TEXT NOT NULL,
            content TEXT NOT NULL,                -- rendered HTML
            read_count INTEGER NOT NULL DEFAULT 0,
            post_time INTEGER NOT NULL,
            update_time INTEGER NOT NULL,
            public INTEGER NOT NULL DEFAULT 1,
            is_commentable INTEGER NOT NULL DEFAULT 1,
            category TEXT REFERENCES categories(id)
                ON UPDATE CASCADE ON DELETE SET NULL,
            author TEXT REFERENCES users(id)
                ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE TABLE comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            article TEXT NOT NULL REFERENCES articles(id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            parent INTEGER REFERENCES comments(id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            user_id TEXT REFERENCES users(id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            nickname TEXT NOT NULL,
            content TEXT NOT NULL,
            reviewed INTEGER NOT NULL DEFAULT 0,
            is_author INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            actor TEXT REFERENCES users(id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX idx_users_created ON users(created_at);
        CREATE INDEX idx_articles_category ON articles(category);
        CREATE INDEX idx_articles_author ON articles(author);
        CREATE INDEX idx_articles_post_time ON articles(post_time);
        CREATE INDEX idx_comments_article ON comments(article, parent);
        CREATE INDEX idx_comments_parent ON comments(parent);
        CREATE INDEX idx_comments_user ON comments(user_id);
        CREATE INDEX idx_events_actor ON events(actor);
        "#,
    )?;

    Ok(())
}
