//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`. Foreign keys are
//! enabled on every connection so the deletion rules live in the schema.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use cage_core::{
    Article, ArticleId, Category, CategoryId, Comment, CommentId, EventId, EventRecord,
    NewComment, PasswordDigest, PermissionValue, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    ArticleQuery, CategoryEntry, CategoryOrder, InsertResult, Store, UpdateResult,
};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Drop all data and recreate the schema.
    pub async fn reset(&self) -> Result<()> {
        self.call(migration::reset).await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, name, password, permission, expired, last_login, created_at";

const ARTICLE_COLUMNS: &str = "id, title, text_type, source_text, content, read_count, \
     post_time, update_time, public, is_commentable, category, author";

const COMMENT_COLUMNS: &str =
    "id, article, parent, user_id, nickname, content, reviewed, is_author, created_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get::<_, String>("id")?),
        name: row.get("name")?,
        password: PasswordDigest::from_hex(row.get::<_, String>("password")?),
        permission: PermissionValue::from_bits(row.get("permission")?),
        expired: row.get("expired")?,
        last_login: row.get("last_login")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_category_entry(row: &Row<'_>) -> rusqlite::Result<CategoryEntry> {
    Ok(CategoryEntry {
        category: Category {
            id: CategoryId::new(row.get::<_, String>("id")?),
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            created_by: row.get::<_, Option<String>>("created_by")?.map(UserId::new),
        },
        article_count: row.get("article_count")?,
    })
}

fn row_to_article(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: ArticleId::new(row.get::<_, String>("id")?),
        title: row.get("title")?,
        text_type: row.get("text_type")?,
        source_text: row.get("source_text")?,
        content: row.get("content")?,
        read_count: row.get("read_count")?,
        post_time: row.get("post_time")?,
        update_time: row.get("update_time")?,
        public: row.get("public")?,
        is_commentable: row.get("is_commentable")?,
        category: row.get::<_, Option<String>>("category")?.map(CategoryId::new),
        author: row.get::<_, Option<String>>("author")?.map(UserId::new),
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: CommentId(row.get("id")?),
        article: ArticleId::new(row.get::<_, String>("article")?),
        parent: row.get::<_, Option<i64>>("parent")?.map(CommentId),
        user: row.get::<_, Option<String>>("user_id")?.map(UserId::new),
        nickname: row.get("nickname")?,
        content: row.get("content")?,
        reviewed: row.get("reviewed")?,
        is_author: row.get("is_author")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: EventId(row.get("id")?),
        kind: row.get("kind")?,
        description: row.get("description")?,
        actor: row.get::<_, Option<String>>("actor")?.map(UserId::new),
        created_at: row.get("created_at")?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn exists(conn: &Connection, sql: &str, key: &str) -> Result<bool> {
    Ok(conn.query_row(sql, [key], |_| Ok(())).optional()?.is_some())
}

/// The column named in a UNIQUE/PRIMARY KEY violation, if that is what `err` is.
fn unique_violation(err: &rusqlite::Error) -> Option<&'static str> {
    match err {
        rusqlite::Error::SqliteFailure(code, Some(message))
            if code.code == ErrorCode::ConstraintViolation =>
        {
            if !message.contains("UNIQUE") {
                None
            } else if message.ends_with(".name") {
                Some("name")
            } else if message.ends_with(".id") {
                Some("id")
            } else {
                None
            }
        }
        _ => None,
    }
}

fn insert_outcome(result: rusqlite::Result<usize>) -> Result<InsertResult> {
    match result {
        Ok(_) => Ok(InsertResult::Inserted),
        Err(err) => match unique_violation(&err) {
            Some(field) => Ok(InsertResult::Duplicate { field }),
            None => Err(err.into()),
        },
    }
}

fn update_outcome(result: rusqlite::Result<usize>) -> Result<UpdateResult> {
    match result {
        Ok(0) => Ok(UpdateResult::NotFound),
        Ok(_) => Ok(UpdateResult::Updated),
        Err(err) => match unique_violation(&err) {
            Some(field) => Ok(UpdateResult::Duplicate { field }),
            None => Err(err.into()),
        },
    }
}

fn query_comments(
    conn: &Connection,
    filter: &str,
    article: &str,
    reviewed_only: bool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Comment>> {
    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments
         WHERE article = ?1 AND {filter} AND (?2 = 0 OR reviewed = 1)
         ORDER BY created_at, id
         LIMIT ?3 OFFSET ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let comments = stmt
        .query_map(params![article, reviewed_only, limit, offset], row_to_comment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

#[async_trait]
impl Store for SqliteStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<InsertResult> {
        let user = user.clone();
        self.call(move |conn| {
            if exists(conn, "SELECT 1 FROM users WHERE id = ?1", user.id.as_str())? {
                return Ok(InsertResult::Duplicate { field: "id" });
            }
            if exists(conn, "SELECT 1 FROM users WHERE name = ?1", &user.name)? {
                return Ok(InsertResult::Duplicate { field: "name" });
            }

            insert_outcome(conn.execute(
                &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    user.id.as_str(),
                    user.name,
                    user.password.as_str(),
                    user.permission.bits(),
                    user.expired,
                    user.last_login,
                    user.created_at,
                ],
            ))
        })
        .await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let id = id.clone();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id.as_str()],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let name = name.to_string();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?1"),
                [name],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_users(&self, offset: u64, limit: u64) -> Result<Vec<User>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid LIMIT ?1 OFFSET ?2"
            ))?;
            let users = stmt
                .query_map(params![sql_int(limit), sql_int(offset)], row_to_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await
    }

    async fn count_users(&self) -> Result<u64> {
        self.call(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn update_user(&self, user: &User) -> Result<UpdateResult> {
        let user = user.clone();
        self.call(move |conn| {
            let clash: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE name = ?1 AND id != ?2",
                    params![user.name, user.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if clash.is_some() {
                return Ok(UpdateResult::Duplicate { field: "name" });
            }

            update_outcome(conn.execute(
                "UPDATE users
                 SET name = ?2, password = ?3, permission = ?4, expired = ?5, last_login = ?6
                 WHERE id = ?1",
                params![
                    user.id.as_str(),
                    user.name,
                    user.password.as_str(),
                    user.permission.bits(),
                    user.expired,
                    user.last_login,
                ],
            ))
        })
        .await
    }

    async fn delete_user(&self, id: &UserId) -> Result<bool> {
        let id = id.clone();
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id.as_str()])?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_category(&self, category: &Category) -> Result<InsertResult> {
        let category = category.clone();
        self.call(move |conn| {
            if exists(conn, "SELECT 1 FROM categories WHERE id = ?1", category.id.as_str())? {
                return Ok(InsertResult::Duplicate { field: "id" });
            }
            if exists(conn, "SELECT 1 FROM categories WHERE name = ?1", &category.name)? {
                return Ok(InsertResult::Duplicate { field: "name" });
            }

            insert_outcome(conn.execute(
                "INSERT INTO categories (id, name, created_at, created_by)
                 VALUES (?1, ?2, ?3, (SELECT id FROM users WHERE id = ?4))",
                params![
                    category.id.as_str(),
                    category.name,
                    category.created_at,
                    category.created_by.as_ref().map(UserId::as_str),
                ],
            ))
        })
        .await
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<CategoryEntry>> {
        let id = id.clone();
        self.call(move |conn| {
            conn.query_row(
                "SELECT c.id, c.name, c.created_at, c.created_by,
                        (SELECT COUNT(*) FROM articles a WHERE a.category = c.id) AS article_count
                 FROM categories c WHERE c.id = ?1",
                [id.as_str()],
                row_to_category_entry,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_categories(&self, order: CategoryOrder, desc: bool) -> Result<Vec<CategoryEntry>> {
        self.call(move |conn| {
            let key = match order {
                CategoryOrder::CreatedAt => "c.created_at",
                CategoryOrder::ArticleCount => "article_count",
                CategoryOrder::Name => "c.name",
            };
            let direction = if desc { "DESC" } else { "ASC" };

            let mut stmt = conn.prepare(&format!(
                "SELECT c.id, c.name, c.created_at, c.created_by,
                        COUNT(a.id) AS article_count
                 FROM categories c LEFT JOIN articles a ON a.category = c.id
                 GROUP BY c.id
                 ORDER BY {key} {direction}, c.id ASC"
            ))?;
            let categories = stmt
                .query_map([], row_to_category_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(categories)
        })
        .await
    }

    async fn rename_category(&self, id: &CategoryId, name: &str) -> Result<UpdateResult> {
        let id = id.clone();
        let name = name.to_string();
        self.call(move |conn| {
            let clash: Option<String> = conn
                .query_row(
                    "SELECT id FROM categories WHERE name = ?1 AND id != ?2",
                    params![name, id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if clash.is_some() {
                return Ok(UpdateResult::Duplicate { field: "name" });
            }

            update_outcome(conn.execute(
                "UPDATE categories SET name = ?2 WHERE id = ?1",
                params![id.as_str(), name],
            ))
        })
        .await
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool> {
        let id = id.clone();
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", [id.as_str()])?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Articles
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_article(&self, article: &Article) -> Result<InsertResult> {
        let article = article.clone();
        self.call(move |conn| {
            if exists(conn, "SELECT 1 FROM articles WHERE id = ?1", article.id.as_str())? {
                return Ok(InsertResult::Duplicate { field: "id" });
            }

            insert_outcome(conn.execute(
                &format!(
                    "INSERT INTO articles ({ARTICLE_COLUMNS}) VALUES (
                        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                        (SELECT id FROM categories WHERE id = ?11),
                        (SELECT id FROM users WHERE id = ?12)
                    )"
                ),
                params![
                    article.id.as_str(),
                    article.title,
                    article.text_type,
                    article.source_text,
                    article.content,
                    article.read_count,
                    article.post_time,
                    article.update_time,
                    article.public,
                    article.is_commentable,
                    article.category.as_ref().map(CategoryId::as_str),
                    article.author.as_ref().map(UserId::as_str),
                ],
            ))
        })
        .await
    }

    async fn get_article(&self, id: &ArticleId) -> Result<Option<Article>> {
        let id = id.clone();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
                [id.as_str()],
                row_to_article,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let query = query.clone();
        self.call(move |conn| {
            let direction = if query.desc { "DESC" } else { "ASC" };
            let mut stmt = conn.prepare(&format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles
                 WHERE (?1 = 0 OR public = 1) AND (?2 IS NULL OR category = ?2)
                 ORDER BY {} {direction}, id ASC
                 LIMIT ?3 OFFSET ?4",
                query.order.column()
            ))?;
            let articles = stmt
                .query_map(
                    params![
                        query.public_only,
                        query.category.as_ref().map(CategoryId::as_str),
                        sql_int(query.limit),
                        sql_int(query.offset),
                    ],
                    row_to_article,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(articles)
        })
        .await
    }

    async fn update_article(&self, article: &Article) -> Result<UpdateResult> {
        let article = article.clone();
        self.call(move |conn| {
            update_outcome(conn.execute(
                "UPDATE articles
                 SET title = ?2, text_type = ?3, source_text = ?4, content = ?5,
                     read_count = ?6, update_time = ?7, public = ?8, is_commentable = ?9,
                     category = (SELECT id FROM categories WHERE id = ?10)
                 WHERE id = ?1",
                params![
                    article.id.as_str(),
                    article.title,
                    article.text_type,
                    article.source_text,
                    article.content,
                    article.read_count,
                    article.update_time,
                    article.public,
                    article.is_commentable,
                    article.category.as_ref().map(CategoryId::as_str),
                ],
            ))
        })
        .await
    }

    async fn delete_article(&self, id: &ArticleId) -> Result<bool> {
        let id = id.clone();
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM articles WHERE id = ?1", [id.as_str()])?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Comments
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        let comment = comment.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO comments
                    (article, parent, user_id, nickname, content, reviewed, is_author, created_at)
                 VALUES (?1, ?2, (SELECT id FROM users WHERE id = ?3), ?4, ?5, ?6, ?7, ?8)",
                params![
                    comment.article.as_str(),
                    comment.parent.map(|p| p.0),
                    comment.user.as_ref().map(UserId::as_str),
                    comment.nickname,
                    comment.content,
                    comment.reviewed,
                    comment.is_author,
                    comment.created_at,
                ],
            )?;
            let id = conn.last_insert_rowid();

            conn.query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                [id],
                row_to_comment,
            )
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_comment(&self, article: &ArticleId, id: CommentId) -> Result<Option<Comment>> {
        let article = article.clone();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1 AND article = ?2"),
                params![id.0, article.as_str()],
                row_to_comment,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_root_comments(
        &self,
        article: &ArticleId,
        reviewed_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Comment>> {
        let article = article.clone();
        self.call(move |conn| {
            query_comments(
                conn,
                "parent IS NULL",
                article.as_str(),
                reviewed_only,
                sql_int(offset),
                sql_int(limit),
            )
        })
        .await
    }

    async fn list_replies(&self, article: &ArticleId, reviewed_only: bool) -> Result<Vec<Comment>> {
        let article = article.clone();
        self.call(move |conn| {
            query_comments(
                conn,
                "parent IS NOT NULL",
                article.as_str(),
                reviewed_only,
                0,
                -1,
            )
        })
        .await
    }

    async fn mark_comment_reviewed(&self, article: &ArticleId, id: CommentId) -> Result<bool> {
        let article = article.clone();
        self.call(move |conn| {
            let updated = conn.execute(
                "UPDATE comments SET reviewed = 1 WHERE id = ?1 AND article = ?2",
                params![id.0, article.as_str()],
            )?;
            Ok(updated > 0)
        })
        .await
    }

    async fn delete_comment(&self, article: &ArticleId, id: CommentId) -> Result<bool> {
        let article = article.clone();
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM comments WHERE id = ?1 AND article = ?2",
                params![id.0, article.as_str()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_event(
        &self,
        kind: &str,
        description: &str,
        actor: Option<&UserId>,
        created_at: i64,
    ) -> Result<EventId> {
        let kind = kind.to_string();
        let description = description.to_string();
        let actor = actor.cloned();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO events (kind, description, actor, created_at)
                 VALUES (?1, ?2, (SELECT id FROM users WHERE id = ?3), ?4)",
                params![
                    kind,
                    description,
                    actor.as_ref().map(UserId::as_str),
                    created_at
                ],
            )?;
            Ok(EventId(conn.last_insert_rowid()))
        })
        .await
    }

    async fn list_events(&self, offset: u64, limit: u64) -> Result<Vec<EventRecord>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, description, actor, created_at FROM events
                 ORDER BY id DESC LIMIT ?1 OFFSET ?2",
            )?;
            let events = stmt
                .query_map(params![sql_int(limit), sql_int(offset)], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }
}
