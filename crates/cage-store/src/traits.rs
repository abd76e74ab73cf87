//! Store trait: the abstract interface for CMS persistence.
//!
//! Implementations include SQLite (primary) and in-memory (for tests). Both
//! enforce the same uniqueness constraints and the same deletion rules.

use async_trait::async_trait;
use serde::Serialize;

use cage_core::{
    Article, ArticleId, Category, CategoryId, Comment, CommentId, EventId, EventRecord,
    NewComment, User, UserId,
};

use crate::error::Result;

/// Result of inserting a row with unique columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Row was inserted.
    Inserted,
    /// A unique column already holds this value.
    Duplicate {
        /// The column that clashed: `id` or `name`.
        field: &'static str,
    },
}

/// Result of updating a row with unique columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    Updated,
    /// Another row already holds the new value.
    Duplicate { field: &'static str },
    /// No row with this id.
    NotFound,
}

/// A category together with the number of articles filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    #[serde(flatten)]
    pub category: Category,
    pub article_count: i64,
}

/// Sort key for category listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryOrder {
    #[default]
    CreatedAt,
    ArticleCount,
    Name,
}

impl CategoryOrder {
    /// Parse a client-supplied key. Unknown keys yield `None`.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "create_time" => Some(Self::CreatedAt),
            "article_count" => Some(Self::ArticleCount),
            "name" => Some(Self::Name),
            _ => None,
        }
    }
}

/// Sort key for article listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleOrder {
    Id,
    Category,
    Author,
    Title,
    TextType,
    ReadCount,
    #[default]
    PostTime,
    UpdateTime,
}

impl ArticleOrder {
    /// Parse a client-supplied key. Unknown keys yield `None`.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "id" => Some(Self::Id),
            "category" => Some(Self::Category),
            "author" => Some(Self::Author),
            "title" => Some(Self::Title),
            "text_type" => Some(Self::TextType),
            "read_count" => Some(Self::ReadCount),
            "post_time" => Some(Self::PostTime),
            "update_time" => Some(Self::UpdateTime),
            _ => None,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Category => "category",
            Self::Author => "author",
            Self::Title => "title",
            Self::TextType => "text_type",
            Self::ReadCount => "read_count",
            Self::PostTime => "post_time",
            Self::UpdateTime => "update_time",
        }
    }
}

/// Filter, order and window for article listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    /// Skip private articles.
    pub public_only: bool,
    pub category: Option<CategoryId>,
    pub order: ArticleOrder,
    pub desc: bool,
    pub offset: u64,
    pub limit: u64,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            public_only: true,
            category: None,
            order: ArticleOrder::default(),
            desc: false,
            offset: 0,
            limit: 20,
        }
    }
}

/// The Store trait: async interface for CMS persistence.
///
/// # Design Notes
///
/// - **Uniqueness**: user ids and names, category ids and names, and article
///   ids are unique. Violations come back as `Duplicate`, never as errors, so
///   a caller that lost a race reports the same field error as one that
///   checked first.
/// - **Dangling references**: a user or category reference to a row that
///   does not exist is stored as `None`.
/// - **Deletion**: deleting a user nulls category and article ownership and
///   deletes their comments and events; deleting a category nulls the
///   category of its articles; deleting an article deletes its comments;
///   deleting a comment deletes its replies.
/// - **Ordering**: ties are broken by insertion order (users, comments) or by
///   id (categories, articles).
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a user. Checks the id before the name.
    async fn insert_user(&self, user: &User) -> Result<InsertResult>;

    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>>;

    /// Users in creation order.
    async fn list_users(&self, offset: u64, limit: u64) -> Result<Vec<User>>;

    async fn count_users(&self) -> Result<u64>;

    /// Replace every mutable column of an existing user.
    async fn update_user(&self, user: &User) -> Result<UpdateResult>;

    /// Returns `false` if there was no such user.
    async fn delete_user(&self, id: &UserId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_category(&self, category: &Category) -> Result<InsertResult>;

    async fn get_category(&self, id: &CategoryId) -> Result<Option<CategoryEntry>>;

    async fn list_categories(&self, order: CategoryOrder, desc: bool) -> Result<Vec<CategoryEntry>>;

    /// Rename a category.
    async fn rename_category(&self, id: &CategoryId, name: &str) -> Result<UpdateResult>;

    async fn delete_category(&self, id: &CategoryId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Articles
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_article(&self, article: &Article) -> Result<InsertResult>;

    async fn get_article(&self, id: &ArticleId) -> Result<Option<Article>>;

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>>;

    /// Replace every mutable column of an existing article.
    async fn update_article(&self, article: &Article) -> Result<UpdateResult>;

    async fn delete_article(&self, id: &ArticleId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Comments
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a comment and return it with its assigned id.
    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment>;

    /// A comment, only if it belongs to `article`.
    async fn get_comment(&self, article: &ArticleId, id: CommentId) -> Result<Option<Comment>>;

    /// A page of top-level comments in creation order.
    async fn list_root_comments(
        &self,
        article: &ArticleId,
        reviewed_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Comment>>;

    /// Every reply (comment with a parent) under `article`, in creation order.
    async fn list_replies(&self, article: &ArticleId, reviewed_only: bool) -> Result<Vec<Comment>>;

    /// Mark a comment reviewed. Returns `false` if it does not exist.
    async fn mark_comment_reviewed(&self, article: &ArticleId, id: CommentId) -> Result<bool>;

    async fn delete_comment(&self, article: &ArticleId, id: CommentId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an audit event.
    async fn insert_event(
        &self,
        kind: &str,
        description: &str,
        actor: Option<&UserId>,
        created_at: i64,
    ) -> Result<EventId>;

    /// Events, newest first.
    async fn list_events(&self, offset: u64, limit: u64) -> Result<Vec<EventRecord>>;
}
