//! Fault injection.
//!
//! [`FlakyStore`] delegates to a [`MemoryStore`] until told to fail, then
//! answers every call with a [`StoreError`]. Use it to drive the unexpected
//! failure path of an action.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use cage_core::{
    Article, ArticleId, Category, CategoryId, Comment, CommentId, EventId, EventRecord,
    NewComment, User, UserId,
};
use cage_store::{
    ArticleQuery, CategoryEntry, CategoryOrder, InsertResult, MemoryStore, Result, Store,
    StoreError, UpdateResult,
};

/// A memory store with a failure switch.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn insert_user(&self, user: &User) -> Result<InsertResult> {
        self.check()?;
        self.inner.insert_user(user).await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        self.check()?;
        self.inner.get_user(id).await
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.check()?;
        self.inner.find_user_by_name(name).await
    }

    async fn list_users(&self, offset: u64, limit: u64) -> Result<Vec<User>> {
        self.check()?;
        self.inner.list_users(offset, limit).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.check()?;
        self.inner.count_users().await
    }

    async fn update_user(&self, user: &User) -> Result<UpdateResult> {
        self.check()?;
        self.inner.update_user(user).await
    }

    async fn delete_user(&self, id: &UserId) -> Result<bool> {
        self.check()?;
        self.inner.delete_user(id).await
    }

    async fn insert_category(&self, category: &Category) -> Result<InsertResult> {
        self.check()?;
        self.inner.insert_category(category).await
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<CategoryEntry>> {
        self.check()?;
        self.inner.get_category(id).await
    }

    async fn list_categories(&self, order: CategoryOrder, desc: bool) -> Result<Vec<CategoryEntry>> {
        self.check()?;
        self.inner.list_categories(order, desc).await
    }

    async fn rename_category(&self, id: &CategoryId, name: &str) -> Result<UpdateResult> {
        self.check()?;
        self.inner.rename_category(id, name).await
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool> {
        self.check()?;
        self.inner.delete_category(id).await
    }

    async fn insert_article(&self, article: &Article) -> Result<InsertResult> {
        self.check()?;
        self.inner.insert_article(article).await
    }

    async fn get_article(&self, id: &ArticleId) -> Result<Option<Article>> {
        self.check()?;
        self.inner.get_article(id).await
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        self.check()?;
        self.inner.list_articles(query).await
    }

    async fn update_article(&self, article: &Article) -> Result<UpdateResult> {
        self.check()?;
        self.inner.update_article(article).await
    }

    async fn delete_article(&self, id: &ArticleId) -> Result<bool> {
        self.check()?;
        self.inner.delete_article(id).await
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.check()?;
        self.inner.insert_comment(comment).await
    }

    async fn get_comment(&self, article: &ArticleId, id: CommentId) -> Result<Option<Comment>> {
        self.check()?;
        self.inner.get_comment(article, id).await
    }

    async fn list_root_comments(
        &self,
        article: &ArticleId,
        reviewed_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Comment>> {
        self.check()?;
        self.inner
            .list_root_comments(article, reviewed_only, offset, limit)
            .await
    }

    async fn list_replies(&self, article: &ArticleId, reviewed_only: bool) -> Result<Vec<Comment>> {
        self.check()?;
        self.inner.list_replies(article, reviewed_only).await
    }

    async fn mark_comment_reviewed(&self, article: &ArticleId, id: CommentId) -> Result<bool> {
        self.check()?;
        self.inner.mark_comment_reviewed(article, id).await
    }

    async fn delete_comment(&self, article: &ArticleId, id: CommentId) -> Result<bool> {
        self.check()?;
        self.inner.delete_comment(article, id).await
    }

    async fn insert_event(
        &self,
        kind: &str,
        description: &str,
        actor: Option<&UserId>,
        created_at: i64,
    ) -> Result<EventId> {
        self.check()?;
        self.inner
            .insert_event(kind, description, actor, created_at)
            .await
    }

    async fn list_events(&self, offset: u64, limit: u64) -> Result<Vec<EventRecord>> {
        self.check()?;
        self.inner.list_events(offset, limit).await
    }
}
