//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use cage_core::{
    Article, ArticleId, Category, CategoryId, Comment, CommentId, EventId, EventRecord,
    NewComment, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::traits::{
    ArticleOrder, ArticleQuery, CategoryEntry, CategoryOrder, InsertResult, Store, UpdateResult,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Users with their insertion sequence.
    users: HashMap<UserId, (u64, User)>,
    next_user_seq: u64,

    categories: HashMap<CategoryId, Category>,

    articles: HashMap<ArticleId, Article>,

    /// Comments keyed by id; ids grow monotonically.
    comments: BTreeMap<i64, Comment>,
    next_comment_id: i64,

    events: BTreeMap<i64, EventRecord>,
    next_event_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl MemoryStoreInner {
    /// `Some(id)` only if the user exists.
    fn existing_user(&self, id: Option<&UserId>) -> Option<UserId> {
        id.filter(|id| self.users.contains_key(*id)).cloned()
    }

    fn existing_category(&self, id: Option<&CategoryId>) -> Option<CategoryId> {
        id.filter(|id| self.categories.contains_key(*id)).cloned()
    }

    fn article_count(&self, category: &CategoryId) -> i64 {
        self.articles
            .values()
            .filter(|a| a.category.as_ref() == Some(category))
            .count() as i64
    }

    fn category_entry(&self, category: &Category) -> CategoryEntry {
        CategoryEntry {
            category: category.clone(),
            article_count: self.article_count(&category.id),
        }
    }

    /// Remove `root` and every comment below it.
    fn remove_comment_tree(&mut self, root: i64) {
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            if self.comments.remove(&id).is_some() {
                pending.extend(
                    self.comments
                        .values()
                        .filter(|c| c.parent == Some(CommentId(id)))
                        .map(|c| c.id.0),
                );
            }
        }
    }

    fn comments_where<F>(&self, article: &ArticleId, reviewed_only: bool, pred: F) -> Vec<Comment>
    where
        F: Fn(&Comment) -> bool,
    {
        let mut comments: Vec<Comment> = self
            .comments
            .values()
            .filter(|c| &c.article == article)
            .filter(|c| !reviewed_only || c.reviewed)
            .filter(|c| pred(c))
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        comments
    }
}

fn window<T>(items: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

fn compare_articles(a: &Article, b: &Article, order: ArticleOrder) -> Ordering {
    match order {
        ArticleOrder::Id => a.id.cmp(&b.id),
        ArticleOrder::Category => a.category.cmp(&b.category),
        ArticleOrder::Author => a.author.cmp(&b.author),
        ArticleOrder::Title => a.title.cmp(&b.title),
        ArticleOrder::TextType => a.text_type.cmp(&b.text_type),
        ArticleOrder::ReadCount => a.read_count.cmp(&b.read_count),
        ArticleOrder::PostTime => a.post_time.cmp(&b.post_time),
        ArticleOrder::UpdateTime => a.update_time.cmp(&b.update_time),
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.users.contains_key(&user.id) {
            return Ok(InsertResult::Duplicate { field: "id" });
        }
        if inner.users.values().any(|(_, u)| u.name == user.name) {
            return Ok(InsertResult::Duplicate { field: "name" });
        }

        let seq = inner.next_user_seq;
        inner.next_user_seq += 1;
        inner.users.insert(user.id.clone(), (seq, user.clone()));
        Ok(InsertResult::Inserted)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.get(id).map(|(_, u)| u.clone()))
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .values()
            .find(|(_, u)| u.name == name)
            .map(|(_, u)| u.clone()))
    }

    async fn list_users(&self, offset: u64, limit: u64) -> Result<Vec<User>> {
        let inner = self.read()?;
        let mut users: Vec<&(u64, User)> = inner.users.values().collect();
        users.sort_by_key(|(seq, u)| (u.created_at, *seq));
        let users = users.into_iter().map(|(_, u)| u.clone()).collect();
        Ok(window(users, offset, limit))
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.read()?.users.len() as u64)
    }

    async fn update_user(&self, user: &User) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        if inner
            .users
            .values()
            .any(|(_, u)| u.name == user.name && u.id != user.id)
        {
            return Ok(UpdateResult::Duplicate { field: "name" });
        }

        match inner.users.get_mut(&user.id) {
            Some((_, stored)) => {
                stored.name = user.name.clone();
                stored.password = user.password.clone();
                stored.permission = user.permission;
                stored.expired = user.expired;
                stored.last_login = user.last_login;
                Ok(UpdateResult::Updated)
            }
            None => Ok(UpdateResult::NotFound),
        }
    }

    async fn delete_user(&self, id: &UserId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.users.remove(id).is_none() {
            return Ok(false);
        }

        for category in inner.categories.values_mut() {
            if category.created_by.as_ref() == Some(id) {
                category.created_by = None;
            }
        }
        for article in inner.articles.values_mut() {
            if article.author.as_ref() == Some(id) {
                article.author = None;
            }
        }

        let authored: Vec<i64> = inner
            .comments
            .values()
            .filter(|c| c.user.as_ref() == Some(id))
            .map(|c| c.id.0)
            .collect();
        for comment in authored {
            inner.remove_comment_tree(comment);
        }

        inner.events.retain(|_, e| e.actor.as_ref() != Some(id));
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_category(&self, category: &Category) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.categories.contains_key(&category.id) {
            return Ok(InsertResult::Duplicate { field: "id" });
        }
        if inner.categories.values().any(|c| c.name == category.name) {
            return Ok(InsertResult::Duplicate { field: "name" });
        }

        let mut stored = category.clone();
        stored.created_by = inner.existing_user(category.created_by.as_ref());
        inner.categories.insert(stored.id.clone(), stored);
        Ok(InsertResult::Inserted)
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<CategoryEntry>> {
        let inner = self.read()?;
        Ok(inner.categories.get(id).map(|c| inner.category_entry(c)))
    }

    async fn list_categories(&self, order: CategoryOrder, desc: bool) -> Result<Vec<CategoryEntry>> {
        let inner = self.read()?;
        let mut entries: Vec<CategoryEntry> = inner
            .categories
            .values()
            .map(|c| inner.category_entry(c))
            .collect();

        entries.sort_by(|a, b| {
            let primary = match order {
                CategoryOrder::CreatedAt => a.category.created_at.cmp(&b.category.created_at),
                CategoryOrder::ArticleCount => a.article_count.cmp(&b.article_count),
                CategoryOrder::Name => a.category.name.cmp(&b.category.name),
            };
            let primary = if desc { primary.reverse() } else { primary };
            primary.then_with(|| a.category.id.cmp(&b.category.id))
        });
        Ok(entries)
    }

    async fn rename_category(&self, id: &CategoryId, name: &str) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        if inner
            .categories
            .values()
            .any(|c| c.name == name && &c.id != id)
        {
            return Ok(UpdateResult::Duplicate { field: "name" });
        }

        match inner.categories.get_mut(id) {
            Some(category) => {
                category.name = name.to_string();
                Ok(UpdateResult::Updated)
            }
            None => Ok(UpdateResult::NotFound),
        }
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.categories.remove(id).is_none() {
            return Ok(false);
        }

        for article in inner.articles.values_mut() {
            if article.category.as_ref() == Some(id) {
                article.category = None;
            }
        }
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Articles
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_article(&self, article: &Article) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.articles.contains_key(&article.id) {
            return Ok(InsertResult::Duplicate { field: "id" });
        }

        let mut stored = article.clone();
        stored.author = inner.existing_user(article.author.as_ref());
        stored.category = inner.existing_category(article.category.as_ref());
        inner.articles.insert(stored.id.clone(), stored);
        Ok(InsertResult::Inserted)
    }

    async fn get_article(&self, id: &ArticleId) -> Result<Option<Article>> {
        Ok(self.read()?.articles.get(id).cloned())
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let inner = self.read()?;
        let mut articles: Vec<Article> = inner
            .articles
            .values()
            .filter(|a| !query.public_only || a.public)
            .filter(|a| query.category.is_none() || a.category == query.category)
            .cloned()
            .collect();

        articles.sort_by(|a, b| {
            let primary = compare_articles(a, b, query.order);
            let primary = if query.desc { primary.reverse() } else { primary };
            primary.then_with(|| a.id.cmp(&b.id))
        });
        Ok(window(articles, query.offset, query.limit))
    }

    async fn update_article(&self, article: &Article) -> Result<UpdateResult> {
        let mut inner = self.write()?;
        let category = inner.existing_category(article.category.as_ref());

        match inner.articles.get_mut(&article.id) {
            Some(stored) => {
                stored.title = article.title.clone();
                stored.text_type = article.text_type.clone();
                stored.source_text = article.source_text.clone();
                stored.content = article.content.clone();
                stored.read_count = article.read_count;
                stored.update_time = article.update_time;
                stored.public = article.public;
                stored.is_commentable = article.is_commentable;
                stored.category = category;
                Ok(UpdateResult::Updated)
            }
            None => Ok(UpdateResult::NotFound),
        }
    }

    async fn delete_article(&self, id: &ArticleId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.articles.remove(id).is_none() {
            return Ok(false);
        }
        inner.comments.retain(|_, c| &c.article != id);
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Comments
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        let mut inner = self.write()?;

        if !inner.articles.contains_key(&comment.article) {
            return Err(StoreError::InvalidData(format!(
                "article {} does not exist",
                comment.article
            )));
        }
        if let Some(parent) = comment.parent {
            if !inner.comments.contains_key(&parent.0) {
                return Err(StoreError::InvalidData(format!(
                    "comment {} does not exist",
                    parent
                )));
            }
        }

        inner.next_comment_id += 1;
        let id = CommentId(inner.next_comment_id);
        let mut stored = comment.clone().with_id(id);
        stored.user = inner.existing_user(comment.user.as_ref());
        inner.comments.insert(id.0, stored.clone());
        Ok(stored)
    }

    async fn get_comment(&self, article: &ArticleId, id: CommentId) -> Result<Option<Comment>> {
        let inner = self.read()?;
        Ok(inner
            .comments
            .get(&id.0)
            .filter(|c| &c.article == article)
            .cloned())
    }

    async fn list_root_comments(
        &self,
        article: &ArticleId,
        reviewed_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Comment>> {
        let inner = self.read()?;
        let roots = inner.comments_where(article, reviewed_only, |c| c.parent.is_none());
        Ok(window(roots, offset, limit))
    }

    async fn list_replies(&self, article: &ArticleId, reviewed_only: bool) -> Result<Vec<Comment>> {
        let inner = self.read()?;
        Ok(inner.comments_where(article, reviewed_only, |c| c.parent.is_some()))
    }

    async fn mark_comment_reviewed(&self, article: &ArticleId, id: CommentId) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.comments.get_mut(&id.0) {
            Some(comment) if &comment.article == article => {
                comment.reviewed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_comment(&self, article: &ArticleId, id: CommentId) -> Result<bool> {
        let mut inner = self.write()?;
        let belongs = inner
            .comments
            .get(&id.0)
            .is_some_and(|c| &c.article == article);
        if belongs {
            inner.remove_comment_tree(id.0);
        }
        Ok(belongs)
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
        let mut inner = self.write()?;
        inner.next_event_id += 1;
        let id = EventId(inner.next_event_id);
        let record = EventRecord {
            id,
            kind: kind.to_string(),
            description: description.to_string(),
            actor: inner.existing_user(actor),
            created_at,
        };
        inner.events.insert(id.0, record);
        Ok(id)
    }

    async fn list_events(&self, offset: u64, limit: u64) -> Result<Vec<EventRecord>> {
        let inner = self.read()?;
        let events = inner.events.values().rev().cloned().collect();
        Ok(window(events, offset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cage_core::{PasswordDigest, PermissionValue};

    fn user(id: &str, name: &str) -> User {
        User::new(
            UserId::new(id),
            name,
            PasswordDigest::from_hex("00"),
            PermissionValue::EMPTY,
            0,
        )
    }

    fn article(id: &str, author: Option<&str>) -> Article {
        Article {
            id: ArticleId::new(id),
            title: "t".into(),
            text_type: "md".into(),
            source_text: String::new(),
            content: String::new(),
            read_count: 0,
            post_time: 0,
            update_time: 0,
            public: false,
            is_commentable: true,
            category: None,
            author: author.map(UserId::new),
        }
    }

    fn reply(article: &str, parent: Option<CommentId>) -> NewComment {
        NewComment {
            article: ArticleId::new(article),
            parent,
            user: None,
            nickname: "guest".into(),
            content: "hi".into(),
            reviewed: false,
            is_author: false,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert_eq!(store.insert_user(&user("alice", "Alice")).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.insert_user(&user("other", "Alice")).await.unwrap(),
            InsertResult::Duplicate { field: "name" }
        );
        assert_eq!(store.count_users().await.unwrap(), 1);

        let found = store.find_user_by_name("Alice").await.unwrap().unwrap();
        assert_eq!(found.id.as_str(), "alice");
    }

    #[tokio::test]
    async fn test_users_keep_insertion_order_on_ties() {
        let store = MemoryStore::new();
        for (id, name) in [("zed_1", "Zed"), ("amy_1", "Amy"), ("bob_1", "Bob")] {
            store.insert_user(&user(id, name)).await.unwrap();
        }
        let ids: Vec<String> = store
            .list_users(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["zed_1", "amy_1", "bob_1"]);
    }

    #[tokio::test]
    async fn test_comment_tree_removal() {
        let store = MemoryStore::new();
        store.insert_article(&article("post", None)).await.unwrap();
        let post = ArticleId::new("post");

        let root = store.insert_comment(&reply("post", None)).await.unwrap();
        let child = store.insert_comment(&reply("post", Some(root.id))).await.unwrap();
        let grandchild = store
            .insert_comment(&reply("post", Some(child.id)))
            .await
            .unwrap();
        let sibling = store.insert_comment(&reply("post", None)).await.unwrap();

        assert!(store.delete_comment(&post, root.id).await.unwrap());
        assert!(store.get_comment(&post, grandchild.id).await.unwrap().is_none());
        assert!(store.get_comment(&post, sibling.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_comment_requires_article() {
        let store = MemoryStore::new();
        let err = store.insert_comment(&reply("missing", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_dangling_author_stored_as_none() {
        let store = MemoryStore::new();
        store.insert_article(&article("post", Some("ghost"))).await.unwrap();
        let stored = store.get_article(&ArticleId::new("post")).await.unwrap().unwrap();
        assert_eq!(stored.author, None);
    }

    #[tokio::test]
    async fn test_delete_user_removes_comments_and_events() {
        let store = MemoryStore::new();
        store.insert_user(&user("alice", "Alice")).await.unwrap();
        store.insert_article(&article("post", Some("alice"))).await.unwrap();
        let mut by_alice = reply("post", None);
        by_alice.user = Some(UserId::new("alice"));
        let comment = store.insert_comment(&by_alice).await.unwrap();
        store
            .insert_event("Auth: Login", "", Some(&UserId::new("alice")), 0)
            .await
            .unwrap();
        store.insert_event("Exception", "", None, 0).await.unwrap();

        assert!(store.delete_user(&UserId::new("alice")).await.unwrap());

        let post = ArticleId::new("post");
        assert_eq!(store.get_article(&post).await.unwrap().unwrap().author, None);
        assert!(store.get_comment(&post, comment.id).await.unwrap().is_none());
        let events = store.list_events(0, 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "Exception");
    }
}
