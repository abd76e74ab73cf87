//! Persistent records.
//!
//! Timestamps are Unix milliseconds. Nullable references are `Option`s; a
//! `None` owner means the owning user was deleted.

use serde::{Deserialize, Serialize};

use crate::digest::PasswordDigest;
use crate::permission::PermissionValue;
use crate::types::{ArticleId, CategoryId, CommentId, EventId, UserId};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display name, unique across users.
    pub name: String,
    /// Stored password digest.
    pub password: PasswordDigest,
    pub permission: PermissionValue,
    /// Expired accounts cannot log in.
    pub expired: bool,
    /// Zero until the first successful login.
    pub last_login: i64,
    pub created_at: i64,
}

impl User {
    /// A fresh, non-expired account that has never logged in.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        password: PasswordDigest,
        permission: PermissionValue,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            password,
            permission,
            expired: false,
            last_login: 0,
            created_at,
        }
    }
}

/// An article category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Unique across categories.
    pub name: String,
    pub created_at: i64,
    pub created_by: Option<UserId>,
}

/// An article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    /// Renderer extension the source is written in.
    pub text_type: String,
    pub source_text: String,
    /// Rendered HTML.
    pub content: String,
    pub read_count: i64,
    pub post_time: i64,
    pub update_time: i64,
    /// Private articles are only visible to their author and have no category.
    pub public: bool,
    pub is_commentable: bool,
    pub category: Option<CategoryId>,
    pub author: Option<UserId>,
}

/// A comment on an article, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub article: ArticleId,
    pub parent: Option<CommentId>,
    pub user: Option<UserId>,
    pub nickname: String,
    pub content: String,
    pub reviewed: bool,
    /// Written by the article's author.
    pub is_author: bool,
    pub created_at: i64,
}

impl Comment {
    /// Name shown next to the comment.
    pub fn display_name(&self) -> String {
        if self.is_author {
            format!("[Author]{}", self.nickname)
        } else {
            self.nickname.clone()
        }
    }
}

/// A comment before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub article: ArticleId,
    pub parent: Option<CommentId>,
    pub user: Option<UserId>,
    pub nickname: String,
    pub content: String,
    pub reviewed: bool,
    pub is_author: bool,
    pub created_at: i64,
}

impl NewComment {
    pub fn with_id(self, id: CommentId) -> Comment {
        Comment {
            id,
            article: self.article,
            parent: self.parent,
            user: self.user,
            nickname: self.nickname,
            content: self.content,
            reviewed: self.reviewed,
            is_author: self.is_author,
            created_at: self.created_at,
        }
    }
}

/// An audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    /// Event type such as `Auth: Login`.
    pub kind: String,
    pub description: String,
    pub actor: Option<UserId>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_comment_display_name() {
        let mut comment = NewComment {
            article: ArticleId::new("hello"),
            parent: None,
            user: Some(UserId::new("writer")),
            nickname: "Writer".into(),
            content: "thanks".into(),
            reviewed: true,
            is_author: true,
            created_at: 0,
        }
        .with_id(CommentId(7));
        assert_eq!(comment.display_name(), "[Author]Writer");

        comment.is_author = false;
        assert_eq!(comment.display_name(), "Writer");
    }
}
