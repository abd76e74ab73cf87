//! Event type labels.

use std::fmt;

/// The kind of an audit event.
///
/// The string forms are what gets stored, so they are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Login,
    Logout,
    UserCreate,
    UserModify,
    UserDelete,
    ArticlePost,
    /// Editing an article. Stored as `User: Edit`.
    ArticleEdit,
    ArticleDelete,
    CategoryCreate,
    CategoryModify,
    CategoryDelete,
    CommentCreate,
    CommentReview,
    CommentDelete,
    /// An unexpected failure while serving an action.
    Exception,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        Self::Login,
        Self::Logout,
        Self::UserCreate,
        Self::UserModify,
        Self::UserDelete,
        Self::ArticlePost,
        Self::ArticleEdit,
        Self::ArticleDelete,
        Self::CategoryCreate,
        Self::CategoryModify,
        Self::CategoryDelete,
        Self::CommentCreate,
        Self::CommentReview,
        Self::CommentDelete,
        Self::Exception,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "Auth: Login",
            Self::Logout => "Auth: Logout",
            Self::UserCreate => "User: Create",
            Self::UserModify => "User: Modify",
            Self::UserDelete => "User: Delete",
            Self::ArticlePost => "Article: Post",
            Self::ArticleEdit => "User: Edit",
            Self::ArticleDelete => "Article: Delete",
            Self::CategoryCreate => "Category: Create",
            Self::CategoryModify => "Category: Modify",
            Self::CategoryDelete => "Category: Delete",
            Self::CommentCreate => "Comment: Create",
            Self::CommentReview => "Comment: Review",
            Self::CommentDelete => "Comment: Delete",
            Self::Exception => "Exception",
        }
    }

    /// Look a kind up by its stored label.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == label)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
