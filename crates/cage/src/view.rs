//! Client-facing shapes of stored records.
//!
//! Records carry digests, raw flag bits and foreign keys; views carry what a
//! client may see, with references resolved to `{id, name}` pairs.

use std::collections::HashMap;

use serde::Serialize;

use cage_core::{Article, Comment, CommentId, PermissionTable, User};

/// Replies nest at most this many levels below the comment a tree is built
/// from. Anything deeper is listed flat under its ancestor at the last level,
/// still carrying its own `reply_to`.
pub const MAX_REPLY_DEPTH: usize = 32;

/// A user as clients see it. The password digest never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    /// Flag names, only where the caller asked for them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<Vec<&'static str>>,
    pub expired: bool,
    pub last_login: i64,
}

impl UserView {
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            permission: None,
            expired: user.expired,
            last_login: user.last_login,
        }
    }

    pub fn with_permission(user: &User, table: &PermissionTable) -> Self {
        Self {
            permission: Some(table.names(user.permission)),
            ..Self::new(user)
        }
    }
}

/// A resolved reference to another record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Named {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub id: String,
    pub title: String,
    pub author: Option<Named>,
    pub category: Option<Named>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub public: bool,
    pub is_commentable: bool,
    pub read_count: i64,
    pub post_time: i64,
    pub update_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl ArticleView {
    pub(crate) fn new(
        article: &Article,
        author: Option<Named>,
        category: Option<Named>,
        with_content: bool,
        with_src: bool,
    ) -> Self {
        Self {
            id: article.id.to_string(),
            title: article.title.clone(),
            author,
            category,
            content: with_content.then(|| article.content.clone()),
            public: article.public,
            is_commentable: article.is_commentable,
            read_count: article.read_count,
            post_time: article.post_time,
            update_time: article.update_time,
            text_type: with_src.then(|| article.text_type.clone()),
            source_text: with_src.then(|| article.source_text.clone()),
        }
    }
}

/// A comment with its visible replies nested below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub comment_id: CommentId,
    pub reply_to: Option<CommentId>,
    /// Display name, `[Author]` prefixed for the article author.
    pub author: String,
    pub content: String,
    pub reviewed: bool,
    pub time: i64,
    pub replies: Vec<CommentView>,
}

impl CommentView {
    pub fn leaf(comment: &Comment) -> Self {
        Self {
            comment_id: comment.id,
            reply_to: comment.parent,
            author: comment.display_name(),
            content: comment.content.clone(),
            reviewed: comment.reviewed,
            time: comment.created_at,
            replies: Vec::new(),
        }
    }

    /// Build the tree under `root` from a flat list of replies.
    ///
    /// Siblings keep the order of `replies`. Replies whose parent is not
    /// reachable from `root` are ignored.
    pub fn tree(root: &Comment, replies: &[Comment]) -> Self {
        Self::build(root, &group_by_parent(replies))
    }

    /// Build one tree per root, sharing a single pass over `replies`.
    pub fn forest(roots: &[Comment], replies: &[Comment]) -> Vec<Self> {
        let children = group_by_parent(replies);
        roots.iter().map(|root| Self::build(root, &children)).collect()
    }

    fn build(root: &Comment, children: &HashMap<CommentId, Vec<&Comment>>) -> Self {
        // Each frame is a view under construction and the children it has
        // yet to visit. Once a frame is popped, the stack length is its depth.
        let mut stack = vec![(Self::leaf(root), replies_to(children, root.id).iter())];
        let mut built = None;
        while let Some((mut view, mut pending)) = stack.pop() {
            match pending.next() {
                Some(child) if stack.len() + 1 < MAX_REPLY_DEPTH => {
                    let frame = (Self::leaf(child), replies_to(children, child.id).iter());
                    stack.push((view, pending));
                    stack.push(frame);
                }
                Some(child) => {
                    view.replies.extend(flatten(child, children));
                    stack.push((view, pending));
                }
                None => match stack.last_mut() {
                    Some((parent, _)) => parent.replies.push(view),
                    None => built = Some(view),
                },
            }
        }
        built.unwrap_or_else(|| Self::leaf(root))
    }

    /// Number of comments in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.replies.iter().map(CommentView::size).sum::<usize>()
    }
}

fn group_by_parent(replies: &[Comment]) -> HashMap<CommentId, Vec<&Comment>> {
    let mut children: HashMap<CommentId, Vec<&Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent) = reply.parent {
            children.entry(parent).or_default().push(reply);
        }
    }
    children
}

fn replies_to<'m, 'c>(
    children: &'m HashMap<CommentId, Vec<&'c Comment>>,
    id: CommentId,
) -> &'m [&'c Comment] {
    children.get(&id).map_or(&[][..], Vec::as_slice)
}

/// `first` and everything below it, in depth-first order, as leaves.
fn flatten(first: &Comment, children: &HashMap<CommentId, Vec<&Comment>>) -> Vec<CommentView> {
    let mut flat = Vec::new();
    let mut work = vec![first];
    while let Some(comment) = work.pop() {
        flat.push(CommentView::leaf(comment));
        work.extend(replies_to(children, comment.id).iter().rev().copied());
    }
    flat
}

/// One page of top-level comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentPage {
    /// There are more top-level comments after this page.
    pub is_more: bool,
    pub comments: Vec<CommentView>,
}

/// The result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    /// Session token for later calls.
    pub token: String,
    pub user: UserView,
}
