//! Threaded comments.

use serde::Deserialize;
use tracing::info;

use cage_core::{flags, Article, ArticleId, CommentId, NewComment};
use cage_events::EventKind;
use cage_perms::Actor;

use crate::api::window_from_one;
use crate::cms::Cms;
use crate::error::{ActionError, ActionResult};
use crate::view::{CommentPage, CommentView};

/// A comment as a client submits it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCommentInput {
    /// Comment being replied to.
    pub reply_to: Option<CommentId>,
    /// Ignored when the article author comments.
    pub nickname: Option<String>,
    pub content: String,
}

fn missing_article(id: &ArticleId) -> ActionError {
    ActionError::not_found(
        "article_id",
        format!("article {id} does not exist, it may have been deleted"),
    )
}

fn missing_comment(id: CommentId) -> ActionError {
    ActionError::not_found("comment_id", format!("comment {id} does not exist"))
}

impl Cms {
    async fn commented_article(&self, id: &ArticleId) -> ActionResult<Article> {
        self.store
            .get_article(id)
            .await?
            .ok_or_else(|| missing_article(id))
    }

    /// A page of top-level comments with their replies. Pages start at 1.
    ///
    /// Only the article author sees unreviewed comments.
    pub async fn list_comments(
        &self,
        actor: &Actor,
        article: &ArticleId,
        page: i64,
        limit: i64,
    ) -> ActionResult<CommentPage> {
        self.guard.require(actor, flags::READ_COMMENT)?;

        let post = self.commented_article(article).await?;
        let reviewed_only = !actor.owns(post.author.as_ref());
        let (offset, limit) = window_from_one(page, limit, self.config.comment_list_limit);

        let mut roots = self
            .store
            .list_root_comments(article, reviewed_only, offset, limit.saturating_add(1))
            .await?;
        let is_more = roots.len() as u64 > limit;
        roots.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        let replies = self.store.list_replies(article, reviewed_only).await?;
        let comments = CommentView::forest(&roots, &replies);
        Ok(CommentPage { is_more, comments })
    }

    pub async fn get_comment(&self, actor: &Actor, article: &ArticleId, id: CommentId) -> ActionResult<CommentView> {
        self.guard.require(actor, flags::READ_COMMENT)?;

        let post = self
            .store
            .get_article(article)
            .await?
            .ok_or_else(|| missing_comment(id))?;
        let reviewed_only = !actor.owns(post.author.as_ref());

        let comment = match self.store.get_comment(article, id).await? {
            Some(comment) if comment.reviewed || !reviewed_only => comment,
            _ => return Err(missing_comment(id)),
        };
        let replies = self.store.list_replies(article, reviewed_only).await?;
        Ok(CommentView::tree(&comment, &replies))
    }

    /// Comment on an article, or reply to one of its comments.
    ///
    /// The article author comments under their own name and is reviewed
    /// immediately; everyone else supplies a nickname.
    pub async fn write_comment(
        &self,
        actor: &Actor,
        article: &ArticleId,
        input: NewCommentInput,
    ) -> ActionResult<CommentView> {
        self.guard.require(actor, flags::WRITE_COMMENT)?;

        let post = self.commented_article(article).await?;
        if let Some(parent) = input.reply_to {
            if self.store.get_comment(article, parent).await?.is_none() {
                return Err(missing_comment(parent));
            }
        }
        if !post.is_commentable {
            return Err(ActionError::invalid(
                "article_id",
                "comments are closed for this article",
            ));
        }

        let is_author = actor.owns(post.author.as_ref());
        let nickname = if is_author {
            actor.name.clone()
        } else {
            let nickname = input.nickname.as_deref().unwrap_or("").trim();
            if nickname.is_empty() {
                return Err(ActionError::invalid("nickname", "please enter a valid nickname"));
            }
            nickname.to_string()
        };
        let content = input.content.trim();
        if content.is_empty() {
            return Err(ActionError::invalid("content", "please enter some content"));
        }

        let comment = self
            .store
            .insert_comment(&NewComment {
                article: article.clone(),
                parent: input.reply_to,
                user: actor.id.clone(),
                nickname,
                content: content.to_string(),
                reviewed: is_author || !self.config.comment_need_review,
                is_author,
                created_at: self.now(),
            })
            .await?;

        info!(article = %article, comment = %comment.id, "comment added");
        self.notify(
            EventKind::CommentCreate,
            &format!("new comment({}) in article({article}) has been added.", comment.id),
            actor,
        )
        .await;
        Ok(CommentView::leaf(&comment))
    }

    /// Mark a comment reviewed. Comments on someone else's article need
    /// `REVIEW_OTHERS_COMMENT`.
    pub async fn review_comment(&self, actor: &Actor, article: &ArticleId, id: CommentId) -> ActionResult<CommentView> {
        self.guard.require(actor, flags::REVIEW_COMMENT)?;

        let post = self.commented_article(article).await?;
        self.guard
            .require_owner_or(actor, post.author.as_ref(), flags::REVIEW_OTHERS_COMMENT)?;

        let mut comment = self
            .store
            .get_comment(article, id)
            .await?
            .ok_or_else(|| missing_comment(id))?;
        if !self.store.mark_comment_reviewed(article, id).await? {
            return Err(missing_comment(id));
        }
        comment.reviewed = true;

        let by = actor.id.as_ref().map_or("-", |id| id.as_str());
        info!(article = %article, comment = %id, "comment reviewed");
        self.notify(
            EventKind::CommentReview,
            &format!("comment({id}) has been reviewed by {by}."),
            actor,
        )
        .await;
        Ok(CommentView::leaf(&comment))
    }

    /// Delete a comment and every reply below it.
    pub async fn delete_comment(&self, actor: &Actor, article: &ArticleId, id: CommentId) -> ActionResult<()> {
        self.guard.require(actor, flags::REVIEW_COMMENT)?;

        let post = self.commented_article(article).await?;
        self.guard
            .require_owner_or(actor, post.author.as_ref(), flags::REVIEW_OTHERS_COMMENT)?;

        if !self.store.delete_comment(article, id).await? {
            return Err(missing_comment(id));
        }

        let by = actor.id.as_ref().map_or("-", |id| id.as_str());
        info!(article = %article, comment = %id, "comment deleted");
        self.notify(
            EventKind::CommentDelete,
            &format!("comment({id}) has been deleted by {by}."),
            actor,
        )
        .await;
        Ok(())
    }
}
