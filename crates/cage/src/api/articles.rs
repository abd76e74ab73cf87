//! Articles.

use serde::Deserialize;
use tracing::info;

use cage_core::{flags, Article, ArticleId, CategoryId};
use cage_events::EventKind;
use cage_perms::Actor;
use cage_render::RendererInfo;
use cage_store::{ArticleOrder, ArticleQuery, InsertResult, UpdateResult};

use crate::api::window;
use crate::cms::Cms;
use crate::error::{ActionError, ActionResult};
use crate::view::{ArticleView, Named};

/// Filter, order and page for [`Cms::list_articles`].
#[derive(Debug, Clone, Default)]
pub struct ArticleListQuery {
    pub category: Option<CategoryId>,
    pub order: ArticleOrder,
    pub desc: bool,
    /// Zero-based page.
    pub page: i64,
    /// Non-positive means the configured default.
    pub limit: i64,
    pub with_content: bool,
}

/// Fields for a new article.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewArticle {
    pub id: String,
    pub title: String,
    /// Renderer extension.
    pub text_type: String,
    pub source_text: String,
    pub public: bool,
    /// Required for public articles, dropped for private ones.
    pub category: Option<CategoryId>,
    pub is_commentable: bool,
}

impl Default for NewArticle {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            text_type: String::new(),
            source_text: String::new(),
            public: true,
            category: None,
            is_commentable: true,
        }
    }
}

/// Changes to an article. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditArticle {
    pub title: Option<String>,
    pub public: Option<bool>,
    pub category: Option<CategoryId>,
    /// Can only change together with `source_text`.
    pub text_type: Option<String>,
    pub source_text: Option<String>,
    pub is_commentable: Option<bool>,
}

fn missing_article(id: &ArticleId) -> ActionError {
    ActionError::not_found("id", format!("article {id} does not exist, it may have been deleted"))
}

fn uncategorized() -> ActionError {
    ActionError::invalid("category", "a public article must belong to a category")
}

fn missing_category(id: &CategoryId) -> ActionError {
    ActionError::not_found("category", format!("category {id} does not exist"))
}

fn blank_title() -> ActionError {
    ActionError::invalid("title", "please enter a valid title")
}

impl Cms {
    async fn article_view(
        &self,
        article: &Article,
        with_content: bool,
        with_src: bool,
    ) -> ActionResult<ArticleView> {
        let author = match &article.author {
            Some(id) => self.store.get_user(id).await?.map(|u| Named {
                id: u.id.into_inner(),
                name: u.name,
            }),
            None => None,
        };
        let category = match &article.category {
            Some(id) => self.store.get_category(id).await?.map(|e| Named {
                id: e.category.id.into_inner(),
                name: e.category.name,
            }),
            None => None,
        };
        Ok(ArticleView::new(article, author, category, with_content, with_src))
    }

    async fn require_category(&self, id: &CategoryId) -> ActionResult<()> {
        match self.store.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(missing_category(id)),
        }
    }

    /// Public articles, optionally within one category.
    pub async fn list_articles(&self, actor: &Actor, query: ArticleListQuery) -> ActionResult<Vec<ArticleView>> {
        self.guard.require(actor, flags::READ_ARTICLE)?;

        let (offset, limit) = window(query.page, query.limit, self.config.article_list_limit);
        let articles = self
            .store
            .list_articles(&ArticleQuery {
                public_only: true,
                category: query.category,
                order: query.order,
                desc: query.desc,
                offset,
                limit,
            })
            .await?;

        let mut views = Vec::with_capacity(articles.len());
        for article in &articles {
            views.push(self.article_view(article, query.with_content, false).await?);
        }
        Ok(views)
    }

    /// One article. Reading the source needs `EDIT_ARTICLE`; private
    /// articles are only visible to their author.
    pub async fn get_article(
        &self,
        actor: &Actor,
        id: &ArticleId,
        with_src: bool,
        with_content: bool,
    ) -> ActionResult<ArticleView> {
        self.guard.require(actor, flags::READ_ARTICLE)?;
        if with_src {
            self.guard.require(actor, flags::EDIT_ARTICLE)?;
        }

        let article = self
            .store
            .get_article(id)
            .await?
            .ok_or_else(|| missing_article(id))?;
        if !article.public && self.guard.is_enabled() && !actor.owns(article.author.as_ref()) {
            return Err(ActionError::denied("you are not allowed to read a private article"));
        }

        self.article_view(&article, with_content, with_src).await
    }

    pub async fn post_article(&self, actor: &Actor, input: NewArticle) -> ActionResult<ArticleView> {
        self.guard.require(actor, flags::POST_ARTICLE)?;

        let category = if input.public {
            let category = input.category.ok_or_else(uncategorized)?;
            self.require_category(&category).await?;
            Some(category)
        } else {
            None
        };

        self.rules.article_id.check("id", &input.id)?;
        let title = input.title.trim();
        if title.is_empty() {
            return Err(blank_title());
        }
        if !self.renderers.supports(&input.text_type) {
            return Err(ActionError::UnsupportedFormat(input.text_type));
        }
        let content = self.renderers.render(&input.text_type, &input.source_text)?;

        let now = self.now();
        let article = Article {
            id: ArticleId::new(input.id),
            title: title.to_string(),
            text_type: input.text_type,
            source_text: input.source_text,
            content,
            read_count: 0,
            post_time: now,
            update_time: now,
            public: input.public,
            is_commentable: input.is_commentable,
            category,
            author: actor.id.clone(),
        };
        if let InsertResult::Duplicate { .. } = self.store.insert_article(&article).await? {
            return Err(ActionError::duplicate(
                "id",
                format!("article id {} already exists", article.id),
            ));
        }

        info!(article = %article.id, "article posted");
        let author = actor.id.as_ref().map_or("-", |id| id.as_str());
        self.notify(
            EventKind::ArticlePost,
            &format!("Author({author}) posted a new article({}).", article.id),
            actor,
        )
        .await;
        self.article_view(&article, true, false).await
    }

    /// Edit an article. Articles posted by someone else need
    /// `EDIT_OTHERS_ARTICLE`. Nothing is written or audited when no field
    /// actually changes.
    pub async fn edit_article(&self, actor: &Actor, id: &ArticleId, input: EditArticle) -> ActionResult<ArticleView> {
        self.guard.require(actor, flags::POST_ARTICLE)?;

        let mut article = self
            .store
            .get_article(id)
            .await?
            .ok_or_else(|| missing_article(id))?;
        self.guard
            .require_owner_or(actor, article.author.as_ref(), flags::EDIT_OTHERS_ARTICLE)?;

        let mut changed = Vec::new();

        let public = input.public.unwrap_or(article.public);
        if public != article.public {
            article.public = public;
            changed.push("public");
        }
        if !public {
            if article.category.take().is_some() {
                changed.push("category");
            }
        } else {
            match input.category {
                None if article.category.is_none() => return Err(uncategorized()),
                Some(category) if article.category.as_ref() != Some(&category) => {
                    self.require_category(&category).await?;
                    article.category = Some(category);
                    changed.push("category");
                }
                _ => {}
            }
        }

        if let Some(title) = input.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(blank_title());
            }
            if title != article.title {
                article.title = title.to_string();
                changed.push("title");
            }
        }

        if let Some(text_type) = input.text_type.filter(|t| !t.is_empty()) {
            if text_type != article.text_type
                && input.source_text.as_deref().map_or(true, str::is_empty)
            {
                return Err(ActionError::invalid(
                    "text_type",
                    "the text type cannot change without new source text",
                ));
            }
            if !self.renderers.supports(&text_type) {
                return Err(ActionError::UnsupportedFormat(text_type));
            }
            if text_type != article.text_type {
                article.text_type = text_type;
                changed.push("text_type");
            }
        }

        if let Some(source_text) = input.source_text.filter(|s| !s.is_empty()) {
            let content = self.renderers.render(&article.text_type, &source_text)?;
            if source_text != article.source_text {
                article.source_text = source_text;
                changed.push("source_text");
            }
            if content != article.content {
                article.content = content;
                changed.push("content");
            }
        }

        if let Some(is_commentable) = input.is_commentable {
            if is_commentable != article.is_commentable {
                article.is_commentable = is_commentable;
                changed.push("is_commentable");
            }
        }

        if changed.is_empty() {
            return self.article_view(&article, true, false).await;
        }

        article.update_time = self.now();
        if self.store.update_article(&article).await? == UpdateResult::NotFound {
            return Err(missing_article(id));
        }

        info!(article = %id, fields = ?changed, "article edited");
        self.notify(
            EventKind::ArticleEdit,
            &format!("edit properties {} of article({id}).", changed.join(",")),
            actor,
        )
        .await;
        self.article_view(&article, true, false).await
    }

    /// Delete an article and its comments.
    pub async fn delete_article(&self, actor: &Actor, id: &ArticleId) -> ActionResult<()> {
        self.guard.require(actor, flags::EDIT_ARTICLE)?;

        let article = self
            .store
            .get_article(id)
            .await?
            .ok_or_else(|| missing_article(id))?;
        self.guard
            .require_owner_or(actor, article.author.as_ref(), flags::EDIT_OTHERS_ARTICLE)?;

        if !self.store.delete_article(id).await? {
            return Err(missing_article(id));
        }

        info!(article = %id, "article deleted");
        let by = actor.id.as_ref().map_or("-", |id| id.as_str());
        self.notify(
            EventKind::ArticleDelete,
            &format!("article({id}) has been deleted by {by}."),
            actor,
        )
        .await;
        Ok(())
    }

    /// The text types articles can be written in.
    pub fn article_types(&self, actor: &Actor) -> ActionResult<Vec<RendererInfo>> {
        self.guard.require(actor, flags::POST_ARTICLE)?;
        Ok(self.renderers.renderers().cloned().collect())
    }
}
