//! # Cage
//!
//! A permission-gated blog/CMS backend: users, categories, articles and
//! threaded comments behind a single action API.
//!
//! ## Overview
//!
//! Each action on [`Cms`] takes the calling [`Actor`] and:
//!
//! 1. checks the actor's permission flag (and ownership, where the action
//!    distinguishes "own" from "others'"),
//! 2. validates its input against the configured field rules,
//! 3. renders article source through the renderer registry,
//! 4. mutates the store,
//! 5. records an audit event. Audit failures are logged, never returned.
//!
//! Expected failures come back as [`ActionError`] values keyed by the
//! request field they concern; [`Response`] turns a result into the
//! `{"$errors": ..., ...}` shape clients consume.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cage::{Cms, CmsConfig, NewUser};
//! use cage::perms::{Actor, LoginChallenge};
//! use cage::store::MemoryStore;
//! use cage::core::{PermissionValue, UserId};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let cms = Cms::builder(Arc::new(MemoryStore::new()))
//!         .config(CmsConfig::development())
//!         .build()?;
//!
//!     let root = Actor::user(UserId::new("root"), "root", PermissionValue::SUPERUSER);
//!     cms.add_user(&root, NewUser {
//!         id: "alice".into(),
//!         name: "Alice".into(),
//!         password: "correct-horse-42".into(),
//!         permission: vec!["POST_ARTICLE".into()],
//!         expired: false,
//!     })
//!     .await?;
//!
//!     let ts = 1_700_000_000_000;
//!     let cipher = cms.verifier().client_cipher("correct-horse-42", ts);
//!     let outcome = cms.login(&LoginChallenge::new("alice", cipher, ts), false).await?;
//!     let alice = cms.actor(Some(outcome.token.as_str())).await?;
//!     # let _ = alice;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cage::core` - records, identifiers, permission flags, digests
//! - `cage::render` - renderer registry
//! - `cage::perms` - actors, guard, login challenges
//! - `cage::store` - storage abstraction and SQLite
//! - `cage::events` - audit sinks

pub mod api;
pub mod cms;
pub mod config;
pub mod error;
pub mod response;
pub mod session;
pub mod view;

// Re-export component crates
pub use cage_core as core;
pub use cage_events as events;
pub use cage_perms as perms;
pub use cage_render as render;
pub use cage_store as store;

pub use api::{ArticleListQuery, EditArticle, ModifyUser, NewArticle, NewCommentInput, NewUser};
pub use cms::{Cms, CmsBuilder};
pub use config::CmsConfig;
pub use error::{ActionError, ActionResult, CmsError, Result};
pub use response::Response;
pub use session::{Session, SessionStore};
pub use view::{
    ArticleView, CommentPage, CommentView, LoginOutcome, Named, UserView, MAX_REPLY_DEPTH,
};

pub use cage_perms::Actor;
