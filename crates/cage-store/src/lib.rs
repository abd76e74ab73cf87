//! # Cage Store
//!
//! Storage abstraction for Cage. Provides a trait-based interface for
//! users, categories, articles, comments and audit events, with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The [`Store`] trait keeps the action layer storage-agnostic. The primary
//! implementation is [`SqliteStore`], with [`MemoryStore`] for tests. Both
//! report uniqueness clashes as values ([`InsertResult::Duplicate`]) rather
//! than errors, so the caller can map them to the offending request field.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] / [`UpdateResult`] - Outcome of writes to unique columns
//! - [`ArticleQuery`] - Filter, sort key and window for article listings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cage_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("cage.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let users = store.list_users(0, 20).await.unwrap();
//!     assert!(users.is_empty());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Deletion rules**: users own categories and articles weakly (nulled on
//!   delete) and comments strongly (deleted); articles own their comments;
//!   comments own their replies.
//! - **Dangling references**: a user or category reference to a row that
//!   does not exist is stored as `None`.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    ArticleOrder, ArticleQuery, CategoryEntry, CategoryOrder, InsertResult, Store, UpdateResult,
};
