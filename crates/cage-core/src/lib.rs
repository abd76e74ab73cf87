//! # Cage Core
//!
//! Pure primitives for Cage: permission flags, password digests, field
//! validation rules and the persistent record types.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Flag`] - A single named permission bit
//! - [`PermissionValue`] - The bitmask held by every user
//! - [`PermissionTable`] - Flag registry with groups, decode and best-effort parse
//! - [`PasswordHasher`] - Salted password digests and login challenge ciphers
//! - [`FieldRules`] - Compiled id/name/password patterns
//!
//! ## Permission Bits
//!
//! Each flag owns one bit of a 63-bit space. Bit 63 is reserved so a
//! permission value always fits a non-negative `i64`, which is also what the
//! superuser preset looks like: every bit from 0 to 62 set.

pub mod digest;
pub mod error;
pub mod model;
pub mod permission;
pub mod time;
pub mod types;
pub mod validation;

pub use digest::{constant_time_eq, DigestAlgorithm, PasswordDigest, PasswordHasher, DEFAULT_SALT};
pub use error::{ConfigError, Result, ValidationError};
pub use model::{Article, Category, Comment, EventRecord, NewComment, User};
pub use permission::{flags, Flag, PermissionGroup, PermissionTable, PermissionValue};
pub use time::{now_millis, Clock, ManualClock, SystemClock};
pub use types::{ArticleId, CategoryId, CommentId, EventId, UserId};
pub use validation::{FieldPattern, FieldPatterns, FieldRule, FieldRules};
