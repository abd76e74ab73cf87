//! # Cage Testkit
//!
//! Testing utilities for Cage.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: login digests and ciphers clients must reproduce
//! - **Generators**: Proptest strategies for accounts, flags and comments
//! - **Fixtures**: a ready [`Cms`](cage::Cms) over memory with a manual clock
//! - **Faults**: a store that fails on demand
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cage_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, cipher) in verify_all_vectors() {
//!     assert!(matches, "{name}: {cipher}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cage_testkit::generators::UserParams;
//!
//! proptest! {
//!     #[test]
//!     fn accounts_are_created(params: UserParams) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use cage_testkit::fixtures::{seed_blog, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let seed = seed_blog(&fixture).await;
//! let token = fixture.login("alice").await;
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faults::FlakyStore;
pub use fixtures::{seed_blog, BlogSeed, TestFixture, FIXTURE_NOW, FIXTURE_PASSWORD};
pub use generators::UserParams;
pub use vectors::{all_vectors, verify_all_vectors, LoginVector};
