//! # Cage Permissions
//!
//! Who is calling, what they may do, and how they prove who they are.
//!
//! ## Overview
//!
//! Every action runs on behalf of an [`Actor`]. Before an action touches
//! anything, the [`AuthorizationGuard`] checks the actor's permission value
//! against the flag the action requires. Actions on owned resources (a
//! category, an article, the comments under an article) additionally go
//! through an ownership check: the owner may proceed, anyone else needs the
//! elevated "others" flag.
//!
//! Logging in is a challenge-response exchange verified by the
//! [`ChallengeVerifier`]: the client sends a digest bound to its clock, and
//! the server rejects ciphers that do not match or whose timestamp is too far
//! from the server clock in either direction.
//!
//! ## Key Types
//!
//! - [`Actor`] - Caller identity and permission value
//! - [`AuthorizationGuard`] - Flag and ownership checks with a global switch
//! - [`LoginChallenge`] - The client's login attempt
//! - [`ChallengeVerifier`] - Digest and replay-window verification
//! - [`PermsError`] - Denials and failed challenges, each tied to a field

pub mod actor;
pub mod challenge;
pub mod error;
pub mod guard;

pub use actor::Actor;
pub use challenge::{ChallengeVerifier, LoginChallenge, DEFAULT_LOGIN_WINDOW_MS};
pub use error::{PermsError, Result};
pub use guard::AuthorizationGuard;
