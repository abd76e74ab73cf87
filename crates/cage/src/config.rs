//! Deployment configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cage_core::{DigestAlgorithm, FieldPatterns, FieldRules, PasswordHasher, DEFAULT_SALT};
use cage_events::DEFAULT_QUEUE_CAPACITY;
use cage_perms::{AuthorizationGuard, ChallengeVerifier, DEFAULT_LOGIN_WINDOW_MS};

use crate::error::{CmsError, Result};

/// Configuration for a [`Cms`](crate::Cms).
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// When false every permission and ownership check passes.
    pub enable_permission_control: bool,
    /// Maximum drift between a login challenge timestamp and the server clock.
    pub login_timeout_ms: u64,
    pub password_salt: String,
    pub digest_algorithm: DigestAlgorithm,
    /// Validation patterns for ids, names and passwords.
    pub patterns: FieldPatterns,
    pub user_list_limit: u64,
    pub article_list_limit: u64,
    pub comment_list_limit: u64,
    /// Comments by anyone but the article author start unreviewed.
    pub comment_need_review: bool,
    pub database_path: PathBuf,
    /// Capacity of the audit event queue. Zero records events inline.
    pub event_queue_capacity: usize,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl CmsConfig {
    pub fn production() -> Self {
        Self {
            enable_permission_control: true,
            login_timeout_ms: DEFAULT_LOGIN_WINDOW_MS,
            password_salt: DEFAULT_SALT.to_string(),
            digest_algorithm: DigestAlgorithm::default(),
            patterns: FieldPatterns::default(),
            user_list_limit: 20,
            article_list_limit: 20,
            comment_list_limit: 20,
            comment_need_review: true,
            database_path: PathBuf::from("./databases/cage.db"),
            event_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn development() -> Self {
        Self {
            database_path: PathBuf::from("./databases/cage_dev.db"),
            ..Self::production()
        }
    }

    /// Permission control off, events recorded inline.
    pub fn testing() -> Self {
        Self {
            enable_permission_control: false,
            database_path: PathBuf::from("./databases/cage_test.db"),
            event_queue_capacity: 0,
            ..Self::production()
        }
    }

    /// Look a preset up by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "production" => Some(Self::production()),
            "development" => Some(Self::development()),
            "testing" => Some(Self::testing()),
            _ => None,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the values that can be checked without opening anything.
    pub fn validate(&self) -> Result<()> {
        if self.login_timeout_ms == 0 {
            return Err(CmsError::Config(cage_core::ConfigError::Invalid(
                "login_timeout_ms must be positive".into(),
            )));
        }
        if self.user_list_limit == 0 || self.article_list_limit == 0 || self.comment_list_limit == 0
        {
            return Err(CmsError::Config(cage_core::ConfigError::Invalid(
                "list limits must be positive".into(),
            )));
        }
        Ok(())
    }

    pub fn hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.digest_algorithm, self.password_salt.clone())
    }

    pub fn verifier(&self) -> ChallengeVerifier {
        ChallengeVerifier::new(self.hasher(), self.login_timeout_ms)
    }

    pub fn guard(&self) -> AuthorizationGuard {
        AuthorizationGuard::new(self.enable_permission_control)
    }

    pub fn rules(&self) -> cage_core::Result<FieldRules> {
        self.patterns.compile()
    }
}
