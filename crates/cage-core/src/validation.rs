//! Field validation rules.
//!
//! Each rule pairs a regular expression with a description of the accepted
//! values. The description is what the caller sees when a value is rejected.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result, ValidationError};

/// A pattern and its user-facing description, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPattern {
    pub pattern: String,
    pub description: String,
}

impl FieldPattern {
    pub fn new(pattern: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            description: description.into(),
        }
    }

    /// Compile into a rule. `field` names the rule in the error on failure.
    pub fn compile(&self, field: &'static str) -> Result<FieldRule> {
        let regex = Regex::new(&self.pattern)
            .map_err(|source| ConfigError::InvalidPattern { field, source })?;
        Ok(FieldRule {
            regex,
            description: self.description.clone(),
        })
    }
}

/// Configured patterns for every validated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPatterns {
    pub user_id: FieldPattern,
    pub user_password: FieldPattern,
    pub user_name: FieldPattern,
    pub category_id: FieldPattern,
    pub article_id: FieldPattern,
}

impl Default for FieldPatterns {
    fn default() -> Self {
        // `A-z` is a legacy range that also admits [\]^_` and is kept as-is
        // so existing account ids stay valid.
        let slug = FieldPattern::new(
            r"^[-0-9a-z]{1,}$",
            "at least 1 character; lowercase letters, digits or dashes only",
        );
        Self {
            user_id: FieldPattern::new(
                r"^[0-9a-zA-z_]{5,32}$",
                "5-32 characters; letters, digits or underscores only",
            ),
            user_password: FieldPattern::new(r"^[^\s]{10,32}$", "10-32 characters"),
            user_name: FieldPattern::new(r"^[^\t\r\n]{1,12}$", "1-12 characters"),
            category_id: slug.clone(),
            article_id: slug,
        }
    }
}

impl FieldPatterns {
    /// Compile every pattern. Fails on the first invalid one.
    pub fn compile(&self) -> Result<FieldRules> {
        Ok(FieldRules {
            user_id: self.user_id.compile("user_id")?,
            user_password: self.user_password.compile("user_password")?,
            user_name: self.user_name.compile("user_name")?,
            category_id: self.category_id.compile("category_id")?,
            article_id: self.article_id.compile("article_id")?,
        })
    }
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct FieldRule {
    regex: Regex,
    description: String,
}

impl FieldRule {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// Check `value`, reporting failures against the request field `field`.
    pub fn check(&self, field: &'static str, value: &str) -> std::result::Result<(), ValidationError> {
        if self.is_match(value) {
            Ok(())
        } else {
            Err(ValidationError {
                field,
                message: self.description.clone(),
            })
        }
    }
}

/// Compiled rules, built once at startup.
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub user_id: FieldRule,
    pub user_password: FieldRule,
    pub user_name: FieldRule,
    pub category_id: FieldRule,
    pub article_id: FieldRule,
}

impl Default for FieldRules {
    fn default() -> Self {
        // The built-in patterns are literals known to compile.
        match FieldPatterns::default().compile() {
            Ok(rules) => rules,
            Err(err) => unreachable!("built-in field pattern failed to compile: {err}"),
        }
    }
}
