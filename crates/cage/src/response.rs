//! The JSON shape every action result is reported in.
//!
//! ```text
//! {"$errors": null, "user": {...}}
//! {"$errors": {"name": "1-12 characters, no tabs or line breaks"}}
//! ```

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ActionError, ActionResult};

/// Message shown for failures the client cannot act on.
pub const GENERIC_FAILURE: &str = "an unexpected error occurred, please try again later";

/// `$errors` plus result fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// `None` on success; field-keyed messages otherwise.
    pub errors: Option<BTreeMap<String, String>>,
    pub fields: Map<String, Value>,
}

impl Response {
    /// A successful response with no fields.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A failed response with a single field error.
    pub fn failure(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: Some(BTreeMap::from([(field.into(), message.into())])),
            fields: Map::new(),
        }
    }

    pub fn from_error(err: &ActionError) -> Self {
        if err.is_expected() {
            Self::failure(err.field(), err.to_string())
        } else {
            Self::failure(err.field(), GENERIC_FAILURE)
        }
    }

    /// Flatten a successful payload into the response.
    ///
    /// Objects contribute their keys, `()` contributes nothing and any other
    /// value lands under `result`.
    pub fn from_result<T: Serialize>(result: ActionResult<T>) -> Self {
        match result {
            Ok(payload) => Self::ok().merge(payload),
            Err(err) => Self::from_error(&err),
        }
    }

    /// A successful payload under a single key.
    pub fn keyed<T: Serialize>(key: &str, result: ActionResult<T>) -> Self {
        match result {
            Ok(payload) => Self::ok().with(key, payload),
            Err(err) => Self::from_error(&err),
        }
    }

    /// Add one field.
    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(key.to_string(), value);
                self
            }
            Err(e) => Self::failure("exception", e.to_string()),
        }
    }

    fn merge<T: Serialize>(mut self, payload: T) -> Self {
        match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => {
                self.fields.extend(map);
                self
            }
            Ok(Value::Null) => self,
            Ok(other) => {
                self.fields.insert("result".to_string(), other);
                self
            }
            Err(e) => Self::failure("exception", e.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_none()
    }

    /// The message reported for `field`, if any.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.as_ref()?.get(field).map(String::as_str)
    }

    pub fn to_json(&self) -> Value {
        // Serializing maps of strings and JSON values cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("$errors", &self.errors)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
