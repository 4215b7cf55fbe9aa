//! Key/value item
//!
//! The public unit exchanged with callers of the repository. Quoting and
//! layout are storage details and never leak into an `Item`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ItemError {
    #[error("key is empty")]
    EmptyKey,

    #[error("key must not contain '=': '{0}'")]
    KeyContainsEquals(String),

    #[error("key must not start with '#': '{0}'")]
    KeyLooksLikeComment(String),

    #[error("key must not contain a line break")]
    KeyContainsNewline,

    #[error("value must not contain a line break")]
    ValueContainsNewline,
}

/// A single `key=value` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub value: String,
}

impl Item {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Checks that a key can be used for a lookup
    pub fn validate_key(key: &str) -> Result<(), ItemError> {
        if key.is_empty() {
            return Err(ItemError::EmptyKey);
        }
        Ok(())
    }

    /// Checks that this item can be written as one line and read back
    /// as the same key and value.
    pub fn validate_writable(&self) -> Result<(), ItemError> {
        Self::validate_key(&self.key)?;

        if self.key.contains('=') {
            return Err(ItemError::KeyContainsEquals(self.key.clone()));
        }
        if self.key.contains(['\n', '\r']) {
            return Err(ItemError::KeyContainsNewline);
        }
        if self.key.trim_start().starts_with('#') {
            return Err(ItemError::KeyLooksLikeComment(self.key.clone()));
        }
        if self.value.contains(['\n', '\r']) {
            return Err(ItemError::ValueContainsNewline);
        }
        Ok(())
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
