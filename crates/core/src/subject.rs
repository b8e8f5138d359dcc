//! Subject key validation.
//!
//! The subject key (usually a ticker symbol) is handed to every task as a
//! process argument, so it is restricted to a conservative character set
//! and may not start with `-`.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest accepted subject key.
pub const MAX_SUBJECT_LEN: usize = 32;

static SUBJECT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9^][A-Za-z0-9._=^-]*$").expect("valid subject regex")
});

/// Errors returned when parsing a subject key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("symbol is required")]
    Empty,

    #[error("symbol is too long ({len} > {max} characters)")]
    TooLong { len: usize, max: usize },

    #[error("symbol contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// A validated subject key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectKey(String);

impl SubjectKey {
    /// Trims and validates `raw`.
    pub fn parse(raw: &str) -> Result<Self, SubjectError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(SubjectError::Empty);
        }
        let len = key.chars().count();
        if len > MAX_SUBJECT_LEN {
            return Err(SubjectError::TooLong {
                len,
                max: MAX_SUBJECT_LEN,
            });
        }
        if !SUBJECT_PATTERN.is_match(key) {
            return Err(SubjectError::InvalidCharacters(key.to_string()));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubjectKey {
    type Error = SubjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SubjectKey> for String {
    fn from(key: SubjectKey) -> Self {
        key.0
    }
}
