//! Name patterns used by policy rules.
//!
//! A pattern is an exact name, a name prefix followed by a single trailing
//! `*`, or `*` alone. Patterns are lowercased when parsed, and names are
//! expected to be lowercased before matching.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A role or mount name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pattern {
    /// Matches every name.
    Any,
    /// Matches names starting with the prefix.
    Prefix(String),
    /// Matches exactly one name.
    Exact(String),
}

impl Pattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the pattern is empty or has a `*`
    /// anywhere other than the end.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim().to_lowercase();
        if raw.is_empty() {
            return Err(Error::InvalidPattern {
                reason: "pattern cannot be empty".to_string(),
            });
        }

        let (body, glob) = match raw.strip_suffix('*') {
            Some(body) => (body, true),
            None => (raw.as_str(), false),
        };
        if body.contains('*') {
            return Err(Error::InvalidPattern {
                reason: format!("'{raw}': '*' is only allowed as the last character"),
            });
        }

        Ok(match (body.is_empty(), glob) {
            (true, _) => Self::Any,
            (false, true) => Self::Prefix(body.to_string()),
            (false, false) => Self::Exact(body.to_string()),
        })
    }

    /// Returns true if `name` matches.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Self::Exact(exact) => name == exact,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
            Self::Exact(exact) => f.write_str(exact),
        }
    }
}

impl TryFrom<String> for Pattern {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}
