//! TTL defaulting and capping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_store::codec::duration_secs;

use crate::error::{Error, Result};

/// Default and maximum TTL applied to one class of tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlLimits {
    /// TTL used when the request names none.
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// Upper bound for any requested TTL.
    #[serde(with = "duration_secs")]
    pub max_ttl: Duration,
}

impl TtlLimits {
    /// Creates limits. A default above the maximum is clamped to it.
    #[must_use]
    pub fn new(default_ttl: Duration, max_ttl: Duration) -> Self {
        Self {
            default_ttl: default_ttl.min(max_ttl),
            max_ttl,
        }
    }

    /// Resolves a requested TTL against these limits. See [`resolve_ttl`].
    pub fn resolve(&self, requested: Option<Duration>) -> Result<Duration> {
        resolve_ttl(requested, self.default_ttl, self.max_ttl)
    }
}

/// Resolves a requested TTL.
///
/// `None` takes `default`; an explicit zero is rejected; anything else is
/// capped at `max`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a zero TTL.
pub fn resolve_ttl(requested: Option<Duration>, default: Duration, max: Duration) -> Result<Duration> {
    let ttl = match requested {
        None => default,
        Some(ttl) if ttl.is_zero() => return Err(Error::invalid("ttl must be positive")),
        Some(ttl) => ttl,
    };
    Ok(ttl.min(max))
}

/// Returns `from + ttl`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the result is out of range.
pub fn expiry(from: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| from.checked_add_signed(d))
        .ok_or_else(|| Error::invalid("ttl out of range"))
}
