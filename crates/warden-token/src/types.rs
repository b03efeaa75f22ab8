//! Core token types.
//!
//! - [`Token`]: a bearer credential, redacted in debug output and zeroized on drop
//! - [`Accessor`]: the non-secret handle to a token, safe to log
//! - [`TokenMetadata`]: everything known about a token except its value
//! - [`TokenRequest`]: parameters for issuing a token

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use warden_store::codec::{duration_secs, option_duration_secs};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Prefix carried by every Warden token.
pub const TOKEN_PREFIX: &str = "ws.";

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 32;

/// Number of random bytes in an accessor.
pub const ACCESSOR_BYTES: usize = 24;

/// Policy attached to every response-wrapping token.
pub const WRAPPING_POLICY: &str = "response-wrapping";

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    let encoded = URL_SAFE_NO_PAD.encode(&bytes);
    bytes.zeroize();
    encoded
}

/// A bearer token.
///
/// Holding the token is sufficient to act with its policies, so the value is
/// redacted from `Debug`, compared in constant time and zeroized on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Generates a new random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{TOKEN_PREFIX}{}", random_url_safe(TOKEN_BYTES)))
    }

    /// Wraps a token value presented by a caller.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

/// The non-secret handle to a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accessor(String);

impl Accessor {
    /// Generates a new random accessor.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_url_safe(ACCESSOR_BYTES))
    }

    /// Wraps an accessor value presented by a caller.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the accessor as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    /// Usable.
    Active,
    /// A single-use token that has been used.
    Consumed,
}

/// Everything stored about a token except its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// The token's accessor.
    pub accessor: Accessor,
    /// Policies the token carries.
    pub policies: Vec<String>,
    /// TTL granted at issue or last renewal.
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// When the token was issued.
    pub creation_time: DateTime<Utc>,
    /// When the token stops being valid.
    pub expire_time: DateTime<Utc>,
    /// Whether the TTL can be extended.
    pub renewable: bool,
    /// Whether the token can be used only once.
    pub single_use: bool,
    /// Current lifecycle state.
    pub state: TokenState,
    /// Operation that created the token.
    pub creation_path: String,
    /// Human-readable label.
    pub display_name: String,
    /// Hard cap on the token's lifetime measured from creation.
    #[serde(default, with = "option_duration_secs", skip_serializing_if = "Option::is_none")]
    pub explicit_max_ttl: Option<Duration>,
    /// Caller-supplied metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TokenMetadata {
    /// Returns true if the token's TTL has elapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_time <= now
    }

    /// Returns true if the token's TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if this is a response-wrapping token.
    #[must_use]
    pub fn is_wrapping(&self) -> bool {
        self.single_use && self.policies.iter().any(|p| p == WRAPPING_POLICY)
    }

    /// Time left before expiry at `now`, zero if already expired.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expire_time - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Parameters for issuing a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    /// Policies to attach.
    pub policies: Vec<String>,
    /// Requested TTL; `None` takes the configured default.
    pub ttl: Option<Duration>,
    /// Whether the token may be renewed.
    pub renewable: bool,
    /// Whether the token is consumed by its first use.
    pub single_use: bool,
    /// Operation that created the token.
    pub creation_path: String,
    /// Human-readable label.
    pub display_name: String,
    /// Hard cap on lifetime, measured from creation.
    pub explicit_max_ttl: Option<Duration>,
    /// Caller-supplied metadata.
    pub metadata: BTreeMap<String, String>,
}

impl TokenRequest {
    /// Creates a request carrying `policies`.
    #[must_use]
    pub fn new(policies: Vec<String>) -> Self {
        Self {
            policies,
            ..Self::default()
        }
    }

    /// Sets the requested TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Makes the token renewable.
    #[must_use]
    pub const fn renewable(mut self) -> Self {
        self.renewable = true;
        self
    }

    /// Makes the token single-use.
    #[must_use]
    pub const fn single_use(mut self) -> Self {
        self.single_use = true;
        self
    }

    /// Sets the creation path.
    #[must_use]
    pub fn with_creation_path(mut self, path: impl Into<String>) -> Self {
        self.creation_path = path.into();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets a hard lifetime cap.
    #[must_use]
    pub const fn with_explicit_max_ttl(mut self, ttl: Duration) -> Self {
        self.explicit_max_ttl = Some(ttl);
        self
    }

    /// Attaches caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The bearer value. Shown once.
    pub token: Token,
    /// The stored metadata, including the accessor.
    pub metadata: TokenMetadata,
}

impl IssuedToken {
    /// Returns the token's accessor.
    #[must_use]
    pub fn accessor(&self) -> &Accessor {
        &self.metadata.accessor
    }
}
