//! Secret identifier records and response shapes.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use warden_policy::RoleName;
use warden_store::codec::option_duration_secs;
use warden_token::WrapInfo;

/// A stored secret-id. The value itself is only present as the storage key hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SecretIdEntry {
    pub role_name: RoleName,
    pub secret_id_accessor: String,
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
    pub last_updated_time: DateTime<Utc>,
    /// Remaining logins; `None` is unlimited.
    #[serde(default)]
    pub remaining_uses: Option<u32>,
    #[serde(default)]
    pub cidr_list: Vec<IpNet>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SecretIdEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|at| at <= now)
    }
}

/// Index from a secret-id accessor to the secret-id's storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AccessorEntry {
    pub role_name: RoleName,
    pub role_hmac: String,
    pub secret_id_hmac: String,
}

/// Why a secret-id value is permanently dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TombstoneReason {
    Exhausted,
    Revoked,
    Expired,
}

/// Marker that a secret-id value can never be used again for its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Tombstone {
    pub secret_id_accessor: String,
    pub reason: TombstoneReason,
    pub created_at: DateTime<Utc>,
}

/// Options for issuing a secret-id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretIdRequest {
    /// Caller metadata stored with the secret-id.
    pub metadata: BTreeMap<String, String>,
    /// Client CIDRs allowed to use this secret-id; must lie within the role's.
    pub cidr_list: Vec<String>,
    /// Wrap the response with this TTL instead of returning it directly.
    #[serde(with = "option_duration_secs")]
    pub wrap_ttl: Option<Duration>,
}

impl SecretIdRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a wrapped response.
    #[must_use]
    pub const fn wrapped(mut self, ttl: Duration) -> Self {
        self.wrap_ttl = Some(ttl);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Restricts the secret-id to client CIDRs.
    #[must_use]
    pub fn with_cidrs<I, S>(mut self, cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cidr_list = cidrs.into_iter().map(Into::into).collect();
        self
    }
}

/// The raw secret-id response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretIdPayload {
    /// The secret value. Shown once.
    pub secret_id: String,
    /// Non-secret handle to the secret-id.
    pub secret_id_accessor: String,
    /// Seconds until the secret-id expires; 0 if it never does.
    pub secret_id_ttl: u64,
    /// Logins allowed; 0 if unlimited.
    pub secret_id_num_uses: u32,
}

impl fmt::Debug for SecretIdPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretIdPayload")
            .field("secret_id", &"[REDACTED]")
            .field("secret_id_accessor", &self.secret_id_accessor)
            .field("secret_id_ttl", &self.secret_id_ttl)
            .field("secret_id_num_uses", &self.secret_id_num_uses)
            .finish()
    }
}

/// Response to a secret-id issuance: either the payload or its wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretIdResponse {
    /// The wrapped response. Never carries the secret value.
    Wrapped {
        /// Envelope metadata; the payload is retrieved by unwrapping.
        wrap_info: WrapInfo,
    },
    /// The secret-id itself.
    Raw(SecretIdPayload),
}

impl SecretIdResponse {
    /// Returns the secret-id accessor, which is visible in both variants.
    #[must_use]
    pub fn accessor(&self) -> Option<&str> {
        match self {
            Self::Raw(payload) => Some(&payload.secret_id_accessor),
            Self::Wrapped { wrap_info } => wrap_info.wrapped_accessor.as_deref(),
        }
    }

    /// Returns the wrap envelope, if the response was wrapped.
    #[must_use]
    pub const fn wrap_info(&self) -> Option<&WrapInfo> {
        match self {
            Self::Wrapped { wrap_info } => Some(wrap_info),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw payload, if the response was not wrapped.
    #[must_use]
    pub const fn payload(&self) -> Option<&SecretIdPayload> {
        match self {
            Self::Raw(payload) => Some(payload),
            Self::Wrapped { .. } => None,
        }
    }
}

/// What an accessor lookup reveals about a secret-id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretIdInfo {
    /// The accessor looked up.
    pub secret_id_accessor: String,
    /// Owning role.
    pub role_name: RoleName,
    /// When the secret-id was issued.
    pub creation_time: DateTime<Utc>,
    /// When it expires, if ever.
    pub expiration_time: Option<DateTime<Utc>>,
    /// When its use count last changed.
    pub last_updated_time: DateTime<Utc>,
    /// Remaining logins; 0 if unlimited.
    pub secret_id_num_uses: u32,
    /// Bound client CIDRs.
    pub cidr_list: Vec<IpNet>,
    /// Caller metadata.
    pub metadata: BTreeMap<String, String>,
}

impl SecretIdInfo {
    pub(crate) fn from_entry(entry: SecretIdEntry) -> Self {
        Self {
            secret_id_accessor: entry.secret_id_accessor,
            role_name: entry.role_name,
            creation_time: entry.creation_time,
            expiration_time: entry.expiration_time,
            last_updated_time: entry.last_updated_time,
            secret_id_num_uses: entry.remaining_uses.unwrap_or(0),
            cidr_list: entry.cidr_list,
            metadata: entry.metadata,
        }
    }
}
