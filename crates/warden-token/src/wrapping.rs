//! Response wrapping.
//!
//! A wrapped response is a single-use token whose cubbyhole holds the real
//! payload. The wrapping caller only ever sees the token, its accessor and the
//! accessor the payload will expose; the bearer of the token retrieves the
//! payload exactly once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warden_store::codec::duration_secs;

use crate::cubbyhole::{Cubbyhole, Envelope, Taken};
use crate::error::{Error, Result};
use crate::registry::TokenRegistry;
use crate::ttl::{expiry, TtlLimits};
use crate::types::{Accessor, IssuedToken, Token, TokenMetadata, TokenRequest, WRAPPING_POLICY};

/// Envelope metadata returned instead of a wrapped response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapInfo {
    /// The single-use wrapping token.
    pub token: Token,
    /// The wrapping token's own accessor.
    pub accessor: Accessor,
    /// The accessor exposed by the wrapped payload, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_accessor: Option<String>,
    /// Seconds until the wrapping token expires.
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// When the response was wrapped.
    pub creation_time: DateTime<Utc>,
    /// Operation whose response was wrapped.
    pub creation_path: String,
}

/// Non-consuming view of a live wrapping token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapLookup {
    /// When the response was wrapped.
    pub creation_time: DateTime<Utc>,
    /// TTL the wrapping token was created with.
    #[serde(with = "duration_secs")]
    pub creation_ttl: Duration,
    /// Operation whose response was wrapped.
    pub creation_path: String,
}

/// Parameters for wrapping one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapRequest {
    /// Requested TTL; `None` takes the configured default.
    pub ttl: Option<Duration>,
    /// Operation whose response is wrapped.
    pub creation_path: String,
    /// Accessor exposed by the payload.
    pub wrapped_accessor: Option<String>,
}

impl WrapRequest {
    /// Creates a request for a response of `creation_path`.
    #[must_use]
    pub fn new(creation_path: impl Into<String>) -> Self {
        Self {
            creation_path: creation_path.into(),
            ..Self::default()
        }
    }

    /// Sets the wrapping TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Records the accessor the payload will expose.
    #[must_use]
    pub fn with_wrapped_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.wrapped_accessor = Some(accessor.into());
        self
    }
}

/// Wraps responses into single-use tokens and unwraps them.
pub struct WrappingEngine {
    registry: Arc<TokenRegistry>,
    cubbyhole: Arc<Cubbyhole>,
    limits: TtlLimits,
}

/// Maps every "not there" outcome onto the single opaque [`Error::NotFound`].
fn opaque(err: Error) -> Error {
    match err.kind() {
        warden_store::ErrorKind::NotFound | warden_store::ErrorKind::Conflict => Error::NotFound,
        _ => err,
    }
}

impl WrappingEngine {
    /// Creates an engine issuing wrapping tokens from `registry`.
    #[must_use]
    pub fn new(registry: Arc<TokenRegistry>, cubbyhole: Arc<Cubbyhole>, limits: TtlLimits) -> Self {
        Self {
            registry,
            cubbyhole,
            limits,
        }
    }

    /// Returns the wrapping TTL limits.
    #[must_use]
    pub const fn limits(&self) -> &TtlLimits {
        &self.limits
    }

    /// Wraps `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a zero TTL, or an error if the
    /// token or the cubbyhole entry cannot be created. Nothing is left behind
    /// on failure.
    pub fn wrap<T: Serialize>(&self, payload: &T, request: WrapRequest) -> Result<WrapInfo> {
        let ttl = self.limits.resolve(request.ttl)?;
        let bytes = zeroize::Zeroizing::new(
            serde_json::to_vec(payload).map_err(|e| Error::invalid(format!("unserializable payload: {e}")))?,
        );
        self.wrap_bytes(&bytes, ttl, request.creation_path, request.wrapped_accessor)
    }

    fn wrap_bytes(
        &self,
        payload: &[u8],
        ttl: Duration,
        creation_path: String,
        wrapped_accessor: Option<String>,
    ) -> Result<WrapInfo> {
        let issued = self.registry.issue(
            TokenRequest::new(vec![WRAPPING_POLICY.to_string()])
                .with_ttl(ttl)
                .single_use()
                .with_creation_path(creation_path.clone())
                .with_display_name(WRAPPING_POLICY),
        )?;
        let IssuedToken { token, metadata } = issued;

        let hash = self.registry.token_hash(&token);
        let envelope = Envelope {
            creation_time: metadata.creation_time,
            expire_time: expiry(metadata.creation_time, metadata.ttl)?,
            ttl: metadata.ttl,
            creation_path: creation_path.clone(),
            wrapped_accessor: wrapped_accessor.clone(),
        };
        if let Err(e) = self.cubbyhole.store(&hash, payload, envelope) {
            if let Err(revoke_err) = self.registry.revoke_hash(&hash) {
                warn!(error = %revoke_err, "Failed to revoke wrapping token after failed wrap");
            }
            return Err(e);
        }

        info!(
            accessor = %metadata.accessor,
            wrapped_accessor = wrapped_accessor.as_deref().unwrap_or(""),
            creation_path = %creation_path,
            ttl_secs = metadata.ttl.as_secs(),
            "Wrapped response"
        );
        Ok(WrapInfo {
            token,
            accessor: metadata.accessor,
            wrapped_accessor,
            ttl: metadata.ttl,
            creation_time: metadata.creation_time,
            creation_path,
        })
    }

    /// Consumes the token and takes its cubbyhole payload.
    ///
    /// On an internal failure while taking the payload the token is
    /// reactivated so the bearer can retry.
    fn consume_and_take(&self, token: &Token) -> Result<(TokenMetadata, Taken)> {
        let meta = self.registry.consume(token).map_err(opaque)?;
        if !meta.is_wrapping() {
            // Single-use but not a wrapping token; leave it usable
            if let Err(e) = self.registry.reactivate(token) {
                warn!(error = %e, "Failed to reactivate non-wrapping token");
            }
            return Err(Error::NotFound);
        }

        let hash = self.registry.token_hash(token);
        match self.cubbyhole.take(&hash) {
            Ok(taken) => Ok((meta, taken)),
            Err(e) if e.kind() == warden_store::ErrorKind::NotFound => {
                self.finish(token);
                Err(Error::NotFound)
            }
            Err(e) => {
                warn!(accessor = %meta.accessor, error = %e, "Unwrap failed, reactivating wrapping token");
                if let Err(reactivate_err) = self.registry.reactivate(token) {
                    warn!(error = %reactivate_err, "Failed to reactivate wrapping token");
                }
                Err(e)
            }
        }
    }

    fn finish(&self, token: &Token) {
        if let Err(e) = self.registry.revoke(token) {
            warn!(error = %e, "Failed to revoke used wrapping token");
        }
    }

    /// Unwraps the payload held by a wrapping token.
    ///
    /// Succeeds at most once per token. Unknown, expired and already used
    /// tokens all fail with the same [`Error::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] as described, or an internal error if
    /// storage fails.
    pub fn unwrap(&self, token: &Token) -> Result<serde_json::Value> {
        self.unwrap_as(token)
    }

    /// Unwraps and decodes the payload into `T`.
    ///
    /// # Errors
    ///
    /// As [`WrappingEngine::unwrap`], plus an encryption error if the payload
    /// does not decode as `T`.
    pub fn unwrap_as<T: DeserializeOwned>(&self, token: &Token) -> Result<T> {
        let (meta, taken) = self.consume_and_take(token)?;
        self.finish(token);

        info!(accessor = %meta.accessor, creation_path = %taken.envelope.creation_path, "Unwrapped response");
        serde_json::from_slice(&taken.payload).map_err(|e| Error::Encryption {
            reason: format!("wrapped payload is not valid: {e}"),
        })
    }

    /// Returns metadata about a live wrapping token without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the token is not a live wrapping token.
    pub fn lookup(&self, token: &Token) -> Result<WrapLookup> {
        let meta = self.registry.lookup(token).map_err(opaque)?;
        if !meta.is_wrapping() {
            return Err(Error::NotFound);
        }
        let envelope = self
            .cubbyhole
            .peek(&self.registry.token_hash(token))
            .map_err(opaque)?;
        debug!(accessor = %meta.accessor, "Looked up wrapping token");
        Ok(WrapLookup {
            creation_time: envelope.creation_time,
            creation_ttl: envelope.ttl,
            creation_path: envelope.creation_path,
        })
    }

    /// Moves a wrapped payload to a fresh wrapping token.
    ///
    /// The old token is consumed. The new token keeps the original TTL,
    /// creation path and wrapped accessor. If the new token cannot be
    /// created the old token and its payload are restored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the token is not a live wrapping token,
    /// or an internal error if storage fails.
    pub fn rewrap(&self, token: &Token) -> Result<WrapInfo> {
        let (meta, taken) = self.consume_and_take(token)?;
        let envelope = taken.envelope.clone();

        match self.wrap_bytes(
            &taken.payload,
            envelope.ttl,
            envelope.creation_path.clone(),
            envelope.wrapped_accessor.clone(),
        ) {
            Ok(info) => {
                self.finish(token);
                info!(old_accessor = %meta.accessor, accessor = %info.accessor, "Rewrapped response");
                Ok(info)
            }
            Err(e) => {
                warn!(accessor = %meta.accessor, error = %e, "Rewrap failed, restoring original");
                let hash = self.registry.token_hash(token);
                if let Err(restore_err) = self.cubbyhole.restore(&hash, &taken) {
                    warn!(error = %restore_err, "Failed to restore wrapped payload");
                } else if let Err(reactivate_err) = self.registry.reactivate(token) {
                    warn!(error = %reactivate_err, "Failed to reactivate wrapping token");
                }
                Err(e)
            }
        }
    }

    /// Returns the metadata of the wrapping token behind `accessor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the accessor does not name a live
    /// wrapping token.
    pub fn lookup_accessor(&self, accessor: &Accessor) -> Result<TokenMetadata> {
        let meta = self.registry.lookup_accessor(accessor).map_err(opaque)?;
        if !meta.is_wrapping() {
            return Err(Error::NotFound);
        }
        Ok(meta)
    }

    /// Revokes the wrapping token behind `accessor` and destroys its payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the accessor does not name a wrapping
    /// token.
    pub fn revoke_accessor(&self, accessor: &Accessor) -> Result<()> {
        let hash = self.registry.resolve_accessor(accessor).map_err(opaque)?;
        let meta = self.registry.lookup_hash(&hash).map_err(opaque)?;
        if !meta.is_wrapping() {
            return Err(Error::NotFound);
        }
        self.cubbyhole.destroy(&hash)?;
        self.registry.revoke_hash(&hash)?;
        info!(accessor = %accessor, "Revoked wrapping token");
        Ok(())
    }
}

impl std::fmt::Debug for WrappingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappingEngine")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
