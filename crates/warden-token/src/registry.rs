//! The token/accessor registry.
//!
//! Tokens are stored under `id/<hash(token)>` and indexed by accessor under
//! `accessor/<hash(accessor)>`. The token value itself is never persisted, so
//! the accessor index only ever resolves to a hash.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warden_store::{codec, ExpirySweep, ScopedStore, SweepReport};

use crate::error::{Error, Result};
use crate::salt::Salt;
use crate::ttl::{expiry, TtlLimits};
use crate::types::{Accessor, IssuedToken, Token, TokenMetadata, TokenRequest, TokenState};

const ID_PREFIX: &str = "id/";
const ACCESSOR_PREFIX: &str = "accessor/";

#[derive(Debug, Serialize, Deserialize)]
struct AccessorEntry {
    token_hash: String,
}

/// A token entry read from storage along with the bytes it was decoded from.
struct Loaded {
    hash: String,
    meta: TokenMetadata,
    raw: Vec<u8>,
}

/// Issues, resolves, renews and revokes tokens.
pub struct TokenRegistry {
    store: ScopedStore,
    salt: Arc<Salt>,
    limits: TtlLimits,
}

impl TokenRegistry {
    /// Creates a registry over `store`, which should be scoped to `sys/token/`.
    #[must_use]
    pub fn new(store: ScopedStore, salt: Arc<Salt>, limits: TtlLimits) -> Self {
        Self { store, salt, limits }
    }

    /// Returns the TTL limits applied to issued tokens.
    #[must_use]
    pub const fn limits(&self) -> &TtlLimits {
        &self.limits
    }

    /// Returns the storage hash of a token.
    #[must_use]
    pub fn token_hash(&self, token: &Token) -> String {
        self.salt.hash(token.expose())
    }

    fn id_path(hash: &str) -> String {
        format!("{ID_PREFIX}{hash}")
    }

    fn accessor_path(&self, accessor: &Accessor) -> String {
        format!("{ACCESSOR_PREFIX}{}", self.salt.hash(accessor.as_str()))
    }

    /// Issues a new token.
    ///
    /// The token entry and its accessor index are written together; if the
    /// index cannot be written the entry is removed again.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero TTL or if storage fails.
    pub fn issue(&self, request: TokenRequest) -> Result<IssuedToken> {
        let mut ttl = self.limits.resolve(request.ttl)?;
        if let Some(cap) = request.explicit_max_ttl {
            if cap.is_zero() {
                return Err(Error::invalid("explicit max ttl must be positive"));
            }
            ttl = ttl.min(cap);
        }

        let now = Utc::now();
        let token = Token::generate();
        let hash = self.token_hash(&token);
        let metadata = TokenMetadata {
            accessor: Accessor::generate(),
            policies: request.policies,
            ttl,
            creation_time: now,
            expire_time: expiry(now, ttl)?,
            renewable: request.renewable && !request.single_use,
            single_use: request.single_use,
            state: TokenState::Active,
            creation_path: request.creation_path,
            display_name: request.display_name,
            explicit_max_ttl: request.explicit_max_ttl,
            metadata: request.metadata,
        };

        let id_path = Self::id_path(&hash);
        if !self
            .store
            .compare_and_swap(&id_path, None, Some(codec::encode(&metadata)?))?
        {
            return Err(Error::conflict("token collision"));
        }

        let index = codec::encode(&AccessorEntry {
            token_hash: hash.clone(),
        })?;
        let indexed = self
            .store
            .compare_and_swap(&self.accessor_path(&metadata.accessor), None, Some(index));
        match indexed {
            Ok(true) => {}
            Ok(false) => {
                self.discard(&id_path);
                return Err(Error::conflict("accessor collision"));
            }
            Err(e) => {
                self.discard(&id_path);
                return Err(e.into());
            }
        }

        debug!(
            accessor = %metadata.accessor,
            creation_path = %metadata.creation_path,
            single_use = metadata.single_use,
            ttl_secs = ttl.as_secs(),
            "Issued token"
        );
        Ok(IssuedToken { token, metadata })
    }

    fn discard(&self, id_path: &str) {
        if let Err(e) = self.store.delete(id_path) {
            warn!(error = %e, "Failed to roll back token entry");
        }
    }

    fn load(&self, hash: &str) -> Result<Option<Loaded>> {
        Ok(self
            .store
            .get_json::<TokenMetadata>(&Self::id_path(hash))?
            .map(|(meta, raw)| Loaded {
                hash: hash.to_string(),
                meta,
                raw,
            }))
    }

    /// Loads an unexpired entry. Consumed entries are returned as-is.
    fn load_unexpired(&self, hash: &str) -> Result<Loaded> {
        let loaded = self.load(hash)?.ok_or(Error::NotFound)?;
        if loaded.meta.is_expired() {
            debug!(accessor = %loaded.meta.accessor, "Token expired");
            return Err(Error::NotFound);
        }
        Ok(loaded)
    }

    fn load_live(&self, hash: &str) -> Result<Loaded> {
        let loaded = self.load_unexpired(hash)?;
        if loaded.meta.state == TokenState::Consumed {
            return Err(Error::AlreadyConsumed);
        }
        Ok(loaded)
    }

    pub(crate) fn resolve_accessor(&self, accessor: &Accessor) -> Result<String> {
        let (entry, _) = self
            .store
            .get_json::<AccessorEntry>(&self.accessor_path(accessor))?
            .ok_or(Error::NotFound)?;
        Ok(entry.token_hash)
    }

    /// Returns the metadata of a live token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown or expired tokens and
    /// [`Error::AlreadyConsumed`] for used single-use tokens.
    pub fn lookup(&self, token: &Token) -> Result<TokenMetadata> {
        self.lookup_hash(&self.token_hash(token))
    }

    pub(crate) fn lookup_hash(&self, hash: &str) -> Result<TokenMetadata> {
        Ok(self.load_live(hash)?.meta)
    }

    /// Returns the metadata of the live token behind `accessor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the accessor is unknown or its token is
    /// expired or consumed.
    pub fn lookup_accessor(&self, accessor: &Accessor) -> Result<TokenMetadata> {
        let hash = self.resolve_accessor(accessor)?;
        match self.load_live(&hash) {
            Ok(loaded) => Ok(loaded.meta),
            Err(Error::AlreadyConsumed) => Err(Error::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Revokes a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the token does not exist.
    pub fn revoke(&self, token: &Token) -> Result<()> {
        self.revoke_hash(&self.token_hash(token))
    }

    /// Revokes the token behind `accessor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the accessor is unknown.
    pub fn revoke_accessor(&self, accessor: &Accessor) -> Result<()> {
        let hash = self.resolve_accessor(accessor)?;
        self.revoke_hash(&hash)
    }

    pub(crate) fn revoke_hash(&self, hash: &str) -> Result<()> {
        let loaded = self.load(hash)?.ok_or(Error::NotFound)?;
        self.remove(&loaded)?;
        info!(accessor = %loaded.meta.accessor, "Revoked token");
        Ok(())
    }

    fn remove(&self, loaded: &Loaded) -> Result<()> {
        self.store.delete(&self.accessor_path(&loaded.meta.accessor))?;
        self.store.delete(&Self::id_path(&loaded.hash))?;
        Ok(())
    }

    /// Extends a token's TTL.
    ///
    /// The new TTL defaults to the token's current TTL, is capped at the
    /// configured maximum, and the resulting expiry never passes the token's
    /// explicit max TTL or the configured maximum measured from creation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the token is single-use, consumed or not
    /// renewable, and [`Error::NotFound`] if it is unknown or expired.
    pub fn renew(&self, token: &Token, increment: Option<Duration>) -> Result<TokenMetadata> {
        let hash = self.token_hash(token);
        loop {
            let loaded = self.load_unexpired(&hash)?;
            let meta = &loaded.meta;
            if meta.single_use || meta.state == TokenState::Consumed {
                return Err(Error::conflict("single-use tokens cannot be renewed"));
            }
            if !meta.renewable {
                return Err(Error::conflict("token is not renewable"));
            }

            let ttl = self.limits.resolve(increment.or(Some(meta.ttl)))?;
            let cap = meta
                .explicit_max_ttl
                .map_or(self.limits.max_ttl, |explicit| explicit.min(self.limits.max_ttl));
            let now = Utc::now();
            let expire_time = expiry(now, ttl)?.min(expiry(meta.creation_time, cap)?);

            let mut renewed = meta.clone();
            renewed.ttl = (expire_time - now).to_std().unwrap_or(Duration::ZERO);
            renewed.expire_time = expire_time;

            if self.store.compare_and_swap(
                &Self::id_path(&hash),
                Some(&loaded.raw),
                Some(codec::encode(&renewed)?),
            )? {
                debug!(accessor = %renewed.accessor, ttl_secs = renewed.ttl.as_secs(), "Renewed token");
                return Ok(renewed);
            }
        }
    }

    /// Marks a single-use token as consumed.
    ///
    /// Exactly one of any number of concurrent callers succeeds; every other
    /// caller gets [`Error::AlreadyConsumed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the token is unknown or expired,
    /// [`Error::AlreadyConsumed`] if it was already used, and
    /// [`Error::Conflict`] if it is not single-use.
    pub fn consume(&self, token: &Token) -> Result<TokenMetadata> {
        let hash = self.token_hash(token);
        let loaded = self.load_live(&hash)?;
        if !loaded.meta.single_use {
            return Err(Error::conflict("token is not single-use"));
        }

        let mut consumed = loaded.meta.clone();
        consumed.state = TokenState::Consumed;
        if !self.store.compare_and_swap(
            &Self::id_path(&hash),
            Some(&loaded.raw),
            Some(codec::encode(&consumed)?),
        )? {
            return Err(Error::AlreadyConsumed);
        }
        Ok(consumed)
    }

    /// Returns a consumed token to the active state.
    ///
    /// Used to roll back a multi-step operation that consumed the token but
    /// could not complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the token is gone or expired and
    /// [`Error::Conflict`] if it is not in the consumed state.
    pub fn reactivate(&self, token: &Token) -> Result<()> {
        let hash = self.token_hash(token);
        let loaded = self.load_unexpired(&hash)?;
        if loaded.meta.state != TokenState::Consumed {
            return Err(Error::conflict("token is not consumed"));
        }

        let mut active = loaded.meta.clone();
        active.state = TokenState::Active;
        if !self.store.compare_and_swap(
            &Self::id_path(&hash),
            Some(&loaded.raw),
            Some(codec::encode(&active)?),
        )? {
            return Err(Error::conflict("token changed concurrently"));
        }
        warn!(accessor = %active.accessor, "Reactivated consumed token");
        Ok(())
    }

    fn sweep_entry(&self, hash: &str, report: &mut SweepReport) -> Result<()> {
        let Some(loaded) = self.load(hash)? else {
            return Ok(());
        };
        if loaded.meta.is_expired() {
            self.remove(&loaded)?;
            report.removed += 1;
        }
        Ok(())
    }
}

impl ExpirySweep for TokenRegistry {
    fn name(&self) -> &str {
        "tokens"
    }

    fn sweep_expired(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let hashes = match self.store.list(ID_PREFIX) {
            Ok(hashes) => hashes,
            Err(e) => {
                warn!(error = %e, "Failed to list tokens for sweep");
                report.failed += 1;
                return report;
            }
        };

        for hash in hashes {
            report.scanned += 1;
            if let Err(e) = self.sweep_entry(&hash, &mut report) {
                warn!(error = %e, "Failed to sweep token");
                report.failed += 1;
            }
        }
        report
    }
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("store", &self.store)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use warden_store::{ErrorKind, FaultOp, FaultyStorage, MemoryStorage, Storage};

    fn registry_with(limits: TtlLimits) -> (TokenRegistry, Arc<MemoryStorage>) {
        let backend = Arc::new(MemoryStorage::new());
        let store = ScopedStore::new(backend.clone(), "sys/token/").expect("prefix");
        (
            TokenRegistry::new(store, Arc::new(Salt::generate()), limits),
            backend,
        )
    }

    fn registry() -> TokenRegistry {
        registry_with(TtlLimits::new(
            Duration::from_secs(3600),
            Duration::from_secs(7200),
        ))
        .0
    }

    fn policies(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn issue_and_lookup() {
        let registry = registry();
        let issued = registry
            .issue(TokenRequest::new(policies(&["default"])).renewable())
            .expect("issue");

        let meta = registry.lookup(&issued.token).expect("lookup");
        assert_eq!(meta.policies, policies(&["default"]));
        assert_eq!(meta.ttl, Duration::from_secs(3600));
        assert_eq!(&meta.accessor, issued.accessor());

        let by_accessor = registry.lookup_accessor(issued.accessor()).expect("lookup accessor");
        assert_eq!(by_accessor, meta);
    }

    #[test]
    fn raw_values_never_stored() {
        let (registry, backend) = registry_with(TtlLimits::new(
            Duration::from_secs(60),
            Duration::from_secs(60),
        ));
        let issued = registry.issue(TokenRequest::default()).expect("issue");

        for (key, value) in backend.snapshot() {
            assert!(!key.contains(issued.token.expose()));
            assert!(!key.contains(issued.accessor().as_str()));
            let text = String::from_utf8_lossy(&value);
            assert!(!text.contains(issued.token.expose()));
        }
    }

    #[test]
    fn ttl_is_capped_and_zero_rejected() {
        let registry = registry();
        let issued = registry
            .issue(TokenRequest::default().with_ttl(Duration::from_secs(100_000)))
            .expect("issue");
        assert_eq!(issued.metadata.ttl, Duration::from_secs(7200));

        let err = registry
            .issue(TokenRequest::default().with_ttl(Duration::ZERO))
            .expect_err("zero ttl");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let issued = registry
            .issue(TokenRequest::default().with_explicit_max_ttl(Duration::from_secs(10)))
            .expect("issue");
        assert_eq!(issued.metadata.ttl, Duration::from_secs(10));
    }

    #[test]
    fn unknown_token_not_found() {
        let registry = registry();
        let err = registry.lookup(&Token::new("ws.nope")).expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(registry.lookup_accessor(&Accessor::new("nope")).is_err());
        assert!(registry.revoke(&Token::new("ws.nope")).is_err());
    }

    #[test]
    fn revoke_by_token_and_accessor() {
        let registry = registry();
        let a = registry.issue(TokenRequest::default()).expect("issue");
        let b = registry.issue(TokenRequest::default()).expect("issue");

        registry.revoke(&a.token).expect("revoke");
        assert!(registry.lookup(&a.token).is_err());
        assert!(registry.lookup_accessor(a.accessor()).is_err());

        registry.revoke_accessor(b.accessor()).expect("revoke accessor");
        assert!(registry.lookup(&b.token).is_err());
    }

    #[test]
    fn consume_is_single_shot() {
        let registry = registry();
        let issued = registry
            .issue(TokenRequest::default().single_use())
            .expect("issue");

        let meta = registry.consume(&issued.token).expect("first consume");
        assert_eq!(meta.state, TokenState::Consumed);

        let err = registry.consume(&issued.token).expect_err("second consume");
        assert!(matches!(err, Error::AlreadyConsumed));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert!(matches!(
            registry.lookup(&issued.token),
            Err(Error::AlreadyConsumed)
        ));
    }

    #[test]
    fn consume_requires_single_use() {
        let registry = registry();
        let issued = registry.issue(TokenRequest::default()).expect("issue");
        let err = registry.consume(&issued.token).expect_err("not single use");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(registry.lookup(&issued.token).is_ok());
    }

    fn faulty_registry() -> (TokenRegistry, Arc<FaultyStorage>) {
        let backend = Arc::new(FaultyStorage::new());
        let store = ScopedStore::new(backend.clone(), "sys/token/").expect("prefix");
        let limits = TtlLimits::new(Duration::from_secs(3600), Duration::from_secs(7200));
        (
            TokenRegistry::new(store, Arc::new(Salt::generate()), limits),
            backend,
        )
    }

    #[test]
    fn issue_rolls_back_entry_when_index_write_fails() {
        let (registry, backend) = faulty_registry();
        backend.fail(FaultOp::Write, "sys/token/accessor/");

        let err = registry
            .issue(TokenRequest::new(vec!["ops".into()]))
            .expect_err("index write fails");
        assert_eq!(err.kind(), ErrorKind::Internal);

        backend.heal();
        assert!(backend.inner().list_prefix("sys/token/id/").expect("list").is_empty());
        assert!(backend.inner().list_prefix("sys/token/accessor/").expect("list").is_empty());
    }

    #[test]
    fn sweep_counts_failures_and_keeps_going() {
        let (registry, backend) = faulty_registry();
        for _ in 0..3 {
            registry
                .issue(TokenRequest::new(vec!["ops".into()]).with_ttl(Duration::from_secs(1)))
                .expect("issue");
        }
        thread::sleep(Duration::from_millis(1100));

        backend.fail_times(FaultOp::Write, "sys/token/", 1);
        let report = registry.sweep_expired();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.removed, 2);

        let report = registry.sweep_expired();
        assert_eq!((report.removed, report.failed), (1, 0));
        assert!(backend.inner().list_prefix("sys/token/").expect("list").is_empty());
    }

    #[test]
    fn sweep_reports_unlistable_store() {
        let (registry, backend) = faulty_registry();
        backend.fail(FaultOp::Read, "sys/token/id/");
        let report = registry.sweep_expired();
        assert_eq!(report.failed, 1);
        assert_eq!(report.scanned, 0);
    }

    #[test]
    fn reactivate_restores_consumed_token() {
        let registry = registry();
        let issued = registry
            .issue(TokenRequest::default().single_use())
            .expect("issue");

        registry.consume(&issued.token).expect("consume");
        registry.reactivate(&issued.token).expect("reactivate");
        registry.consume(&issued.token).expect("consume again");

        registry.reactivate(&issued.token).expect("reactivate");
        assert!(registry.reactivate(&issued.token).is_err());
    }

    #[test]
    fn concurrent_consume_has_one_winner() {
        let registry = Arc::new(registry());
        let issued = registry
            .issue(TokenRequest::default().single_use())
            .expect("issue");

        let workers = 12;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let token = issued.token.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.consume(&token).is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("thread should complete"))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn renew_rules() {
        let registry = registry();

        let single = registry
            .issue(TokenRequest::default().single_use().renewable())
            .expect("issue");
        assert!(!single.metadata.renewable);
        let err = registry.renew(&single.token, None).expect_err("single use");
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let fixed = registry.issue(TokenRequest::default()).expect("issue");
        let err = registry.renew(&fixed.token, None).expect_err("not renewable");
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let renewable = registry
            .issue(
                TokenRequest::default()
                    .with_ttl(Duration::from_secs(60))
                    .renewable(),
            )
            .expect("issue");
        let renewed = registry
            .renew(&renewable.token, Some(Duration::from_secs(600)))
            .expect("renew");
        assert!(renewed.expire_time > renewable.metadata.expire_time);
        assert!(renewed.ttl <= Duration::from_secs(600));
    }

    #[test]
    fn renew_respects_explicit_max() {
        let registry = registry();
        let issued = registry
            .issue(
                TokenRequest::default()
                    .renewable()
                    .with_ttl(Duration::from_secs(30))
                    .with_explicit_max_ttl(Duration::from_secs(60)),
            )
            .expect("issue");

        let renewed = registry
            .renew(&issued.token, Some(Duration::from_secs(3600)))
            .expect("renew");
        let lifetime = renewed.expire_time - issued.metadata.creation_time;
        assert!(lifetime <= chrono::Duration::seconds(60));
    }

    #[test]
    fn expired_tokens_are_invisible_and_swept() {
        let registry = registry();
        let short = registry
            .issue(TokenRequest::default().with_ttl(Duration::from_secs(1)))
            .expect("issue");
        let long = registry.issue(TokenRequest::default()).expect("issue");

        thread::sleep(Duration::from_millis(1100));

        let err = registry.lookup(&short.token).expect_err("expired");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(registry.lookup_accessor(short.accessor()).is_err());

        let report = registry.sweep_expired();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.removed, 1);
        assert_eq!(report.failed, 0);
        assert!(registry.lookup(&long.token).is_ok());
        assert!(registry.resolve_accessor(short.accessor()).is_err());
    }
}
