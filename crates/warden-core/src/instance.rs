//! The composed Warden instance.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warden_approle::Issuer;
use warden_policy::{validate_name, CallerContext, Policy, PolicyEngine, PolicyStore, ROOT_POLICY};
use warden_store::{
    codec, ErrorKind, ExpirySweep, FileStorage, MemoryStorage, ScopedStore, Storage, SweepReport,
};
use warden_token::{
    BarrierKey, Cubbyhole, IssuedToken, Salt, Token, TokenMetadata, TokenRegistry, TokenRequest,
    WrapInfo, WrapLookup, WrappingEngine,
};

use crate::config::WardenConfig;
use crate::error::{Error, Result};
use crate::keyfile;

/// Token metadata key holding the caller's default wrap TTL.
pub const DEFAULT_WRAP_TTL_METADATA: &str = "default_wrap_ttl";

/// File name of the store snapshot inside the data directory.
pub const STORE_FILE: &str = "store.json";

/// File name of the barrier key inside the data directory.
pub const KEY_FILE: &str = "barrier.key";

const MOUNT_PREFIX: &str = "auth/";

#[derive(Debug, Serialize, Deserialize)]
struct MountEntry {
    kind: String,
    created_at: DateTime<Utc>,
}

/// All Warden components wired over one storage backend.
pub struct Core {
    config: WardenConfig,
    storage: Arc<dyn Storage>,
    sys: ScopedStore,
    salt: Arc<Salt>,
    tokens: Arc<TokenRegistry>,
    cubbyhole: Arc<Cubbyhole>,
    wrapping: Arc<WrappingEngine>,
    policies: Arc<PolicyEngine>,
    mounts: RwLock<BTreeMap<String, Arc<Issuer>>>,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("mounts", &self.mounts())
            .finish_non_exhaustive()
    }
}

impl Core {
    /// Wires every component over `storage`.
    ///
    /// Loads or creates the salt, re-enables persisted mounts and enables the
    /// configured AppRole mount if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or storage fails.
    pub fn new(storage: Arc<dyn Storage>, barrier: BarrierKey, config: WardenConfig) -> Result<Self> {
        config.validate()?;

        let sys = ScopedStore::new(Arc::clone(&storage), "sys/")?;
        let salt = Arc::new(Salt::load_or_create(&sys)?);
        let tokens = Arc::new(TokenRegistry::new(
            sys.sub("token/")?,
            Arc::clone(&salt),
            config.token_limits(),
        ));
        let cubbyhole = Arc::new(Cubbyhole::new(
            ScopedStore::new(Arc::clone(&storage), "cubbyhole/")?,
            Arc::new(barrier),
        ));
        let wrapping = Arc::new(WrappingEngine::new(
            Arc::clone(&tokens),
            Arc::clone(&cubbyhole),
            config.wrapping_limits(),
        ));
        let policies = Arc::new(PolicyEngine::new(Arc::new(PolicyStore::new(
            sys.sub("policy/")?,
        ))));

        let core = Self {
            config,
            storage,
            sys,
            salt,
            tokens,
            cubbyhole,
            wrapping,
            policies,
            mounts: RwLock::new(BTreeMap::new()),
        };
        core.load_mounts()?;
        let mount = core.config.approle.mount.clone();
        core.ensure_mount(&mount)?;

        info!(mounts = ?core.mounts(), "Warden core ready");
        Ok(core)
    }

    /// Opens the instance described by `config`.
    ///
    /// With a data directory the store and barrier key are read from (or
    /// created in) it; without one all state is in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory, store or key cannot be opened.
    pub fn open(config: WardenConfig) -> Result<Self> {
        match config.storage.data_dir.clone() {
            Some(dir) => {
                fs::create_dir_all(&dir).map_err(|e| Error::file(&dir, e))?;
                let barrier = keyfile::load_or_create(&dir.join(KEY_FILE))?;
                let storage = Arc::new(FileStorage::open(dir.join(STORE_FILE))?);
                Self::new(storage, barrier, config)
            }
            None => Self::new(Arc::new(MemoryStorage::new()), BarrierKey::generate(), config),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Returns the token registry.
    #[must_use]
    pub const fn tokens(&self) -> &Arc<TokenRegistry> {
        &self.tokens
    }

    /// Returns the wrapping engine.
    #[must_use]
    pub const fn wrapping(&self) -> &Arc<WrappingEngine> {
        &self.wrapping
    }

    /// Returns the policy engine.
    #[must_use]
    pub const fn policies(&self) -> &Arc<PolicyEngine> {
        &self.policies
    }

    fn build_issuer(&self, mount: &str) -> Result<Arc<Issuer>> {
        let store = ScopedStore::new(Arc::clone(&self.storage), format!("{MOUNT_PREFIX}{mount}/"))?;
        let issuer = Issuer::new(
            mount,
            store,
            &self.salt,
            Arc::clone(&self.policies),
            Arc::clone(&self.tokens),
            Arc::clone(&self.wrapping),
        )?
        .with_default_token_ttl(self.config.approle.default_token_ttl);
        Ok(Arc::new(issuer))
    }

    fn load_mounts(&self) -> Result<()> {
        for mount in self.sys.list(MOUNT_PREFIX)? {
            let issuer = self.build_issuer(&mount)?;
            self.mounts.write().insert(mount, issuer);
        }
        Ok(())
    }

    /// Records the mount if absent. Returns true if this call created it.
    fn register_mount(&self, mount: &str) -> Result<bool> {
        let entry = MountEntry {
            kind: "approle".to_string(),
            created_at: Utc::now(),
        };
        Ok(self.sys.compare_and_swap(
            &format!("{MOUNT_PREFIX}{mount}"),
            None,
            Some(codec::encode(&entry)?),
        )?)
    }

    fn ensure_mount(&self, mount: &str) -> Result<Arc<Issuer>> {
        if let Some(issuer) = self.mounts.read().get(mount) {
            return Ok(Arc::clone(issuer));
        }
        if self.register_mount(mount)? {
            info!(mount, "Enabled approle mount");
        }
        let issuer = self.build_issuer(mount)?;
        Ok(Arc::clone(
            self.mounts
                .write()
                .entry(mount.to_string())
                .or_insert(issuer),
        ))
    }

    fn require_root(caller: &CallerContext) -> Result<()> {
        if caller.is_root() {
            Ok(())
        } else {
            debug!(caller = %caller.display_name, "Root required");
            Err(Error::PermissionDenied)
        }
    }

    /// Enables a new AppRole mount. Requires `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`], [`Error::MountExists`], or an
    /// error for an invalid name.
    pub fn enable_approle(&self, caller: &CallerContext, mount: &str) -> Result<Arc<Issuer>> {
        Self::require_root(caller)?;
        let mount = mount.trim().to_lowercase();
        validate_name(&mount)?;
        if !self.register_mount(&mount)? {
            return Err(Error::MountExists { mount });
        }
        info!(mount = %mount, caller = %caller.display_name, "Enabled approle mount");
        self.ensure_mount(&mount)
    }

    /// Returns the issuer for `mount`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such mount is enabled.
    pub fn approle(&self, mount: &str) -> Result<Arc<Issuer>> {
        self.mounts
            .read()
            .get(&mount.trim().to_lowercase())
            .cloned()
            .ok_or(Error::NotFound)
    }

    /// Returns the enabled mount names.
    #[must_use]
    pub fn mounts(&self) -> Vec<String> {
        self.mounts.read().keys().cloned().collect()
    }

    /// Issues a token holding the `root` policy.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn create_root_token(&self) -> Result<IssuedToken> {
        let issued = self.tokens.issue(
            TokenRequest::new(vec![ROOT_POLICY.to_string()])
                .with_ttl(self.config.token.max_ttl)
                .renewable()
                .with_creation_path("auth/token/root")
                .with_display_name(ROOT_POLICY),
        )?;
        info!(accessor = %issued.metadata.accessor, "Created root token");
        Ok(issued)
    }

    /// Issues a token on behalf of `caller`.
    ///
    /// Non-root callers may only attach policies they hold themselves.
    /// `default_wrap_ttl` is recorded on the token and applied to requests
    /// made with it that do not name a wrap TTL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for policies the caller lacks, or
    /// an error for invalid TTLs.
    pub fn create_token(
        &self,
        caller: &CallerContext,
        request: TokenRequest,
        default_wrap_ttl: Option<Duration>,
    ) -> Result<IssuedToken> {
        if !caller.is_root() && !request.policies.iter().all(|p| caller.policies.contains(p)) {
            debug!(caller = %caller.display_name, "Token policies exceed caller's");
            return Err(Error::PermissionDenied);
        }

        let mut request = request.with_creation_path("auth/token/create");
        if let Some(ttl) = default_wrap_ttl {
            if ttl.is_zero() {
                return Err(Error::InvalidArgument {
                    reason: "default wrap ttl must be positive".to_string(),
                });
            }
            request.metadata.insert(
                DEFAULT_WRAP_TTL_METADATA.to_string(),
                humantime::format_duration(ttl).to_string(),
            );
        }
        let issued = self.tokens.issue(request)?;
        info!(accessor = %issued.metadata.accessor, caller = %caller.display_name, "Created token");
        Ok(issued)
    }

    /// Resolves a bearer token into the caller it represents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for unknown, expired, consumed and
    /// wrapping tokens; storage failures propagate.
    pub fn caller(&self, token: &Token) -> Result<CallerContext> {
        let meta = match self.tokens.lookup(token) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Caller token not found");
                return Err(Error::PermissionDenied);
            }
            Err(e) => return Err(e.into()),
        };
        if meta.is_wrapping() {
            debug!(accessor = %meta.accessor, "Wrapping token used as caller token");
            return Err(Error::PermissionDenied);
        }

        let mut caller = CallerContext::new(meta.policies).with_display_name(meta.display_name);
        if let Some(raw) = meta.metadata.get(DEFAULT_WRAP_TTL_METADATA) {
            match humantime::parse_duration(raw) {
                Ok(ttl) => caller = caller.with_default_wrap_ttl(ttl),
                Err(e) => warn!(accessor = %meta.accessor, error = %e, "Ignoring malformed default wrap TTL"),
            }
        }
        Ok(caller)
    }

    /// Returns a live token's metadata.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown, expired or consumed tokens.
    pub fn lookup_token(&self, token: &Token) -> Result<TokenMetadata> {
        Ok(self.tokens.lookup(token)?)
    }

    /// Renews a token.
    ///
    /// # Errors
    ///
    /// See [`TokenRegistry::renew`].
    pub fn renew_token(&self, token: &Token, increment: Option<Duration>) -> Result<TokenMetadata> {
        Ok(self.tokens.renew(token, increment)?)
    }

    /// Revokes a token.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn revoke_token(&self, token: &Token) -> Result<()> {
        Ok(self.tokens.revoke(token)?)
    }

    /// Writes a policy. Requires `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or a policy validation error.
    pub fn put_policy(&self, caller: &CallerContext, policy: &Policy) -> Result<()> {
        Self::require_root(caller)?;
        Ok(self.policies.store().put(policy)?)
    }

    /// Reads a policy. Requires `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or a not-found error.
    pub fn read_policy(&self, caller: &CallerContext, name: &str) -> Result<Policy> {
        Self::require_root(caller)?;
        Ok(self.policies.store().get(name)?)
    }

    /// Deletes a policy. Requires `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or a not-found error.
    pub fn delete_policy(&self, caller: &CallerContext, name: &str) -> Result<()> {
        Self::require_root(caller)?;
        Ok(self.policies.store().delete(name)?)
    }

    /// Lists policy names. Requires `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or a storage error.
    pub fn list_policies(&self, caller: &CallerContext) -> Result<Vec<String>> {
        Self::require_root(caller)?;
        Ok(self.policies.store().list()?)
    }

    /// Unwraps a wrapping token. The token is the only credential needed.
    ///
    /// # Errors
    ///
    /// Returns a not-found error unless this is the first unwrap of a live
    /// wrapping token.
    pub fn unwrap(&self, token: &Token) -> Result<serde_json::Value> {
        Ok(self.wrapping.unwrap(token)?)
    }

    /// Looks up a wrapping token without consuming it.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the token is not a live wrapping token.
    pub fn lookup_wrapping(&self, token: &Token) -> Result<WrapLookup> {
        Ok(self.wrapping.lookup(token)?)
    }

    /// Moves a wrapped response to a fresh wrapping token.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the token is not a live wrapping token.
    pub fn rewrap(&self, token: &Token) -> Result<WrapInfo> {
        Ok(self.wrapping.rewrap(token)?)
    }

    fn sweepers(&self) -> Vec<Arc<dyn ExpirySweep>> {
        let mut sweepers: Vec<Arc<dyn ExpirySweep>> = vec![
            Arc::clone(&self.tokens) as Arc<dyn ExpirySweep>,
            Arc::clone(&self.cubbyhole) as Arc<dyn ExpirySweep>,
        ];
        sweepers.extend(
            self.mounts
                .read()
                .values()
                .map(|issuer| Arc::clone(issuer) as Arc<dyn ExpirySweep>),
        );
        sweepers
    }

    /// Runs one expiry pass over tokens, cubbyhole entries and every mount.
    pub fn sweep_once(&self) -> SweepReport {
        let mut total = SweepReport::default();
        for sweeper in self.sweepers() {
            let report = sweeper.sweep_expired();
            if report.is_clean() {
                debug!(component = sweeper.name(), scanned = report.scanned, "Sweep pass clean");
            } else {
                info!(
                    component = sweeper.name(),
                    scanned = report.scanned,
                    removed = report.removed,
                    failed = report.failed,
                    "Sweep pass"
                );
            }
            total += report;
        }
        total
    }
}
