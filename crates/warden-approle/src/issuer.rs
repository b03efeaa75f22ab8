//! The role and secret-id issuer for one auth mount.
//!
//! Storage layout under `auth/<mount>/`:
//!
//! - `role/<name>` holds the [`Role`]
//! - `secret_id/<hash(role)>/<hash(secret_id)>` holds a secret-id entry
//! - `accessor/<hash(accessor)>` points an accessor at its secret-id entry
//! - `tombstone/<hash(role)>/<hash(secret_id)>` marks a value that may never
//!   be used again
//!
//! Hashes are keyed by a salt derived for the mount, so identical values on
//! two mounts land on unrelated paths.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_policy::{validate_name, Action, CallerContext, PolicyEngine, RoleName, ROOT_POLICY};
use warden_store::{codec, ExpirySweep, ScopedStore, SweepReport};
use warden_token::ttl::expiry;
use warden_token::{Accessor, Salt, Token, TokenRegistry, TokenRequest, WrapRequest, WrappingEngine};

use crate::cidr::{allows, ensure_subset, parse_cidrs};
use crate::error::{Error, Result};
use crate::role::{Role, RoleRequest};
use crate::secret_id::{
    AccessorEntry, SecretIdEntry, SecretIdInfo, SecretIdPayload, SecretIdRequest,
    SecretIdResponse, Tombstone, TombstoneReason,
};

const ROLE_PREFIX: &str = "role/";
const SECRET_ID_PREFIX: &str = "secret_id/";
const ACCESSOR_PREFIX: &str = "accessor/";
const TOMBSTONE_PREFIX: &str = "tombstone/";

/// Metadata key carrying the role name on tokens minted at login.
pub const ROLE_NAME_METADATA: &str = "role_name";

/// The result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The new client token.
    pub client_token: Token,
    /// Accessor of the client token.
    pub accessor: Accessor,
    /// Policies attached to the client token.
    pub policies: Vec<String>,
    /// Token lifetime in seconds.
    pub lease_duration: u64,
    /// Whether the token can be renewed.
    pub renewable: bool,
    /// Token metadata, including the role name.
    pub metadata: BTreeMap<String, String>,
}

/// Issues roles and secret-ids and authenticates logins for one mount.
pub struct Issuer {
    mount: String,
    store: ScopedStore,
    salt: Salt,
    policy: Arc<PolicyEngine>,
    tokens: Arc<TokenRegistry>,
    wrapping: Arc<WrappingEngine>,
    default_token_ttl: Option<Duration>,
}

impl std::fmt::Debug for Issuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("mount", &self.mount)
            .field("prefix", &self.store.prefix())
            .finish_non_exhaustive()
    }
}

impl Issuer {
    /// Creates an issuer for `mount`, storing its state in `store`.
    ///
    /// `salt` is the root salt; the issuer derives its own from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the mount name is invalid.
    pub fn new(
        mount: impl Into<String>,
        store: ScopedStore,
        salt: &Salt,
        policy: Arc<PolicyEngine>,
        tokens: Arc<TokenRegistry>,
        wrapping: Arc<WrappingEngine>,
    ) -> Result<Self> {
        let mount = mount.into().trim().to_lowercase();
        validate_name(&mount)?;
        Ok(Self {
            salt: salt.derive(&format!("auth/{mount}")),
            mount,
            store,
            policy,
            tokens,
            wrapping,
            default_token_ttl: None,
        })
    }

    /// Sets the TTL of login tokens for roles that do not set one.
    #[must_use]
    pub const fn with_default_token_ttl(mut self, ttl: Duration) -> Self {
        self.default_token_ttl = Some(ttl);
        self
    }

    /// Returns the mount name.
    #[must_use]
    pub fn mount(&self) -> &str {
        &self.mount
    }

    fn authorize(&self, caller: &CallerContext, action: Action, role: &RoleName) -> Result<()> {
        self.policy
            .authorize(&self.mount, action, role.as_str(), &caller.policies)?;
        Ok(())
    }

    fn role_path(name: &RoleName) -> String {
        format!("{ROLE_PREFIX}{name}")
    }

    fn role_hmac(&self, name: &RoleName) -> String {
        self.salt.hash(name.as_str())
    }

    fn secret_id_path(role_hmac: &str, secret_hmac: &str) -> String {
        format!("{SECRET_ID_PREFIX}{role_hmac}/{secret_hmac}")
    }

    fn tombstone_path(role_hmac: &str, secret_hmac: &str) -> String {
        format!("{TOMBSTONE_PREFIX}{role_hmac}/{secret_hmac}")
    }

    fn accessor_path(&self, accessor: &str) -> String {
        format!("{ACCESSOR_PREFIX}{}", self.salt.hash(accessor))
    }

    fn load_role(&self, name: &RoleName) -> Result<Option<Role>> {
        Ok(self
            .store
            .get_json::<Role>(&Self::role_path(name))?
            .map(|(role, _)| role))
    }

    /// Records that a secret-id value is dead for its role.
    fn bury(&self, role_hmac: &str, secret_hmac: &str, accessor: &str, reason: TombstoneReason) -> Result<()> {
        self.store.put_json(
            &Self::tombstone_path(role_hmac, secret_hmac),
            &Tombstone {
                secret_id_accessor: accessor.to_string(),
                reason,
                created_at: Utc::now(),
            },
        )?;
        Ok(())
    }

    fn require_role(&self, name: &RoleName) -> Result<Role> {
        self.load_role(name)?.ok_or_else(|| {
            debug!(mount = %self.mount, role = %name, "Role not found");
            Error::NotFound
        })
    }

    /// Creates `name`, or updates it if it exists.
    ///
    /// Requires `create-role` or `update-role` respectively.
    ///
    /// # Errors
    ///
    /// Returns a policy error if the caller is not permitted,
    /// [`Error::InvalidArgument`] for invalid fields and [`Error::Conflict`]
    /// if the role changed concurrently.
    pub fn write_role(&self, caller: &CallerContext, name: &str, request: RoleRequest) -> Result<Role> {
        let name = RoleName::new(name)?;
        let path = Self::role_path(&name);
        let now = Utc::now();

        let (role, expected) = match self.store.get_json::<Role>(&path)? {
            None => {
                self.authorize(caller, Action::CreateRole, &name)?;
                (Role::create(name, request, now)?, None)
            }
            Some((current, raw)) => {
                self.authorize(caller, Action::UpdateRole, &name)?;
                (current.update(request, now)?, Some(raw))
            }
        };

        let created = expected.is_none();
        if !self
            .store
            .compare_and_swap(&path, expected.as_deref(), Some(codec::encode(&role)?))?
        {
            return Err(Error::conflict(format!("role '{}' was modified concurrently", role.name)));
        }

        info!(
            mount = %self.mount,
            role = %role.name,
            created,
            caller = %caller.display_name,
            "Wrote role"
        );
        Ok(role)
    }

    /// Reads a role. Requires `read-role`.
    ///
    /// # Errors
    ///
    /// Returns a policy error or [`Error::NotFound`].
    pub fn read_role(&self, caller: &CallerContext, name: &str) -> Result<Role> {
        let name = RoleName::new(name)?;
        self.authorize(caller, Action::ReadRole, &name)?;
        self.require_role(&name)
    }

    /// Deletes a role with every secret-id, accessor and tombstone it owns.
    /// Requires `delete-role`.
    ///
    /// # Errors
    ///
    /// Returns a policy error, [`Error::NotFound`] or a storage error. A
    /// storage failure part way leaves the role in place so the delete can be
    /// retried.
    pub fn delete_role(&self, caller: &CallerContext, name: &str) -> Result<()> {
        let name = RoleName::new(name)?;
        self.authorize(caller, Action::DeleteRole, &name)?;
        self.require_role(&name)?;

        let role_hmac = self.role_hmac(&name);
        let mut secret_ids = 0usize;
        for secret_hmac in self.store.list(&format!("{SECRET_ID_PREFIX}{role_hmac}/"))? {
            let path = Self::secret_id_path(&role_hmac, &secret_hmac);
            if let Some((entry, _)) = self.store.get_json::<SecretIdEntry>(&path)? {
                self.store.delete(&self.accessor_path(&entry.secret_id_accessor))?;
            }
            self.store.delete(&path)?;
            secret_ids += 1;
        }
        for secret_hmac in self.store.list(&format!("{TOMBSTONE_PREFIX}{role_hmac}/"))? {
            self.store
                .delete(&Self::tombstone_path(&role_hmac, &secret_hmac))?;
        }
        self.store.delete(&Self::role_path(&name))?;

        info!(mount = %self.mount, role = %name, secret_ids, "Deleted role");
        Ok(())
    }

    /// Lists the roles the caller may read.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn list_roles(&self, caller: &CallerContext) -> Result<Vec<String>> {
        let mut visible = Vec::new();
        for name in self.store.list(ROLE_PREFIX)? {
            if self
                .policy
                .is_authorized(&self.mount, Action::ReadRole, &name, &caller.policies)?
            {
                visible.push(name);
            }
        }
        Ok(visible)
    }

    /// Issues a new secret-id for `role`. Requires `update-role-secret-id`.
    ///
    /// The response is wrapped when the request or the caller names a wrap TTL.
    ///
    /// # Errors
    ///
    /// Returns a policy error, [`Error::NotFound`] for an unknown role,
    /// [`Error::InvalidArgument`] for a bad request, or an error from
    /// wrapping. Nothing is left behind on failure.
    pub fn issue_secret_id(
        &self,
        caller: &CallerContext,
        role: &str,
        request: SecretIdRequest,
    ) -> Result<SecretIdResponse> {
        let name = RoleName::new(role)?;
        self.authorize(caller, Action::UpdateRoleSecretId, &name)?;
        let role = self.require_role(&name)?;
        self.store_secret_id(caller, &role, Uuid::new_v4().to_string(), request, false)
    }

    /// Registers an administrator-supplied secret-id value for `role`.
    /// Requires `update-role-secret-id`.
    ///
    /// # Errors
    ///
    /// As [`Issuer::issue_secret_id`], plus [`Error::Conflict`] if the value
    /// is already live or was ever exhausted, revoked or expired for this role.
    pub fn create_custom_secret_id(
        &self,
        caller: &CallerContext,
        role: &str,
        secret_id: &str,
        request: SecretIdRequest,
    ) -> Result<SecretIdResponse> {
        let name = RoleName::new(role)?;
        self.authorize(caller, Action::UpdateRoleSecretId, &name)?;
        let role = self.require_role(&name)?;
        let secret_id = secret_id.trim();
        if secret_id.is_empty() {
            return Err(Error::invalid("secret_id cannot be empty"));
        }
        self.store_secret_id(caller, &role, secret_id.to_string(), request, true)
    }

    fn store_secret_id(
        &self,
        caller: &CallerContext,
        role: &Role,
        value: String,
        request: SecretIdRequest,
        custom: bool,
    ) -> Result<SecretIdResponse> {
        if !role.bind_secret_id {
            return Err(Error::invalid(format!(
                "role '{}' does not use secret ids",
                role.name
            )));
        }
        let cidr_list = parse_cidrs(&request.cidr_list)?;
        ensure_subset(&cidr_list, &role.secret_id_bound_cidrs)?;
        let wrap_ttl = request.wrap_ttl.or(caller.default_wrap_ttl);
        if wrap_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(Error::invalid("wrap_ttl must be positive"));
        }

        let now = Utc::now();
        let expiration_time = role.secret_id_ttl.map(|ttl| expiry(now, ttl)).transpose()?;
        let accessor = Uuid::new_v4().to_string();
        let role_hmac = self.role_hmac(&role.name);
        let secret_hmac = self.salt.hash(&value);
        let tombstone = Self::tombstone_path(&role_hmac, &secret_hmac);
        let entry_path = Self::secret_id_path(&role_hmac, &secret_hmac);

        if custom && self.store.get(&tombstone)?.is_some() {
            return Err(Error::conflict("secret id cannot be reused"));
        }

        let entry = SecretIdEntry {
            role_name: role.name.clone(),
            secret_id_accessor: accessor.clone(),
            creation_time: now,
            expiration_time,
            last_updated_time: now,
            remaining_uses: role.secret_id_num_uses,
            cidr_list,
            metadata: request.metadata,
        };
        if !self
            .store
            .compare_and_swap(&entry_path, None, Some(codec::encode(&entry)?))?
        {
            return Err(Error::conflict("secret id already exists"));
        }
        // An exhaustion may land between the check above and the write.
        if custom && self.store.get(&tombstone)?.is_some() {
            self.discard(&entry_path, None);
            return Err(Error::conflict("secret id cannot be reused"));
        }

        let index = AccessorEntry {
            role_name: role.name.clone(),
            role_hmac,
            secret_id_hmac: secret_hmac,
        };
        let accessor_path = self.accessor_path(&accessor);
        match self
            .store
            .compare_and_swap(&accessor_path, None, Some(codec::encode(&index)?))
        {
            Ok(true) => {}
            Ok(false) => {
                self.discard(&entry_path, None);
                return Err(Error::conflict("secret id accessor collision"));
            }
            Err(e) => {
                self.discard(&entry_path, None);
                return Err(e.into());
            }
        }

        let payload = SecretIdPayload {
            secret_id: value,
            secret_id_accessor: accessor.clone(),
            secret_id_ttl: role.secret_id_ttl.map_or(0, |ttl| ttl.as_secs()),
            secret_id_num_uses: role.secret_id_num_uses.unwrap_or(0),
        };

        let response = match wrap_ttl {
            None => SecretIdResponse::Raw(payload),
            Some(ttl) => {
                let endpoint = if custom { "custom-secret-id" } else { "secret-id" };
                let request = WrapRequest::new(format!(
                    "auth/{}/role/{}/{endpoint}",
                    self.mount, role.name
                ))
                .with_ttl(Some(ttl))
                .with_wrapped_accessor(accessor.clone());
                match self.wrapping.wrap(&payload, request) {
                    Ok(wrap_info) => SecretIdResponse::Wrapped { wrap_info },
                    Err(e) => {
                        warn!(mount = %self.mount, role = %role.name, error = %e, "Wrapping failed, discarding secret id");
                        self.discard(&entry_path, Some(&accessor_path));
                        return Err(e.into());
                    }
                }
            }
        };

        info!(
            mount = %self.mount,
            role = %role.name,
            secret_id_accessor = %accessor,
            wrapped = response.wrap_info().is_some(),
            custom,
            "Issued secret id"
        );
        Ok(response)
    }

    fn discard(&self, entry_path: &str, accessor_path: Option<&str>) {
        if let Some(accessor_path) = accessor_path {
            if let Err(e) = self.store.delete(accessor_path) {
                warn!(mount = %self.mount, error = %e, "Failed to roll back secret id accessor");
            }
        }
        if let Err(e) = self.store.delete(entry_path) {
            warn!(mount = %self.mount, error = %e, "Failed to roll back secret id");
        }
    }

    fn resolve_accessor(&self, name: &RoleName, accessor: &str) -> Result<(AccessorEntry, String)> {
        let path = self.accessor_path(accessor);
        match self.store.get_json::<AccessorEntry>(&path)? {
            Some((index, _)) if index.role_name == *name => Ok((index, path)),
            _ => {
                debug!(mount = %self.mount, role = %name, "Secret id accessor not found");
                Err(Error::NotFound)
            }
        }
    }

    /// Returns what is known about the secret-id behind `accessor`.
    /// Requires `lookup-role-secret-id-accessor`.
    ///
    /// # Errors
    ///
    /// Returns a policy error, or [`Error::NotFound`] if the accessor is
    /// unknown, belongs to another role or its secret-id has expired.
    pub fn lookup_secret_id_accessor(
        &self,
        caller: &CallerContext,
        role: &str,
        accessor: &str,
    ) -> Result<SecretIdInfo> {
        let name = RoleName::new(role)?;
        self.authorize(caller, Action::LookupRoleSecretIdAccessor, &name)?;
        let (index, _) = self.resolve_accessor(&name, accessor)?;

        let path = Self::secret_id_path(&index.role_hmac, &index.secret_id_hmac);
        match self.store.get_json::<SecretIdEntry>(&path)? {
            Some((entry, _)) if !entry.is_expired_at(Utc::now()) => {
                Ok(SecretIdInfo::from_entry(entry))
            }
            _ => Err(Error::NotFound),
        }
    }

    /// Destroys the secret-id behind `accessor`. The value can never be used
    /// again. Requires `destroy-role-secret-id-accessor`.
    ///
    /// # Errors
    ///
    /// Returns a policy error, [`Error::NotFound`] if the accessor is unknown
    /// or belongs to another role, or a storage error.
    pub fn revoke_secret_id_accessor(&self, caller: &CallerContext, role: &str, accessor: &str) -> Result<()> {
        let name = RoleName::new(role)?;
        self.authorize(caller, Action::DestroyRoleSecretIdAccessor, &name)?;
        let (index, accessor_path) = self.resolve_accessor(&name, accessor)?;

        self.bury(&index.role_hmac, &index.secret_id_hmac, accessor, TombstoneReason::Revoked)?;
        self.store
            .delete(&Self::secret_id_path(&index.role_hmac, &index.secret_id_hmac))?;
        self.store.delete(&accessor_path)?;

        info!(mount = %self.mount, role = %name, secret_id_accessor = %accessor, "Revoked secret id");
        Ok(())
    }

    /// Lists accessors of the role's live secret-ids, sorted.
    /// Requires `list-role-secret-id`.
    ///
    /// # Errors
    ///
    /// Returns a policy error, [`Error::NotFound`] for an unknown role or a
    /// storage error.
    pub fn list_secret_id_accessors(&self, caller: &CallerContext, role: &str) -> Result<Vec<String>> {
        let name = RoleName::new(role)?;
        self.authorize(caller, Action::ListRoleSecretId, &name)?;
        self.require_role(&name)?;

        let role_hmac = self.role_hmac(&name);
        let now = Utc::now();
        let mut accessors = Vec::new();
        for secret_hmac in self.store.list(&format!("{SECRET_ID_PREFIX}{role_hmac}/"))? {
            if let Some((entry, _)) = self
                .store
                .get_json::<SecretIdEntry>(&Self::secret_id_path(&role_hmac, &secret_hmac))?
            {
                if !entry.is_expired_at(now) {
                    accessors.push(entry.secret_id_accessor);
                }
            }
        }
        accessors.sort();
        Ok(accessors)
    }

    fn reject(&self, role: &str, reason: &str) -> Error {
        debug!(mount = %self.mount, role, reason, "Login rejected");
        Error::InvalidCredentials
    }

    /// Authenticates with a role and secret-id and mints a client token.
    ///
    /// `client_addr` is checked against the role's and the secret-id's bound
    /// CIDRs when supplied. Roles that do not bind a secret-id require it.
    ///
    /// # Errors
    ///
    /// Every authentication failure is [`Error::InvalidCredentials`]. Storage
    /// and token failures propagate.
    pub fn login(&self, role: &str, secret_id: Option<&str>, client_addr: Option<IpAddr>) -> Result<LoginResponse> {
        let Ok(name) = RoleName::new(role) else {
            return Err(self.reject(role, "invalid role name"));
        };
        let Some(role) = self.load_role(&name)? else {
            return Err(self.reject(name.as_str(), "unknown role"));
        };
        if role.policies.iter().any(|p| p == ROOT_POLICY) {
            warn!(mount = %self.mount, role = %name, "Refusing login for role carrying the root policy");
            return Err(self.reject(name.as_str(), "role carries the root policy"));
        }

        match client_addr {
            Some(addr) if !allows(&role.secret_id_bound_cidrs, addr) => {
                return Err(self.reject(name.as_str(), "client address outside role CIDRs"));
            }
            None if !role.bind_secret_id => {
                return Err(self.reject(name.as_str(), "client address required"));
            }
            _ => {}
        }

        let mut metadata = BTreeMap::new();
        if role.bind_secret_id {
            let Some(secret_id) = secret_id.filter(|s| !s.is_empty()) else {
                return Err(self.reject(name.as_str(), "missing secret id"));
            };
            let entry = self.use_secret_id(&role, secret_id, client_addr)?;
            metadata.extend(entry.metadata);
        }
        metadata.insert(ROLE_NAME_METADATA.to_string(), role.name.to_string());

        let mut request = TokenRequest::new(role.policies.clone())
            .renewable()
            .with_creation_path(format!("auth/{}/login", self.mount))
            .with_display_name(format!("{}-{}", self.mount, role.name))
            .with_metadata(metadata);
        if let Some(ttl) = role.token_ttl.or(self.default_token_ttl) {
            request = request.with_ttl(ttl);
        }
        if let Some(max) = role.token_max_ttl {
            request = request.with_explicit_max_ttl(max);
        }
        let issued = self.tokens.issue(request)?;

        info!(mount = %self.mount, role = %role.name, accessor = %issued.metadata.accessor, "Login succeeded");
        Ok(LoginResponse {
            client_token: issued.token,
            accessor: issued.metadata.accessor,
            policies: issued.metadata.policies,
            lease_duration: issued.metadata.ttl.as_secs(),
            renewable: issued.metadata.renewable,
            metadata: issued.metadata.metadata,
        })
    }

    /// Validates a secret-id and spends one use of it.
    fn use_secret_id(&self, role: &Role, secret_id: &str, client_addr: Option<IpAddr>) -> Result<SecretIdEntry> {
        let role_hmac = self.role_hmac(&role.name);
        let secret_hmac = self.salt.hash(secret_id);
        let path = Self::secret_id_path(&role_hmac, &secret_hmac);
        let name = role.name.as_str();

        loop {
            let Some((entry, raw)) = self.store.get_json::<SecretIdEntry>(&path)? else {
                return Err(self.reject(name, "unknown secret id"));
            };
            let now = Utc::now();

            if entry.is_expired_at(now) {
                self.bury(&role_hmac, &secret_hmac, &entry.secret_id_accessor, TombstoneReason::Expired)?;
                if self.store.compare_and_swap(&path, Some(&raw), None)? {
                    self.drop_accessor(&entry.secret_id_accessor);
                }
                return Err(self.reject(name, "secret id expired"));
            }
            if let Some(addr) = client_addr {
                if !allows(&entry.cidr_list, addr) {
                    return Err(self.reject(name, "client address outside secret id CIDRs"));
                }
            }

            let remaining_uses = entry.remaining_uses;
            match remaining_uses {
                None => return Ok(entry),
                Some(remaining) if remaining <= 1 => {
                    self.bury(&role_hmac, &secret_hmac, &entry.secret_id_accessor, TombstoneReason::Exhausted)?;
                    if self.store.compare_and_swap(&path, Some(&raw), None)? {
                        self.drop_accessor(&entry.secret_id_accessor);
                        debug!(mount = %self.mount, role = name, secret_id_accessor = %entry.secret_id_accessor, "Secret id exhausted");
                        return Ok(SecretIdEntry {
                            remaining_uses: Some(0),
                            last_updated_time: now,
                            ..entry
                        });
                    }
                }
                Some(remaining) => {
                    let next = SecretIdEntry {
                        remaining_uses: Some(remaining - 1),
                        last_updated_time: now,
                        ..entry
                    };
                    if self
                        .store
                        .compare_and_swap(&path, Some(&raw), Some(codec::encode(&next)?))?
                    {
                        return Ok(next);
                    }
                }
            }
            debug!(mount = %self.mount, role = name, "Secret id changed concurrently, retrying");
        }
    }

    fn drop_accessor(&self, accessor: &str) {
        if let Err(e) = self.store.delete(&self.accessor_path(accessor)) {
            warn!(mount = %self.mount, error = %e, "Failed to delete secret id accessor");
        }
    }

    /// Removes expired and orphaned secret-ids, then accessors whose
    /// secret-id is gone.
    pub fn tidy(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let now = Utc::now();
        let mut roles: HashMap<RoleName, bool> = HashMap::new();

        let role_dirs = match self.store.list(SECRET_ID_PREFIX) {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!(mount = %self.mount, error = %e, "Failed to list secret ids");
                report.failed += 1;
                Vec::new()
            }
        };
        for dir in role_dirs {
            let role_hmac = dir.trim_end_matches('/');
            let secret_hmacs = match self.store.list(&format!("{SECRET_ID_PREFIX}{role_hmac}/")) {
                Ok(hmacs) => hmacs,
                Err(e) => {
                    warn!(mount = %self.mount, error = %e, "Failed to list role secret ids");
                    report.failed += 1;
                    continue;
                }
            };
            for secret_hmac in secret_hmacs {
                report.scanned += 1;
                let path = Self::secret_id_path(role_hmac, &secret_hmac);
                let (entry, raw) = match self.store.get_json::<SecretIdEntry>(&path) {
                    Ok(Some(loaded)) => loaded,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(mount = %self.mount, error = %e, "Failed to read secret id");
                        report.failed += 1;
                        continue;
                    }
                };

                let cached = roles.get(&entry.role_name).copied();
                let role_exists = match cached {
                    Some(exists) => exists,
                    None => match self.load_role(&entry.role_name) {
                        Ok(role) => {
                            let exists = role.is_some();
                            roles.insert(entry.role_name.clone(), exists);
                            exists
                        }
                        Err(e) => {
                            warn!(mount = %self.mount, error = %e, "Failed to read role");
                            report.failed += 1;
                            continue;
                        }
                    },
                };
                if role_exists && !entry.is_expired_at(now) {
                    continue;
                }
                // Orphans need no tombstone; their role's tombstones went with it.
                if role_exists {
                    if let Err(e) = self.bury(role_hmac, &secret_hmac, &entry.secret_id_accessor, TombstoneReason::Expired) {
                        warn!(mount = %self.mount, error = %e, "Failed to tombstone expired secret id");
                        report.failed += 1;
                        continue;
                    }
                }

                match self.store.compare_and_swap(&path, Some(&raw), None) {
                    Ok(true) => {
                        self.drop_accessor(&entry.secret_id_accessor);
                        report.removed += 1;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(mount = %self.mount, error = %e, "Failed to delete secret id");
                        report.failed += 1;
                    }
                }
            }
        }

        report += self.tidy_accessors();
        report
    }

    fn tidy_accessors(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let hashes = match self.store.list(ACCESSOR_PREFIX) {
            Ok(hashes) => hashes,
            Err(e) => {
                warn!(mount = %self.mount, error = %e, "Failed to list secret id accessors");
                report.failed += 1;
                return report;
            }
        };
        for hash in hashes {
            report.scanned += 1;
            let path = format!("{ACCESSOR_PREFIX}{hash}");
            let dangling = self
                .store
                .get_json::<AccessorEntry>(&path)
                .and_then(|index| match index {
                    Some((index, _)) => Ok(self
                        .store
                        .get(&Self::secret_id_path(&index.role_hmac, &index.secret_id_hmac))?
                        .is_none()),
                    None => Ok(false),
                });
            match dangling {
                Ok(false) => {}
                Ok(true) => match self.store.delete(&path) {
                    Ok(()) => report.removed += 1,
                    Err(e) => {
                        warn!(mount = %self.mount, error = %e, "Failed to delete dangling accessor");
                        report.failed += 1;
                    }
                },
                Err(e) => {
                    warn!(mount = %self.mount, error = %e, "Failed to read secret id accessor");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl ExpirySweep for Issuer {
    fn name(&self) -> &str {
        &self.mount
    }

    fn sweep_expired(&self) -> SweepReport {
        self.tidy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use warden_policy::{Pattern, Policy, PolicyStore, Rule};
    use warden_store::{ErrorKind, FaultOp, FaultyStorage, Storage};
    use warden_token::{BarrierKey, Cubbyhole, TtlLimits};

    struct Fixture {
        issuer: Issuer,
        tokens: Arc<TokenRegistry>,
        wrapping: Arc<WrappingEngine>,
        policies: Arc<PolicyEngine>,
        backend: Arc<FaultyStorage>,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(FaultyStorage::new());
        let scoped = |prefix: &str| ScopedStore::new(backend.clone(), prefix).expect("prefix");
        let salt = Salt::generate();
        let tokens = Arc::new(TokenRegistry::new(
            scoped("sys/token/"),
            Arc::new(salt.clone()),
            TtlLimits::new(Duration::from_secs(3600), Duration::from_secs(86_400)),
        ));
        let wrapping = Arc::new(WrappingEngine::new(
            Arc::clone(&tokens),
            Arc::new(Cubbyhole::new(scoped("cubbyhole/"), Arc::new(BarrierKey::generate()))),
            TtlLimits::new(Duration::from_secs(300), Duration::from_secs(3600)),
        ));
        let policies = Arc::new(PolicyEngine::new(Arc::new(PolicyStore::new(scoped("sys/policy/")))));
        let issuer = Issuer::new(
            "approle",
            scoped("auth/approle/"),
            &salt,
            Arc::clone(&policies),
            Arc::clone(&tokens),
            Arc::clone(&wrapping),
        )
        .expect("issuer");
        Fixture {
            issuer,
            tokens,
            wrapping,
            policies,
            backend,
        }
    }

    fn root() -> CallerContext {
        CallerContext::root()
    }

    fn role_with_uses(f: &Fixture, uses: u32) {
        f.issuer
            .write_role(
                &root(),
                "test-role-1",
                RoleRequest::new()
                    .with_policies(["default"])
                    .with_secret_id_num_uses(uses),
            )
            .expect("role");
    }

    fn raw_secret(response: SecretIdResponse) -> SecretIdPayload {
        response.payload().cloned().expect("raw payload")
    }

    #[test]
    fn login_refuses_stored_role_with_root_policy() {
        let f = fixture();
        role_with_uses(&f, 2);
        let secret = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );

        // A role record written before root was refused at write time
        let name = RoleName::new("test-role-1").expect("name");
        let mut stored = f.issuer.load_role(&name).expect("load").expect("role");
        stored.policies = vec!["root".to_string()];
        f.issuer
            .store
            .put_json(&Issuer::role_path(&name), &stored)
            .expect("put");

        let err = f
            .issuer
            .login("test-role-1", Some(&secret.secret_id), None)
            .expect_err("login should be refused");
        assert!(matches!(err, Error::InvalidCredentials));

        // No use was spent on the refused attempt
        let info = f
            .issuer
            .lookup_secret_id_accessor(&root(), "test-role-1", &secret.secret_id_accessor)
            .expect("lookup");
        assert_eq!(info.secret_id_num_uses, 2);
    }

    #[test]
    fn write_role_creates_then_updates() {
        let f = fixture();
        let created = f
            .issuer
            .write_role(&root(), "Test-Role-1", RoleRequest::new().with_policies(["a"]))
            .expect("create");
        assert_eq!(created.name.as_str(), "test-role-1");

        let updated = f
            .issuer
            .write_role(&root(), "test-role-1", RoleRequest::new().with_secret_id_num_uses(2))
            .expect("update");
        assert_eq!(updated.policies, vec!["a"]);
        assert_eq!(updated.secret_id_num_uses, Some(2));
        assert_eq!(updated.created_at, created.created_at);

        assert_eq!(f.issuer.read_role(&root(), "TEST-ROLE-1").expect("read"), updated);
    }

    #[test]
    fn create_and_update_are_separate_actions() {
        let f = fixture();
        f.policies
            .store()
            .put(
                &Policy::new("creator").expect("name").with_rule(
                    Rule::new(Pattern::parse("approle").expect("pattern"))
                        .allow([Action::CreateRole])
                        .on_role(Pattern::parse("*").expect("pattern")),
                ),
            )
            .expect("policy");
        let caller = CallerContext::new(vec!["creator".to_string()]);

        f.issuer
            .write_role(&caller, "r1", RoleRequest::new())
            .expect("create allowed");
        let err = f
            .issuer
            .write_role(&caller, "r1", RoleRequest::new())
            .expect_err("update denied");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn unknown_role_is_not_found() {
        let f = fixture();
        for err in [
            f.issuer.read_role(&root(), "missing").expect_err("read"),
            f.issuer.delete_role(&root(), "missing").expect_err("delete"),
            f.issuer
                .issue_secret_id(&root(), "missing", SecretIdRequest::new())
                .expect_err("issue"),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn unauthorized_caller_is_denied_before_existence_check() {
        let f = fixture();
        let nobody = CallerContext::new(vec!["missing-policy".to_string()]);
        let err = f
            .issuer
            .issue_secret_id(&nobody, "missing", SecretIdRequest::new())
            .expect_err("denied");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn unwrapped_issue_returns_secret() {
        let f = fixture();
        role_with_uses(&f, 3);
        let payload = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );
        assert!(!payload.secret_id.is_empty());
        assert_eq!(payload.secret_id_num_uses, 3);

        let info = f
            .issuer
            .lookup_secret_id_accessor(&root(), "test-role-1", &payload.secret_id_accessor)
            .expect("lookup");
        assert_eq!(info.secret_id_num_uses, 3);
        assert_eq!(info.role_name.as_str(), "test-role-1");
    }

    #[test]
    fn wrapped_issue_round_trips_through_unwrap() {
        let f = fixture();
        role_with_uses(&f, 1);
        let response = f
            .issuer
            .issue_secret_id(
                &root(),
                "test-role-1",
                SecretIdRequest::new().wrapped(Duration::from_secs(300)),
            )
            .expect("issue");
        let wrap_info = response.wrap_info().cloned().expect("wrapped");
        assert_eq!(wrap_info.creation_path, "auth/approle/role/test-role-1/secret-id");

        let payload: SecretIdPayload = f.wrapping.unwrap_as(&wrap_info.token).expect("unwrap");
        assert_eq!(Some(payload.secret_id_accessor.as_str()), wrap_info.wrapped_accessor.as_deref());

        let login = f
            .issuer
            .login("test-role-1", Some(&payload.secret_id), None)
            .expect("login");
        assert_eq!(login.policies, vec!["default"]);
        assert_eq!(login.metadata.get(ROLE_NAME_METADATA).map(String::as_str), Some("test-role-1"));
        assert!(login.renewable);
    }

    #[test]
    fn caller_default_wrap_ttl_applies() {
        let f = fixture();
        role_with_uses(&f, 1);
        let caller = root().with_default_wrap_ttl(Duration::from_secs(120));
        let response = f
            .issuer
            .issue_secret_id(&caller, "test-role-1", SecretIdRequest::new())
            .expect("issue");
        assert_eq!(response.wrap_info().expect("wrapped").ttl, Duration::from_secs(120));
    }

    #[test]
    fn zero_wrap_ttl_leaves_nothing_behind() {
        let f = fixture();
        role_with_uses(&f, 1);
        let err = f
            .issuer
            .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new().wrapped(Duration::ZERO))
            .expect_err("zero ttl");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(f
            .issuer
            .list_secret_id_accessors(&root(), "test-role-1")
            .expect("list")
            .is_empty());
    }

    #[test]
    fn single_use_secret_logs_in_once() {
        let f = fixture();
        role_with_uses(&f, 1);
        let payload = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );

        f.issuer
            .login("test-role-1", Some(&payload.secret_id), None)
            .expect("first login");
        let err = f
            .issuer
            .login("test-role-1", Some(&payload.secret_id), None)
            .expect_err("second login");
        assert!(matches!(err, Error::InvalidCredentials));

        let err = f
            .issuer
            .lookup_secret_id_accessor(&root(), "test-role-1", &payload.secret_id_accessor)
            .expect_err("gone");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn uses_are_decremented() {
        let f = fixture();
        role_with_uses(&f, 3);
        let payload = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );

        for remaining in [2, 1] {
            f.issuer
                .login("test-role-1", Some(&payload.secret_id), None)
                .expect("login");
            let info = f
                .issuer
                .lookup_secret_id_accessor(&root(), "test-role-1", &payload.secret_id_accessor)
                .expect("lookup");
            assert_eq!(info.secret_id_num_uses, remaining);
        }
        f.issuer
            .login("test-role-1", Some(&payload.secret_id), None)
            .expect("last login");
        assert!(f.issuer.login("test-role-1", Some(&payload.secret_id), None).is_err());
    }

    #[test]
    fn concurrent_logins_never_overspend() {
        let f = Arc::new(fixture());
        role_with_uses(&f, 3);
        let payload = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );

        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let f = Arc::clone(&f);
                let barrier = Arc::clone(&barrier);
                let secret = payload.secret_id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    f.issuer.login("test-role-1", Some(&secret), None).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 3);
    }

    #[test]
    fn login_failures_are_indistinguishable() {
        let f = fixture();
        role_with_uses(&f, 1);
        let failures = [
            f.issuer.login("missing", Some("whatever"), None),
            f.issuer.login("test-role-1", Some("wrong"), None),
            f.issuer.login("test-role-1", None, None),
            f.issuer.login("bad name!", Some("x"), None),
        ];
        for result in failures {
            let err = result.expect_err("should fail");
            assert_eq!(err.to_string(), "invalid role or secret id");
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn cidr_bindings_are_enforced() {
        let f = fixture();
        f.issuer
            .write_role(
                &root(),
                "net",
                RoleRequest::new().with_bound_cidrs(["10.0.0.0/8"]),
            )
            .expect("role");
        let payload = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "net", SecretIdRequest::new().with_cidrs(["10.1.0.0/16"]))
                .expect("issue"),
        );

        let outside_role: IpAddr = "192.168.0.1".parse().expect("addr");
        let outside_secret: IpAddr = "10.2.0.1".parse().expect("addr");
        let inside: IpAddr = "10.1.2.3".parse().expect("addr");
        assert!(f.issuer.login("net", Some(&payload.secret_id), Some(outside_role)).is_err());
        assert!(f.issuer.login("net", Some(&payload.secret_id), Some(outside_secret)).is_err());
        f.issuer
            .login("net", Some(&payload.secret_id), Some(inside))
            .expect("login");

        let err = f
            .issuer
            .issue_secret_id(&root(), "net", SecretIdRequest::new().with_cidrs(["192.168.0.0/16"]))
            .expect_err("not a subset");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn cidr_only_role_requires_address() {
        let f = fixture();
        f.issuer
            .write_role(
                &root(),
                "cidr-only",
                RoleRequest::new()
                    .with_bind_secret_id(false)
                    .with_bound_cidrs(["127.0.0.1"]),
            )
            .expect("role");

        assert!(f.issuer.login("cidr-only", None, None).is_err());
        f.issuer
            .login("cidr-only", None, Some("127.0.0.1".parse().expect("addr")))
            .expect("login");

        let err = f
            .issuer
            .issue_secret_id(&root(), "cidr-only", SecretIdRequest::new())
            .expect_err("no secret ids");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn revoked_secret_cannot_be_recreated() {
        let f = fixture();
        role_with_uses(&f, 5);
        let custom = raw_secret(
            f.issuer
                .create_custom_secret_id(&root(), "test-role-1", "my-custom-value", SecretIdRequest::new())
                .expect("custom"),
        );
        assert_eq!(custom.secret_id, "my-custom-value");

        let err = f
            .issuer
            .create_custom_secret_id(&root(), "test-role-1", "my-custom-value", SecretIdRequest::new())
            .expect_err("live duplicate");
        assert_eq!(err.kind(), ErrorKind::Conflict);

        f.issuer
            .revoke_secret_id_accessor(&root(), "test-role-1", &custom.secret_id_accessor)
            .expect("revoke");
        assert!(f.issuer.login("test-role-1", Some("my-custom-value"), None).is_err());

        let err = f
            .issuer
            .create_custom_secret_id(&root(), "test-role-1", "my-custom-value", SecretIdRequest::new())
            .expect_err("tombstoned");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn accessor_of_another_role_is_not_found() {
        let f = fixture();
        role_with_uses(&f, 1);
        f.issuer
            .write_role(&root(), "other", RoleRequest::new())
            .expect("role");
        let payload = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );

        let err = f
            .issuer
            .revoke_secret_id_accessor(&root(), "other", &payload.secret_id_accessor)
            .expect_err("wrong role");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        f.issuer
            .login("test-role-1", Some(&payload.secret_id), None)
            .expect("still usable");
    }

    #[test]
    fn delete_role_cascades() {
        let f = fixture();
        role_with_uses(&f, 1);
        for _ in 0..3 {
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue");
        }
        let used = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );
        f.issuer
            .login("test-role-1", Some(&used.secret_id), None)
            .expect("login");

        f.issuer.delete_role(&root(), "test-role-1").expect("delete");
        assert!(f.backend.list_prefix("auth/approle/").expect("list").is_empty());
    }

    #[test]
    fn list_roles_filters_by_read_permission() {
        let f = fixture();
        for name in ["web-api", "web-ui", "db"] {
            f.issuer
                .write_role(&root(), name, RoleRequest::new())
                .expect("role");
        }
        f.policies
            .store()
            .put(
                &Policy::new("web-reader").expect("name").with_rule(
                    Rule::new(Pattern::parse("approle").expect("pattern"))
                        .allow([Action::ReadRole])
                        .on_role(Pattern::parse("web-*").expect("pattern")),
                ),
            )
            .expect("policy");

        let caller = CallerContext::new(vec!["web-reader".to_string()]);
        assert_eq!(f.issuer.list_roles(&caller).expect("list"), vec!["web-api", "web-ui"]);
        assert_eq!(f.issuer.list_roles(&root()).expect("list").len(), 3);
    }

    #[test]
    fn tidy_removes_expired_and_dangling() {
        let f = fixture();
        f.issuer
            .write_role(
                &root(),
                "short",
                RoleRequest::new().with_secret_id_ttl(Duration::from_secs(1)),
            )
            .expect("role");
        role_with_uses(&f, 1);
        let expiring = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "short", SecretIdRequest::new())
                .expect("issue"),
        );
        let kept = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
                .expect("issue"),
        );
        // Leave a dangling accessor behind.
        let salt = &f.issuer.salt;
        f.backend
            .put(
                &format!("auth/approle/accessor/{}", salt.hash("ghost")),
                codec::encode(&AccessorEntry {
                    role_name: RoleName::new("test-role-1").expect("name"),
                    role_hmac: "none".to_string(),
                    secret_id_hmac: "none".to_string(),
                })
                .expect("encode"),
            )
            .expect("put");

        thread::sleep(Duration::from_millis(1100));
        let report = f.issuer.sweep_expired();
        assert_eq!(report.removed, 2);
        assert_eq!(report.failed, 0);

        assert!(f
            .issuer
            .lookup_secret_id_accessor(&root(), "short", &expiring.secret_id_accessor)
            .is_err());
        f.issuer
            .lookup_secret_id_accessor(&root(), "test-role-1", &kept.secret_id_accessor)
            .expect("kept");
        assert!(f.issuer.sweep_expired().is_clean());
    }

    #[test]
    fn expired_custom_values_stay_dead() {
        let f = fixture();
        f.issuer
            .write_role(
                &root(),
                "short",
                RoleRequest::new().with_secret_id_ttl(Duration::from_secs(1)),
            )
            .expect("role");
        for value in ["seen-at-login", "seen-by-tidy"] {
            f.issuer
                .create_custom_secret_id(&root(), "short", value, SecretIdRequest::new())
                .expect("custom");
        }

        thread::sleep(Duration::from_millis(1100));
        assert!(matches!(
            f.issuer.login("short", Some("seen-at-login"), None),
            Err(Error::InvalidCredentials)
        ));
        assert_eq!(f.issuer.tidy().failed, 0);

        for value in ["seen-at-login", "seen-by-tidy"] {
            let err = f
                .issuer
                .create_custom_secret_id(&root(), "short", value, SecretIdRequest::new())
                .expect_err("expired value must not come back");
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }
    }

    fn assert_no_secret_id_state(f: &Fixture) {
        for prefix in ["auth/approle/secret_id/", "auth/approle/accessor/", "sys/token/id/", "cubbyhole/"] {
            assert!(
                f.backend.inner().list_prefix(prefix).expect("list").is_empty(),
                "leftover state under {prefix}"
            );
        }
    }

    #[test]
    fn failed_wrap_discards_secret_id() {
        let f = fixture();
        role_with_uses(&f, 1);
        f.backend.fail(FaultOp::Write, "cubbyhole/");

        let err = f
            .issuer
            .issue_secret_id(
                &root(),
                "test-role-1",
                SecretIdRequest::new().wrapped(Duration::from_secs(60)),
            )
            .expect_err("wrap fails");
        assert_eq!(err.kind(), ErrorKind::Internal);

        f.backend.heal();
        assert_no_secret_id_state(&f);
        assert!(f
            .issuer
            .list_secret_id_accessors(&root(), "test-role-1")
            .expect("list")
            .is_empty());
    }

    #[test]
    fn failed_accessor_index_discards_secret_id() {
        let f = fixture();
        role_with_uses(&f, 1);
        f.backend.fail(FaultOp::Write, "auth/approle/accessor/");

        assert!(f
            .issuer
            .issue_secret_id(&root(), "test-role-1", SecretIdRequest::new())
            .is_err());

        f.backend.heal();
        assert_no_secret_id_state(&f);
    }

    #[test]
    fn tidy_counts_failures_and_keeps_going() {
        let f = fixture();
        f.issuer
            .write_role(
                &root(),
                "short",
                RoleRequest::new().with_secret_id_ttl(Duration::from_secs(1)),
            )
            .expect("role");
        for _ in 0..2 {
            f.issuer
                .issue_secret_id(&root(), "short", SecretIdRequest::new())
                .expect("issue");
        }
        thread::sleep(Duration::from_millis(1100));

        f.backend.fail_times(FaultOp::Write, "auth/approle/", 1);
        let report = f.issuer.tidy();
        assert_eq!(report.failed, 1);
        assert_eq!(report.removed, 1);

        let report = f.issuer.tidy();
        assert_eq!((report.removed, report.failed), (1, 0));
        assert!(f
            .issuer
            .list_secret_id_accessors(&root(), "short")
            .expect("list")
            .is_empty());
    }

    #[test]
    fn login_token_uses_role_ttls() {
        let f = fixture();
        f.issuer
            .write_role(
                &root(),
                "ttl",
                RoleRequest::new()
                    .with_token_ttl(Duration::from_secs(600))
                    .with_token_max_ttl(Duration::from_secs(900)),
            )
            .expect("role");
        let payload = raw_secret(
            f.issuer
                .issue_secret_id(&root(), "ttl", SecretIdRequest::new())
                .expect("issue"),
        );
        let login = f.issuer.login("ttl", Some(&payload.secret_id), None).expect("login");
        assert_eq!(login.lease_duration, 600);

        let meta = f.tokens.lookup(&login.client_token).expect("token");
        assert_eq!(meta.creation_path, "auth/approle/login");
        assert_eq!(meta.explicit_max_ttl, Some(Duration::from_secs(900)));
    }
}
