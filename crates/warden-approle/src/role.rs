//! Role definitions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use warden_policy::{validate_name, RoleName, ROOT_POLICY};
use warden_store::codec::option_duration_secs;

use crate::cidr::parse_cidrs;
use crate::error::{Error, Result};

/// A named template for secret-id issuance and the tokens minted at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Lowercase role name.
    pub name: RoleName,
    /// Policies attached to tokens minted by logging in with this role.
    pub policies: Vec<String>,
    /// Whether login requires a secret-id.
    pub bind_secret_id: bool,
    /// Lifetime of each issued secret-id; `None` never expires.
    #[serde(default, with = "option_duration_secs")]
    pub secret_id_ttl: Option<Duration>,
    /// Logins allowed per secret-id; `None` is unlimited.
    #[serde(default)]
    pub secret_id_num_uses: Option<u32>,
    /// Client addresses allowed to log in with this role's secret-ids.
    #[serde(default)]
    pub secret_id_bound_cidrs: Vec<IpNet>,
    /// TTL of tokens minted at login; `None` takes the mount default.
    #[serde(default, with = "option_duration_secs")]
    pub token_ttl: Option<Duration>,
    /// Hard lifetime cap of tokens minted at login.
    #[serde(default, with = "option_duration_secs")]
    pub token_max_ttl: Option<Duration>,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
    /// When the role was last written.
    pub updated_at: DateTime<Utc>,
}

/// Fields of a role write. Unset fields keep their current value on update
/// and take defaults on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleRequest {
    /// Policies for minted tokens.
    pub policies: Option<Vec<String>>,
    /// Whether login requires a secret-id. Defaults to `true`.
    pub bind_secret_id: Option<bool>,
    /// Secret-id lifetime.
    #[serde(with = "option_duration_secs")]
    pub secret_id_ttl: Option<Duration>,
    /// Logins allowed per secret-id.
    pub secret_id_num_uses: Option<u32>,
    /// Bound CIDR blocks.
    pub secret_id_bound_cidrs: Option<Vec<String>>,
    /// TTL of minted tokens.
    #[serde(with = "option_duration_secs")]
    pub token_ttl: Option<Duration>,
    /// Lifetime cap of minted tokens.
    #[serde(with = "option_duration_secs")]
    pub token_max_ttl: Option<Duration>,
}

impl RoleRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policies attached to minted tokens.
    #[must_use]
    pub fn with_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies = Some(policies.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the secret-id TTL.
    #[must_use]
    pub const fn with_secret_id_ttl(mut self, ttl: Duration) -> Self {
        self.secret_id_ttl = Some(ttl);
        self
    }

    /// Sets the number of logins each secret-id allows.
    #[must_use]
    pub const fn with_secret_id_num_uses(mut self, uses: u32) -> Self {
        self.secret_id_num_uses = Some(uses);
        self
    }

    /// Sets the bound CIDR blocks.
    #[must_use]
    pub fn with_bound_cidrs<I, S>(mut self, cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secret_id_bound_cidrs = Some(cidrs.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether login requires a secret-id.
    #[must_use]
    pub const fn with_bind_secret_id(mut self, bind: bool) -> Self {
        self.bind_secret_id = Some(bind);
        self
    }

    /// Sets the TTL of minted tokens.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    /// Sets the lifetime cap of minted tokens.
    #[must_use]
    pub const fn with_token_max_ttl(mut self, ttl: Duration) -> Self {
        self.token_max_ttl = Some(ttl);
        self
    }
}

fn normalize_policies(policies: Vec<String>) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(policies.len());
    for policy in policies {
        let policy = policy.trim().to_lowercase();
        validate_name(&policy)?;
        if policy == ROOT_POLICY {
            return Err(Error::invalid("roles cannot grant the root policy"));
        }
        if !normalized.contains(&policy) {
            normalized.push(policy);
        }
    }
    Ok(normalized)
}

fn positive(ttl: Option<Duration>, field: &str) -> Result<Option<Duration>> {
    match ttl {
        Some(ttl) if ttl.is_zero() => Err(Error::invalid(format!("{field} must be positive"))),
        other => Ok(other),
    }
}

impl Role {
    /// Builds a role from a create request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any field is invalid.
    pub fn create(name: RoleName, request: RoleRequest, now: DateTime<Utc>) -> Result<Self> {
        let role = Self {
            name,
            policies: Vec::new(),
            bind_secret_id: true,
            secret_id_ttl: None,
            secret_id_num_uses: None,
            secret_id_bound_cidrs: Vec::new(),
            token_ttl: None,
            token_max_ttl: None,
            created_at: now,
            updated_at: now,
        };
        role.update(request, now)
    }

    /// Applies an update request, returning the updated role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any field is invalid or the
    /// resulting role could never be logged into.
    pub fn update(mut self, request: RoleRequest, now: DateTime<Utc>) -> Result<Self> {
        if let Some(policies) = request.policies {
            self.policies = normalize_policies(policies)?;
        }
        if let Some(bind) = request.bind_secret_id {
            self.bind_secret_id = bind;
        }
        if let Some(ttl) = positive(request.secret_id_ttl, "secret_id_ttl")? {
            self.secret_id_ttl = Some(ttl);
        }
        if let Some(uses) = request.secret_id_num_uses {
            if uses == 0 {
                return Err(Error::invalid("secret_id_num_uses must be positive"));
            }
            self.secret_id_num_uses = Some(uses);
        }
        if let Some(cidrs) = request.secret_id_bound_cidrs {
            self.secret_id_bound_cidrs = parse_cidrs(&cidrs)?;
        }
        if let Some(ttl) = positive(request.token_ttl, "token_ttl")? {
            self.token_ttl = Some(ttl);
        }
        if let Some(ttl) = positive(request.token_max_ttl, "token_max_ttl")? {
            self.token_max_ttl = Some(ttl);
        }

        if let (Some(ttl), Some(max)) = (self.token_ttl, self.token_max_ttl) {
            if ttl > max {
                return Err(Error::invalid("token_ttl cannot exceed token_max_ttl"));
            }
        }
        if !self.bind_secret_id && self.secret_id_bound_cidrs.is_empty() {
            return Err(Error::invalid(
                "at least one of bind_secret_id or secret_id_bound_cidrs must be set",
            ));
        }

        self.updated_at = now;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_store::ErrorKind;

    fn name() -> RoleName {
        RoleName::new("test-role-1").expect("name")
    }

    #[test]
    fn create_defaults() {
        let role = Role::create(name(), RoleRequest::new(), Utc::now()).expect("create");
        assert!(role.bind_secret_id);
        assert!(role.policies.is_empty());
        assert_eq!(role.secret_id_num_uses, None);
        assert_eq!(role.secret_id_ttl, None);
    }

    #[test]
    fn policies_are_normalized() {
        let role = Role::create(
            name(),
            RoleRequest::new().with_policies(["Default", "ops", "default"]),
            Utc::now(),
        )
        .expect("create");
        assert_eq!(role.policies, vec!["default", "ops"]);
    }

    #[test]
    fn root_policy_cannot_be_attached() {
        let err = Role::create(name(), RoleRequest::new().with_policies(["ops", " Root "]), Utc::now())
            .expect_err("root should be refused");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let role = Role::create(name(), RoleRequest::new().with_policies(["ops"]), Utc::now())
            .expect("create");
        let err = role
            .update(RoleRequest::new().with_policies(["root"]), Utc::now())
            .expect_err("root should be refused on update");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn update_keeps_unset_fields() {
        let now = Utc::now();
        let role = Role::create(
            name(),
            RoleRequest::new()
                .with_policies(["ops"])
                .with_secret_id_num_uses(3)
                .with_secret_id_ttl(Duration::from_secs(600)),
            now,
        )
        .expect("create");

        let later = now + chrono::Duration::seconds(5);
        let role = role
            .update(RoleRequest::new().with_secret_id_num_uses(1), later)
            .expect("update");
        assert_eq!(role.policies, vec!["ops"]);
        assert_eq!(role.secret_id_num_uses, Some(1));
        assert_eq!(role.secret_id_ttl, Some(Duration::from_secs(600)));
        assert_eq!(role.created_at, now);
        assert_eq!(role.updated_at, later);
    }

    #[test]
    fn invalid_fields_rejected() {
        let cases = [
            RoleRequest::new().with_secret_id_num_uses(0),
            RoleRequest::new().with_secret_id_ttl(Duration::ZERO),
            RoleRequest::new().with_bound_cidrs(["nonsense"]),
            RoleRequest::new().with_policies(["bad policy"]),
            RoleRequest::new()
                .with_token_ttl(Duration::from_secs(600))
                .with_token_max_ttl(Duration::from_secs(60)),
            RoleRequest::new().with_bind_secret_id(false),
        ];
        for request in cases {
            let err = Role::create(name(), request.clone(), Utc::now())
                .expect_err(&format!("{request:?} should be rejected"));
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn cidr_only_role_is_allowed() {
        let role = Role::create(
            name(),
            RoleRequest::new()
                .with_bind_secret_id(false)
                .with_bound_cidrs(["10.0.0.0/8"]),
            Utc::now(),
        )
        .expect("create");
        assert!(!role.bind_secret_id);
        assert_eq!(role.secret_id_bound_cidrs.len(), 1);
    }

    #[test]
    fn request_deserializes_seconds() {
        let request: RoleRequest =
            serde_json::from_str(r#"{"secret_id_ttl": 600, "secret_id_num_uses": 2}"#)
                .expect("deserialize");
        assert_eq!(request.secret_id_ttl, Some(Duration::from_secs(600)));
        assert_eq!(request.secret_id_num_uses, Some(2));
        assert_eq!(request.policies, None);
    }
}
