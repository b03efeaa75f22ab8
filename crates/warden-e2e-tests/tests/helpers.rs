//! Test helpers for E2E tests.

#![allow(dead_code)]

use std::sync::Arc;

use warden_approle::{Issuer, RoleRequest};
use warden_core::{Core, WardenConfig};
use warden_policy::{Action, CallerContext, Pattern, Policy, Rule};
use warden_token::Token;

/// A fresh in-memory instance with its root caller.
pub struct TestWarden {
    pub core: Arc<Core>,
    pub root: CallerContext,
    pub root_token: Token,
}

impl TestWarden {
    /// Opens an in-memory instance and mints a root token.
    pub fn start() -> Self {
        Self::with_config(WardenConfig::default())
    }

    /// Opens an instance for `config` and mints a root token.
    pub fn with_config(config: WardenConfig) -> Self {
        let core = Arc::new(Core::open(config).expect("open core"));
        let issued = core.create_root_token().expect("root token");
        let root = core.caller(&issued.token).expect("root caller");
        Self {
            core,
            root,
            root_token: issued.token,
        }
    }

    /// The issuer for `mount`.
    pub fn approle(&self, mount: &str) -> Arc<Issuer> {
        self.core.approle(mount).expect("mount")
    }

    /// Writes a policy granting `actions` on roles matching `role` under
    /// mounts matching `mount`.
    pub fn grant(&self, name: &str, mount: &str, role: &str, actions: &[Action]) {
        let policy = Policy::new(name).expect("policy name").with_rule(
            Rule::new(Pattern::parse(mount).expect("mount pattern"))
                .allow(actions.iter().copied())
                .on_role(Pattern::parse(role).expect("role pattern")),
        );
        self.core.put_policy(&self.root, &policy).expect("put policy");
    }

    /// Mints a token carrying `policies` and resolves it into a caller.
    pub fn caller_with(&self, policies: &[&str]) -> CallerContext {
        let request = warden_token::TokenRequest::new(policies.iter().map(ToString::to_string).collect());
        let issued = self.core.create_token(&self.root, request, None).expect("token");
        self.core.caller(&issued.token).expect("caller")
    }

    /// Creates `name` on `mount` as root with single-use secret-ids.
    pub fn single_use_role(&self, mount: &str, name: &str) {
        self.approle(mount)
            .write_role(
                &self.root,
                name,
                RoleRequest::new()
                    .with_policies(["app"])
                    .with_secret_id_num_uses(1),
            )
            .expect("write role");
    }
}
