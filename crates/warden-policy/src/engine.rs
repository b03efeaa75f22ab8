//! Authorization of administrative actions against attached policies.

use std::sync::Arc;

use tracing::debug;

use crate::action::Action;
use crate::error::{Error, Result};
use crate::policy::{evaluate, ROOT_POLICY};
use crate::store::PolicyStore;

/// Decides whether a caller's attached policies permit an action.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    store: Arc<PolicyStore>,
}

impl PolicyEngine {
    /// Creates an engine resolving policy names through `store`.
    #[must_use]
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying policy store.
    #[must_use]
    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// Returns true if any of `attached` permits `action` on `role` under `mount`.
    ///
    /// `root` permits everything. Names that do not resolve to a stored
    /// policy permit nothing.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub fn is_authorized(
        &self,
        mount: &str,
        action: Action,
        role: &str,
        attached: &[String],
    ) -> Result<bool> {
        if attached.iter().any(|name| name == ROOT_POLICY) {
            return Ok(true);
        }

        let mut policies = Vec::with_capacity(attached.len());
        for name in attached {
            match self.store.try_get(name) {
                Ok(Some(policy)) => policies.push(policy),
                Ok(None) | Err(Error::InvalidName { .. }) => {
                    debug!(policy = %name, "Attached policy does not exist");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(evaluate(&policies, mount, action, role))
    }

    /// Like [`PolicyEngine::is_authorized`], but fails with
    /// [`Error::PermissionDenied`] when not permitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or a storage error.
    pub fn authorize(
        &self,
        mount: &str,
        action: Action,
        role: &str,
        attached: &[String],
    ) -> Result<()> {
        if self.is_authorized(mount, action, role, attached)? {
            Ok(())
        } else {
            debug!(mount, action = %action, role, "Policy denied action");
            Err(Error::PermissionDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::policy::{Policy, Rule};
    use warden_store::{ErrorKind, MemoryStorage, ScopedStore};

    fn engine() -> PolicyEngine {
        let store = PolicyStore::new(
            ScopedStore::new(Arc::new(MemoryStorage::new()), "sys/policy/").expect("prefix"),
        );
        store
            .put(
                &Policy::new("p1").expect("name").with_rule(
                    Rule::new(Pattern::parse("approle").expect("pattern"))
                        .allow([Action::UpdateRoleSecretId])
                        .on_role(Pattern::parse("r1").expect("pattern")),
                ),
            )
            .expect("put");
        store
            .put(
                &Policy::new("p2").expect("name").with_rule(
                    Rule::new(Pattern::parse("approle").expect("pattern"))
                        .allow([Action::ReadRole])
                        .on_role(Pattern::parse("web-*").expect("pattern")),
                ),
            )
            .expect("put");
        PolicyEngine::new(Arc::new(store))
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn union_of_attached_policies() {
        let engine = engine();
        let both = names(&["p1", "p2"]);
        let only_p2 = names(&["p2"]);

        assert!(engine
            .is_authorized("approle", Action::UpdateRoleSecretId, "r1", &both)
            .expect("eval"));
        assert!(!engine
            .is_authorized("approle", Action::UpdateRoleSecretId, "r1", &only_p2)
            .expect("eval"));
        assert!(engine
            .is_authorized("approle", Action::ReadRole, "web-frontend", &only_p2)
            .expect("eval"));
    }

    #[test]
    fn root_allows_everything() {
        let engine = engine();
        for action in Action::all() {
            assert!(engine
                .is_authorized("anything", *action, "any-role", &names(&["root"]))
                .expect("eval"));
        }
    }

    #[test]
    fn unknown_policies_grant_nothing() {
        let engine = engine();
        let attached = names(&["missing", "Not A Name", "default"]);
        assert!(!engine
            .is_authorized("approle", Action::ReadRole, "web-x", &attached)
            .expect("eval"));
        assert!(!engine
            .is_authorized("approle", Action::ReadRole, "web-x", &[])
            .expect("eval"));
    }

    #[test]
    fn authorize_denies_generically() {
        let engine = engine();
        let err = engine
            .authorize("approle", Action::DeleteRole, "r1", &names(&["p1"]))
            .expect_err("denied");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.to_string(), "permission denied");
    }
}
