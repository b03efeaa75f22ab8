//! Policy documents.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{Error, Result};
use crate::name::validate_name;
use crate::pattern::Pattern;

/// Name of the reserved policy that allows everything.
pub const ROOT_POLICY: &str = "root";

/// One allow-rule: the actions permitted on matching roles under matching mounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Auth mounts the rule applies to.
    pub mount: Pattern,
    /// Actions the rule permits.
    pub actions: BTreeSet<Action>,
    /// Roles the rule applies to.
    pub roles: Vec<Pattern>,
}

impl Rule {
    /// Creates a rule for one mount.
    #[must_use]
    pub fn new(mount: Pattern) -> Self {
        Self {
            mount,
            actions: BTreeSet::new(),
            roles: Vec::new(),
        }
    }

    /// Adds permitted actions.
    #[must_use]
    pub fn allow(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Adds a role pattern.
    #[must_use]
    pub fn on_role(mut self, role: Pattern) -> Self {
        self.roles.push(role);
        self
    }

    /// Returns true if this rule permits `action` on `role` under `mount`.
    #[must_use]
    pub fn allows(&self, mount: &str, action: Action, role: &str) -> bool {
        self.mount.matches(mount)
            && self.actions.contains(&action)
            && self.roles.iter().any(|pattern| pattern.matches(role))
    }
}

/// A named set of allow-rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy name.
    pub name: String,
    /// Allow-rules; any one matching rule grants.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Policy {
    /// Creates an empty policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is malformed.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim().to_lowercase();
        validate_name(&name)?;
        Ok(Self {
            name,
            rules: Vec::new(),
        })
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Parses a policy from JSON, normalizing and validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or names unknown
    /// actions or invalid patterns.
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let mut policy: Self = serde_json::from_slice(raw).map_err(|e| Error::InvalidPolicy {
            reason: e.to_string(),
        })?;
        policy.name = policy.name.trim().to_lowercase();
        policy.validate()?;
        Ok(policy)
    }

    /// Checks the policy is well formed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is malformed or a rule has no actions or
    /// no roles.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.actions.is_empty() {
                return Err(Error::InvalidPolicy {
                    reason: format!("rule {idx} grants no actions"),
                });
            }
            if rule.roles.is_empty() {
                return Err(Error::InvalidPolicy {
                    reason: format!("rule {idx} names no roles"),
                });
            }
        }
        Ok(())
    }

    /// Returns true if any rule permits `action` on `role` under `mount`.
    #[must_use]
    pub fn allows(&self, mount: &str, action: Action, role: &str) -> bool {
        self.rules.iter().any(|rule| rule.allows(mount, action, role))
    }
}

/// Returns true if any of `policies` permits the action.
///
/// Authorization is purely additive: there is no deny rule, so adding a
/// policy can only widen what is allowed.
#[must_use]
pub fn evaluate<'a>(
    policies: impl IntoIterator<Item = &'a Policy>,
    mount: &str,
    action: Action,
    role: &str,
) -> bool {
    let role = role.to_lowercase();
    let mount = mount.to_lowercase();
    policies
        .into_iter()
        .any(|policy| policy.allows(&mount, action, &role))
}
