//! The identity a request is evaluated as.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_store::codec::option_duration_secs;

use crate::policy::ROOT_POLICY;

/// The caller of an administrative operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Policies attached to the caller's token.
    pub policies: Vec<String>,
    /// Wrapping TTL applied when a request does not ask for one.
    #[serde(default, with = "option_duration_secs", skip_serializing_if = "Option::is_none")]
    pub default_wrap_ttl: Option<Duration>,
    /// Label for log lines.
    #[serde(default)]
    pub display_name: String,
}

impl CallerContext {
    /// Creates a caller holding `policies`.
    #[must_use]
    pub fn new(policies: Vec<String>) -> Self {
        Self {
            policies,
            ..Self::default()
        }
    }

    /// Creates a caller holding the `root` policy.
    #[must_use]
    pub fn root() -> Self {
        Self {
            policies: vec![ROOT_POLICY.to_string()],
            display_name: ROOT_POLICY.to_string(),
            ..Self::default()
        }
    }

    /// Sets a wrapping TTL used when requests do not name one.
    #[must_use]
    pub const fn with_default_wrap_ttl(mut self, ttl: Duration) -> Self {
        self.default_wrap_ttl = Some(ttl);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Returns true if the caller holds `root`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.policies.iter().any(|p| p == ROOT_POLICY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_caller() {
        assert!(CallerContext::root().is_root());
        assert!(!CallerContext::new(vec!["ops".to_string()]).is_root());
    }

    #[test]
    fn default_wrap_ttl_builder() {
        let caller = CallerContext::new(vec![]).with_default_wrap_ttl(Duration::from_secs(300));
        assert_eq!(caller.default_wrap_ttl, Some(Duration::from_secs(300)));
    }
}
