//! Administrative actions gated by policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// An administrative action on a role or its secret identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Create a role that does not exist yet.
    CreateRole,
    /// Update an existing role.
    UpdateRole,
    /// Read a role definition.
    ReadRole,
    /// Delete a role.
    DeleteRole,
    /// Issue a secret identifier for a role.
    UpdateRoleSecretId,
    /// List the secret-id accessors of a role.
    ListRoleSecretId,
    /// Look up a secret identifier by accessor.
    LookupRoleSecretIdAccessor,
    /// Destroy a secret identifier by accessor.
    DestroyRoleSecretIdAccessor,
}

impl Action {
    /// Returns every action.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::CreateRole,
            Self::UpdateRole,
            Self::ReadRole,
            Self::DeleteRole,
            Self::UpdateRoleSecretId,
            Self::ListRoleSecretId,
            Self::LookupRoleSecretIdAccessor,
            Self::DestroyRoleSecretIdAccessor,
        ]
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRole => "create-role",
            Self::UpdateRole => "update-role",
            Self::ReadRole => "read-role",
            Self::DeleteRole => "delete-role",
            Self::UpdateRoleSecretId => "update-role-secret-id",
            Self::ListRoleSecretId => "list-role-secret-id",
            Self::LookupRoleSecretIdAccessor => "lookup-role-secret-id-accessor",
            Self::DestroyRoleSecretIdAccessor => "destroy-role-secret-id-accessor",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str() == wanted)
            .ok_or_else(|| Error::UnknownAction {
                name: s.to_string(),
            })
    }
}
