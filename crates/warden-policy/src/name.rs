//! Validated names for roles, policies and mounts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum length of a name.
pub const MAX_NAME_LENGTH: usize = 128;

/// Validates a name that has already been lowercased.
///
/// Names must:
/// - Be between 1 and 128 characters
/// - Contain only lowercase alphanumeric characters, hyphens, underscores, and periods
/// - Start with an alphanumeric character
///
/// # Errors
///
/// Returns [`Error::InvalidName`] describing the first violation.
pub fn validate_name(name: &str) -> Result<()> {
    let Some(first) = name.chars().next() else {
        return Err(Error::InvalidName {
            reason: "name cannot be empty".to_string(),
        });
    };

    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::InvalidName {
            reason: format!("name exceeds maximum length of {MAX_NAME_LENGTH} characters"),
        });
    }

    if !first.is_ascii_alphanumeric() {
        return Err(Error::InvalidName {
            reason: "name must start with an alphanumeric character".to_string(),
        });
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(Error::InvalidName {
            reason: format!(
                "name contains invalid character '{c}'; only alphanumeric, hyphens, underscores, and periods are allowed"
            ),
        });
    }

    Ok(())
}

/// A validated, lowercase-normalized role name.
///
/// `Test-Role-1` and `test-role-1` name the same role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Normalizes and validates a role name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is empty or has invalid characters.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim().to_lowercase();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoleName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("test-role-1" ; "hyphenated")]
    #[test_case("web_api.v2" ; "underscore and period")]
    #[test_case("0day" ; "leading digit")]
    fn valid_names(name: &str) {
        assert!(validate_name(name).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("-role" ; "leading hyphen")]
    #[test_case("role/other" ; "slash")]
    #[test_case("role*" ; "glob")]
    #[test_case("Role" ; "uppercase")]
    fn invalid_names(name: &str) {
        assert!(validate_name(name).is_err(), "expected '{name}' to be rejected");
    }

    #[test]
    fn overlong_name_rejected() {
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn role_names_are_lowercased() {
        let name = RoleName::new("Test-Role-1").expect("valid");
        assert_eq!(name.as_str(), "test-role-1");
        assert_eq!(name, RoleName::new("test-role-1").expect("valid"));
    }

    #[test]
    fn role_name_serde() {
        let name: RoleName = serde_json::from_str("\"WEB\"").expect("deserialize");
        assert_eq!(name.as_str(), "web");
        assert!(serde_json::from_str::<RoleName>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&name).expect("serialize"), "\"web\"");
    }
}
