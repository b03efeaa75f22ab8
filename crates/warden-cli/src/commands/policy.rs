//! Policy management command implementation.

use std::io::Write;
use std::path::Path;

use warden_policy::Policy;

use crate::cli::PolicyCommands;
use crate::error::CliError;
use crate::output::{Message, NameList, OutputFormat};
use crate::session::Session;

/// Handler for policy subcommands.
pub struct PolicyCommand<'a> {
    session: &'a Session,
}

impl<'a> PolicyCommand<'a> {
    /// Creates a new policy command handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Executes the policy subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &PolicyCommands,
    ) -> Result<(), CliError> {
        let caller = self.session.caller()?;
        let core = self.session.core();
        match command {
            PolicyCommands::Write { name, file } => {
                let policy = read_policy_file(name, file)?;
                core.put_policy(&caller, &policy)?;
                format.write(out, &Message::new(format!("Wrote policy '{}'", policy.name)))
            }
            PolicyCommands::Read { name } => format.write(out, &core.read_policy(&caller, name)?),
            PolicyCommands::Delete { name } => {
                core.delete_policy(&caller, name)?;
                format.write(out, &Message::new(format!("Deleted policy '{name}'")))
            }
            PolicyCommands::List => format.write(out, &NameList::new("Policies", core.list_policies(&caller)?)),
        }
    }
}

/// Reads a policy document, taking its name from the command line.
fn read_policy_file(name: &str, path: &Path) -> Result<Policy, CliError> {
    let raw = std::fs::read(path)?;
    let mut document: serde_json::Value = serde_json::from_slice(&raw)
        .map_err(|e| CliError::InvalidArgument(format!("{}: {e}", path.display())))?;
    let Some(fields) = document.as_object_mut() else {
        return Err(CliError::InvalidArgument(format!(
            "{}: policy must be a JSON object",
            path.display()
        )));
    };
    fields.insert("name".to_string(), serde_json::Value::String(name.to_string()));
    let bytes = serde_json::to_vec(&document).map_err(|e| CliError::Format(e.to_string()))?;
    Ok(Policy::from_json(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_file_takes_name_from_argument() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p.json");
        std::fs::write(
            &path,
            r#"{"name": "ignored", "rules": [{"mount": "approle", "actions": ["read-role"], "roles": ["web-*"]}]}"#,
        )
        .expect("write");

        let policy = read_policy_file("Readers", &path).expect("policy");
        assert_eq!(policy.name, "readers");
        assert_eq!(policy.rules.len(), 1);
    }

    #[test]
    fn rejects_non_object_and_bad_rules() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p.json");

        std::fs::write(&path, "[]").expect("write");
        assert!(matches!(read_policy_file("p", &path), Err(CliError::InvalidArgument(_))));

        std::fs::write(&path, r#"{"rules": [{"mount": "approle", "actions": [], "roles": ["*"]}]}"#)
            .expect("write");
        assert!(matches!(read_policy_file("p", &path), Err(CliError::Warden(_))));
    }
}
