//! Policy persistence under `sys/policy/`.

use tracing::info;
use warden_store::ScopedStore;

use crate::error::{Error, Result};
use crate::name::validate_name;
use crate::policy::{Policy, ROOT_POLICY};

/// Stores policies by name.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    store: ScopedStore,
}

fn normalize(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    validate_name(&name)?;
    Ok(name)
}

fn reject_root(name: &str) -> Result<()> {
    if name == ROOT_POLICY {
        return Err(Error::Reserved {
            name: name.to_string(),
        });
    }
    Ok(())
}

impl PolicyStore {
    /// Creates a policy store over `store`, which should be scoped to `sys/policy/`.
    #[must_use]
    pub fn new(store: ScopedStore) -> Self {
        Self { store }
    }

    /// Writes a policy, replacing any policy of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reserved`] for `root`, a validation error for a
    /// malformed policy, or a storage error.
    pub fn put(&self, policy: &Policy) -> Result<()> {
        policy.validate()?;
        reject_root(&policy.name)?;
        self.store.put_json(&policy.name, policy)?;
        info!(policy = %policy.name, rules = policy.rules.len(), "Wrote policy");
        Ok(())
    }

    /// Reads a policy by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such policy exists.
    pub fn get(&self, name: &str) -> Result<Policy> {
        self.try_get(name)?.ok_or(Error::NotFound)
    }

    /// Reads a policy by name, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is malformed or storage fails.
    pub fn try_get(&self, name: &str) -> Result<Option<Policy>> {
        let name = normalize(name)?;
        Ok(self
            .store
            .get_json::<Policy>(&name)?
            .map(|(policy, _)| policy))
    }

    /// Deletes a policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reserved`] for `root` and [`Error::NotFound`] if no
    /// such policy exists.
    pub fn delete(&self, name: &str) -> Result<()> {
        let name = normalize(name)?;
        reject_root(&name)?;
        let Some(raw) = self.store.get(&name)? else {
            return Err(Error::NotFound);
        };
        if self.store.compare_and_swap(&name, Some(&raw), None)? {
            info!(policy = %name, "Deleted policy");
        }
        Ok(())
    }

    /// Lists policy names in lexical order.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.store.list("")?)
    }
}
