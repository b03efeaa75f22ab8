//! Prefix-scoped views over a storage backend.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::error::{Error, Result};
use crate::traits::{validate_path, Storage};

/// A view of a [`Storage`] backend confined to one path prefix.
///
/// Every path handed to a `ScopedStore` is relative to its prefix, so a
/// component holding one can never address another component's entries.
#[derive(Clone)]
pub struct ScopedStore {
    backend: Arc<dyn Storage>,
    prefix: String,
}

impl ScopedStore {
    /// Creates a view of `backend` rooted at `prefix`.
    ///
    /// The prefix must be empty or end with `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is malformed.
    pub fn new(backend: Arc<dyn Storage>, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { backend, prefix })
    }

    /// Returns a nested view rooted at `self.prefix + prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is malformed.
    pub fn sub(&self, prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;
        Ok(Self {
            backend: Arc::clone(&self.backend),
            prefix: format!("{}{prefix}", self.prefix),
        })
    }

    /// Returns the absolute prefix of this view.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full(&self, path: &str) -> Result<String> {
        validate_path(path)?;
        Ok(format!("{}{path}", self.prefix))
    }

    /// Reads the value at `path`.
    pub fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(&self.full(path)?)
    }

    /// Writes `value` at `path`.
    pub fn put(&self, path: &str, value: Vec<u8>) -> Result<()> {
        self.backend.put(&self.full(path)?, value)
    }

    /// Deletes the value at `path`.
    pub fn delete(&self, path: &str) -> Result<()> {
        self.backend.delete(&self.full(path)?)
    }

    /// Lists the immediate children of `prefix` within this view.
    pub fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !prefix.is_empty() {
            validate_prefix(prefix)?;
        }
        self.backend.list_prefix(&format!("{}{prefix}", self.prefix))
    }

    /// Atomic check-and-set on `path`. See [`Storage::compare_and_swap`].
    pub fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> Result<bool> {
        self.backend.compare_and_swap(&self.full(path)?, expected, new)
    }

    /// Reads and decodes a JSON value, returning the raw bytes alongside it.
    ///
    /// The raw bytes are what a later [`ScopedStore::compare_and_swap`] must
    /// present as `expected`.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<(T, Vec<u8>)>> {
        match self.get(path)? {
            Some(raw) => {
                let value = codec::decode(&raw)?;
                Ok(Some((value, raw)))
            }
            None => Ok(None),
        }
    }

    /// Encodes and writes a JSON value.
    pub fn put_json<T: Serialize>(&self, path: &str, value: &T) -> Result<()> {
        self.put(path, codec::encode(value)?)
    }
}

impl Storage for ScopedStore {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Self::get(self, path)
    }

    fn put(&self, path: &str, value: Vec<u8>) -> Result<()> {
        Self::put(self, path, value)
    }

    fn delete(&self, path: &str) -> Result<()> {
        Self::delete(self, path)
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.list(prefix)
    }

    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> Result<bool> {
        Self::compare_and_swap(self, path, expected, new)
    }
}

impl std::fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    let Some(trimmed) = prefix.strip_suffix('/') else {
        return Err(Error::InvalidPath {
            reason: format!("prefix '{prefix}' must end with '/'"),
        });
    };
    validate_path(trimmed)
}
