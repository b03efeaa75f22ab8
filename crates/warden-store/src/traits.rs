//! The storage trait consumed by every Warden component.
//!
//! This module provides the [`Storage`] trait for abstracting over backends,
//! plus the path rules and listing helper that all backends share.

use crate::error::{Error, Result};

/// A durable mapping from path to opaque blob.
///
/// Paths are `/`-separated, relative (no leading `/`), and never contain empty
/// or `..` segments. Implementations must make [`Storage::compare_and_swap`]
/// atomic with respect to every other operation on the same path.
pub trait Storage: Send + Sync {
    /// Reads the value at `path`, or `None` if nothing is stored there.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed or the backend fails.
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` at `path`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed or the backend fails.
    fn put(&self, path: &str, value: Vec<u8>) -> Result<()>;

    /// Removes the value at `path`. Deleting a missing path is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed or the backend fails.
    fn delete(&self, path: &str) -> Result<()>;

    /// Lists the immediate children of `prefix` in lexical order.
    ///
    /// Leaf entries are returned by name; deeper entries are collapsed into a
    /// single `name/` element.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Atomically replaces the value at `path` if it currently equals `expected`.
    ///
    /// `expected == None` means "only if absent"; `new == None` deletes.
    /// Returns `true` if the swap happened, `false` if the current value did
    /// not match.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed or the backend fails.
    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> Result<bool>;
}

/// Validates a storage path.
///
/// # Errors
///
/// Returns an error if the path is empty, absolute, or has empty or `..` segments.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidPath {
            reason: "path cannot be empty".to_string(),
        });
    }

    if path.starts_with('/') {
        return Err(Error::InvalidPath {
            reason: format!("path '{path}' must be relative"),
        });
    }

    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(Error::InvalidPath {
                reason: format!("path '{path}' contains an empty segment"),
            });
        }
        if segment == ".." || segment == "." {
            return Err(Error::InvalidPath {
                reason: format!("path '{path}' contains a relative segment"),
            });
        }
    }

    Ok(())
}

/// Collapses sorted keys under `prefix` into their immediate children.
pub(crate) fn immediate_children<'a>(
    keys: impl Iterator<Item = &'a String>,
    prefix: &str,
) -> Vec<String> {
    let mut children: Vec<String> = Vec::new();
    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let child = match rest.find('/') {
            Some(idx) => &rest[..=idx],
            None => rest,
        };
        if children.last().map(String::as_str) != Some(child) {
            children.push(child.to_string());
        }
    }
    children
}
