//! In-memory storage backend.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::Result;
use crate::traits::{immediate_children, validate_path, Storage};

/// A [`Storage`] backend holding every entry in process memory.
///
/// All operations take the map lock for their full duration, so
/// [`Storage::compare_and_swap`] is trivially linearizable.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns a copy of every entry, for snapshotting.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.entries.read().clone()
    }

    /// Replaces every entry, discarding the current contents.
    pub(crate) fn reload(&self, entries: BTreeMap<String, Vec<u8>>) {
        *self.entries.write() = entries;
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies `mutation` under the write lock and hands the resulting map to
    /// `commit`. If `commit` fails the mutation is undone.
    pub(crate) fn mutate<T>(
        &self,
        mutation: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> (T, Option<Undo>),
        commit: impl FnOnce(&BTreeMap<String, Vec<u8>>) -> Result<()>,
    ) -> Result<T> {
        let mut entries = self.entries.write();
        let (outcome, undo) = mutation(&mut entries);
        if let Some(undo) = undo {
            if let Err(e) = commit(&entries) {
                undo.apply(&mut entries);
                return Err(e);
            }
        }
        Ok(outcome)
    }
}

/// The previous state of one path, used to roll back a failed commit.
pub(crate) struct Undo {
    path: String,
    previous: Option<Vec<u8>>,
}

impl Undo {
    fn apply(self, entries: &mut BTreeMap<String, Vec<u8>>) {
        match self.previous {
            Some(value) => {
                entries.insert(self.path, value);
            }
            None => {
                entries.remove(&self.path);
            }
        }
    }
}

fn replace(
    entries: &mut BTreeMap<String, Vec<u8>>,
    path: &str,
    value: Option<Vec<u8>>,
) -> Option<Undo> {
    let previous = match value {
        Some(value) => entries.insert(path.to_string(), value),
        None => {
            let previous = entries.remove(path);
            previous.as_ref()?;
            previous
        }
    };
    Some(Undo {
        path: path.to_string(),
        previous,
    })
}

pub(crate) fn put_op(
    path: &str,
    value: Vec<u8>,
) -> impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> ((), Option<Undo>) {
    move |entries| ((), replace(entries, path, Some(value)))
}

pub(crate) fn delete_op(path: &str) -> impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> ((), Option<Undo>) {
    move |entries| ((), replace(entries, path, None))
}

pub(crate) fn cas_op<'a>(
    path: &'a str,
    expected: Option<&'a [u8]>,
    new: Option<Vec<u8>>,
) -> impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> (bool, Option<Undo>) + 'a {
    move |entries| {
        if entries.get(path).map(Vec::as_slice) != expected {
            return (false, None);
        }
        (true, replace(entries, path, new))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        validate_path(path)?;
        Ok(self.entries.read().get(path).cloned())
    }

    fn put(&self, path: &str, value: Vec<u8>) -> Result<()> {
        validate_path(path)?;
        self.mutate(put_op(path, value), |_| Ok(()))
    }

    fn delete(&self, path: &str) -> Result<()> {
        validate_path(path)?;
        self.mutate(delete_op(path), |_| Ok(()))
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read();
        Ok(immediate_children(entries.keys(), prefix))
    }

    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> Result<bool> {
        validate_path(path)?;
        self.mutate(cas_op(path, expected, new), |_| Ok(()))
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn memory_storage_new_is_empty() {
        let store = MemoryStorage::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn put_get_delete() {
        let store = MemoryStorage::new();

        store.put("a/b", b"one".to_vec()).expect("put");
        assert_eq!(store.get("a/b").expect("get"), Some(b"one".to_vec()));

        store.put("a/b", b"two".to_vec()).expect("overwrite");
        assert_eq!(store.get("a/b").expect("get"), Some(b"two".to_vec()));

        store.delete("a/b").expect("delete");
        assert_eq!(store.get("a/b").expect("get"), None);

        // Deleting again is fine
        store.delete("a/b").expect("delete missing");
    }

    #[test]
    fn rejects_invalid_paths() {
        let store = MemoryStorage::new();
        assert!(store.put("/abs", vec![]).is_err());
        assert!(store.get("").is_err());
        assert!(store.compare_and_swap("a//b", None, None).is_err());
    }

    #[test]
    fn list_prefix_is_ordered() {
        let store = MemoryStorage::new();
        store.put("role/zeta", vec![1]).expect("put");
        store.put("role/alpha", vec![1]).expect("put");
        store.put("role/mid", vec![1]).expect("put");
        store.put("other/x", vec![1]).expect("put");

        let roles = store.list_prefix("role/").expect("list");
        assert_eq!(roles, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn cas_put_if_absent() {
        let store = MemoryStorage::new();

        assert!(store.compare_and_swap("k", None, Some(b"v1".to_vec())).expect("cas"));
        assert!(!store.compare_and_swap("k", None, Some(b"v2".to_vec())).expect("cas"));
        assert_eq!(store.get("k").expect("get"), Some(b"v1".to_vec()));
    }

    #[test]
    fn cas_replace_and_delete() {
        let store = MemoryStorage::new();
        store.put("k", b"v1".to_vec()).expect("put");

        assert!(!store
            .compare_and_swap("k", Some(b"other"), Some(b"v2".to_vec()))
            .expect("cas"));
        assert!(store
            .compare_and_swap("k", Some(b"v1"), Some(b"v2".to_vec()))
            .expect("cas"));
        assert!(store.compare_and_swap("k", Some(b"v2"), None).expect("cas"));
        assert_eq!(store.get("k").expect("get"), None);

        // The value is gone, so the same expectation no longer matches
        assert!(!store.compare_and_swap("k", Some(b"v2"), None).expect("cas"));
    }

    #[test]
    fn cas_single_winner_under_contention() {
        let store = Arc::new(MemoryStorage::new());
        store.put("ticket", b"open".to_vec()).expect("put");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .compare_and_swap("ticket", Some(b"open"), None)
                        .expect("cas")
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should complete"))
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn failed_commit_is_rolled_back() {
        let store = MemoryStorage::new();
        store.put("k", b"v1".to_vec()).expect("put");

        let result = store.mutate(put_op("k", b"v2".to_vec()), |_| {
            Err(crate::Error::Backend {
                reason: "injected".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(store.get("k").expect("get"), Some(b"v1".to_vec()));
    }
}
