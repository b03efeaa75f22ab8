//! Storage double that fails on demand.
//!
//! Wraps a [`MemoryStorage`] and returns [`Error::Backend`] for operations on
//! paths under a chosen prefix. Used to drive rollback and sweep paths that
//! real backends only reach on I/O errors.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::memory::MemoryStorage;
use crate::traits::Storage;

/// The class of operation a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    /// `get` and `list_prefix`.
    Read,
    /// `put`, `delete` and `compare_and_swap`.
    Write,
}

#[derive(Debug)]
struct Fault {
    op: FaultOp,
    prefix: String,
    remaining: Option<usize>,
}

/// A [`Storage`] backend that fails selected operations.
#[derive(Default)]
pub struct FaultyStorage {
    inner: MemoryStorage,
    faults: Mutex<Vec<Fault>>,
}

impl FaultyStorage {
    /// Creates an empty store with no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every `op` on paths under `prefix` until [`FaultyStorage::heal`].
    pub fn fail(&self, op: FaultOp, prefix: impl Into<String>) {
        self.faults.lock().push(Fault {
            op,
            prefix: prefix.into(),
            remaining: None,
        });
    }

    /// Fails the next `times` matching operations, then lets them through.
    pub fn fail_times(&self, op: FaultOp, prefix: impl Into<String>, times: usize) {
        self.faults.lock().push(Fault {
            op,
            prefix: prefix.into(),
            remaining: Some(times),
        });
    }

    /// Removes every fault.
    pub fn heal(&self) {
        self.faults.lock().clear();
    }

    /// The underlying store, for inspecting state without faults.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    fn check(&self, op: FaultOp, path: &str) -> Result<()> {
        let mut faults = self.faults.lock();
        for fault in faults.iter_mut() {
            if fault.op != op || !path.starts_with(&fault.prefix) {
                continue;
            }
            match &mut fault.remaining {
                Some(0) => continue,
                Some(n) => *n -= 1,
                None => {}
            }
            return Err(Error::Backend {
                reason: format!("injected {op:?} fault at '{path}'"),
            });
        }
        Ok(())
    }
}

impl Storage for FaultyStorage {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.check(FaultOp::Read, path)?;
        self.inner.get(path)
    }

    fn put(&self, path: &str, value: Vec<u8>) -> Result<()> {
        self.check(FaultOp::Write, path)?;
        self.inner.put(path, value)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.check(FaultOp::Write, path)?;
        self.inner.delete(path)
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.check(FaultOp::Read, prefix)?;
        self.inner.list_prefix(prefix)
    }

    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> Result<bool> {
        self.check(FaultOp::Write, path)?;
        self.inner.compare_and_swap(path, expected, new)
    }
}

impl std::fmt::Debug for FaultyStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyStorage")
            .field("inner", &self.inner)
            .field("faults", &self.faults.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn faults_match_by_prefix_and_op() {
        let store = FaultyStorage::new();
        store.put("cubbyhole/a", b"v".to_vec()).expect("put");
        store.fail(FaultOp::Write, "cubbyhole/");

        let err = store.put("cubbyhole/b", vec![]).expect_err("write fault");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(store.compare_and_swap("cubbyhole/a", Some(b"v"), None).is_err());
        assert_eq!(store.get("cubbyhole/a").expect("reads pass"), Some(b"v".to_vec()));
        store.put("sys/token/id/x", vec![1]).expect("other prefixes pass");

        store.heal();
        store.delete("cubbyhole/a").expect("healed");
        assert!(store.inner().get("cubbyhole/a").expect("get").is_none());
    }

    #[test]
    fn counted_faults_run_out() {
        let store = FaultyStorage::new();
        store.fail_times(FaultOp::Read, "", 2);

        assert!(store.get("k").is_err());
        assert!(store.list_prefix("").is_err());
        assert_eq!(store.get("k").expect("third read passes"), None);
    }
}
