//! File-backed storage.
//!
//! The keyspace is written out as a single JSON snapshot after every mutation.
//! Values are base64 so arbitrary bytes survive the round trip. The snapshot is
//! replaced atomically via a temporary file in the same directory.
//!
//! Several processes may open the same snapshot. Every operation holds an
//! exclusive lock on a sibling `.lock` file and reloads the snapshot from disk
//! before acting, so a compare-and-swap in one process sees every write
//! committed by another. A mutation whose snapshot fails to persist is rolled
//! back in memory.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::memory::{cas_op, delete_op, put_op, MemoryStorage};
use crate::traits::{validate_path, Storage};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// Exclusive inter-process lock, released on drop.
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well.
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// A [`Storage`] backend persisted to one JSON file.
pub struct FileStorage {
    path: PathBuf,
    lock_path: PathBuf,
    inner: MemoryStorage,
}

impl FileStorage {
    /// Opens the snapshot at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lock_path = lock_path_for(&path);
        let store = Self {
            path,
            lock_path,
            inner: MemoryStorage::new(),
        };

        if store.path.exists() {
            let _guard = store.lock()?;
            store.refresh()?;
            info!(path = %store.path.display(), entries = store.inner.len(), "Loaded storage snapshot");
        } else {
            debug!(path = %store.path.display(), "No storage snapshot, starting empty");
        }
        Ok(store)
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<LockGuard> {
        fs::create_dir_all(parent_dir(&self.lock_path))?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(LockGuard { file })
    }

    /// Replaces the in-memory view with what is on disk. Caller holds the lock.
    fn refresh(&self) -> Result<()> {
        self.inner.reload(Self::load(&self.path)?);
        Ok(())
    }

    /// Runs `op` against a fresh view of the snapshot under the file lock.
    fn locked<T>(&self, op: impl FnOnce(&MemoryStorage) -> Result<T>) -> Result<T> {
        let _guard = self.lock()?;
        self.refresh()?;
        op(&self.inner)
    }

    fn load(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&raw).map_err(|e| Error::Serialization {
            reason: format!("corrupt snapshot {}: {e}", path.display()),
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Backend {
                reason: format!("unsupported snapshot version {}", snapshot.version),
            });
        }

        let mut entries = BTreeMap::new();
        for (key, value) in snapshot.entries {
            let bytes = STANDARD.decode(&value).map_err(|e| Error::Serialization {
                reason: format!("corrupt value at '{key}': {e}"),
            })?;
            entries.insert(key, bytes);
        }
        Ok(entries)
    }

    fn persist(path: &Path, entries: &BTreeMap<String, Vec<u8>>) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries: entries
                .iter()
                .map(|(k, v)| (k.clone(), STANDARD.encode(v)))
                .collect(),
        };
        let raw = serde_json::to_vec(&snapshot).map_err(|e| Error::Serialization {
            reason: e.to_string(),
        })?;

        let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
        tmp.write_all(&raw)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("store"), ToOwned::to_owned);
    name.push(".lock");
    path.with_file_name(name)
}

impl Storage for FileStorage {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        validate_path(path)?;
        self.locked(|inner| inner.get(path))
    }

    fn put(&self, path: &str, value: Vec<u8>) -> Result<()> {
        validate_path(path)?;
        self.locked(|inner| {
            inner.mutate(put_op(path, value), |entries| Self::persist(&self.path, entries))
        })
    }

    fn delete(&self, path: &str) -> Result<()> {
        validate_path(path)?;
        self.locked(|inner| {
            inner.mutate(delete_op(path), |entries| Self::persist(&self.path, entries))
        })
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.locked(|inner| inner.list_prefix(prefix))
    }

    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> Result<bool> {
        validate_path(path)?;
        self.locked(|inner| {
            inner.mutate(cas_op(path, expected, new), |entries| {
                Self::persist(&self.path, entries)
            })
        })
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .field("lock_path", &self.lock_path)
            .finish_non_exhaustive()
    }
}
