//! Barrier key persistence.
//!
//! The key is stored base64-encoded in a file next to the data, created with
//! owner-only permissions on Unix. It is never written to the store itself.
//! A new key is written to a temporary file and linked into place only once
//! complete, so a concurrent opener never reads a partial key.

use std::fs;
use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tempfile::NamedTempFile;
use tracing::info;
use warden_token::BarrierKey;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Loads the barrier key at `path`, generating and writing one if the file
/// does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written, or does not hold
/// a valid key.
pub fn load_or_create(path: &Path) -> Result<BarrierKey> {
    if path.exists() {
        return load(path);
    }

    let key = BarrierKey::generate();
    let mut encoded = STANDARD.encode(key.as_bytes());

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    // Temporary files are created owner-only on Unix.
    let written = NamedTempFile::new_in(dir).and_then(|mut tmp| {
        tmp.write_all(encoded.as_bytes())?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    });
    encoded.zeroize();
    let tmp = written.map_err(|e| Error::file(path, e))?;

    match tmp.persist_noclobber(path) {
        Ok(_) => {
            info!(path = %path.display(), "Generated barrier key");
            Ok(key)
        }
        // Another process created it first.
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => load(path),
        Err(e) => Err(Error::file(path, e.error)),
    }
}

/// Loads the barrier key at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a valid key.
pub fn load(path: &Path) -> Result<BarrierKey> {
    let mut encoded = fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    let decoded = STANDARD.decode(encoded.trim());
    encoded.zeroize();
    let mut bytes = decoded.map_err(|e| Error::config(format!("barrier key is not base64: {e}")))?;
    let key = BarrierKey::from_bytes(&bytes);
    bytes.zeroize();
    Ok(key?)
}
