//! Keyed hashing of tokens, accessors and secret identifiers.
//!
//! Raw credentials never appear in a storage path. Every path component
//! derived from a credential is a BLAKE3 keyed hash under a salt that is
//! generated once and persisted.

use rand::RngCore;
use tracing::info;
use warden_store::ScopedStore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Salt length in bytes.
pub const SALT_SIZE: usize = 32;

/// Storage path of the salt, relative to the `sys/` scope.
pub const SALT_PATH: &str = "salt";

/// A hashing key for credential-derived storage paths.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Salt {
    key: [u8; SALT_SIZE],
}

impl Salt {
    /// Generates a fresh random salt.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    /// Creates a salt from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: [u8; SALT_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::invalid(format!("salt must be {SALT_SIZE} bytes, got {}", bytes.len())))?;
        Ok(Self { key })
    }

    /// Loads the persisted salt, creating it if absent.
    ///
    /// Creation is put-if-absent, so concurrent first starts converge on
    /// whichever salt was written first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the stored salt is malformed.
    pub fn load_or_create(sys: &ScopedStore) -> Result<Self> {
        if let Some(raw) = sys.get(SALT_PATH)? {
            return Self::from_bytes(&raw);
        }

        let fresh = Self::generate();
        if sys.compare_and_swap(SALT_PATH, None, Some(fresh.key.to_vec()))? {
            info!("Generated storage salt");
            return Ok(fresh);
        }

        // Another writer won the race
        let raw = sys.get(SALT_PATH)?.ok_or(Error::NotFound)?;
        Self::from_bytes(&raw)
    }

    /// Returns the hex keyed hash of `value`.
    #[must_use]
    pub fn hash(&self, value: &str) -> String {
        blake3::keyed_hash(&self.key, value.as_bytes())
            .to_hex()
            .to_string()
    }

    /// Derives an independent salt for one namespace, such as an auth mount.
    #[must_use]
    pub fn derive(&self, context: &str) -> Self {
        let context = format!("warden salt v1 {context}");
        Self {
            key: blake3::derive_key(&context, &self.key),
        }
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Salt").field("key", &"[REDACTED]").finish()
    }
}
