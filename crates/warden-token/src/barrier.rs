//! Payload encryption at rest.
//!
//! Cubbyhole payloads are sealed with ChaCha20-Poly1305 under a key derived
//! from the barrier master key and the owning token's hash, so every entry has
//! its own key and a raw dump of storage never contains a wrapped secret.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of the barrier key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// The master key that seals cubbyhole payloads.
///
/// The key is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BarrierKey {
    bytes: [u8; KEY_SIZE],
}

impl BarrierKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| Error::Encryption {
            reason: format!("key must be exactly {KEY_SIZE} bytes, got {}", bytes.len()),
        })?;
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Derives the key for one cubbyhole entry.
    #[must_use]
    pub fn derive_for_entry(&self, entry: &str) -> Self {
        let context = format!("warden cubbyhole v1 {entry}");
        Self {
            bytes: blake3::derive_key(&context, &self.bytes),
        }
    }

    /// Seals `plaintext`, producing `nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, plaintext).map_err(|e| Error::Encryption {
            reason: format!("encryption failed: {e}"),
        })?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Opens a value produced by [`BarrierKey::seal`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input is truncated or fails authentication.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Encryption {
                reason: format!(
                    "sealed value too short: expected at least {} bytes, got {}",
                    NONCE_SIZE + TAG_SIZE,
                    sealed.len()
                ),
            });
        }

        let cipher = self.cipher()?;
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::Encryption {
                reason: format!("decryption failed: {e}"),
            })
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.bytes).map_err(|e| Error::Encryption {
            reason: format!("failed to create cipher: {e}"),
        })
    }
}

impl std::fmt::Debug for BarrierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarrierKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_checks_length() {
        assert!(BarrierKey::from_bytes(&[7u8; KEY_SIZE]).is_ok());
        assert!(BarrierKey::from_bytes(&[7u8; 16]).is_err());
        assert!(BarrierKey::from_bytes(&[7u8; 64]).is_err());
    }

    #[test]
    fn debug_redacts() {
        let key = BarrierKey::generate();
        assert!(format!("{key:?}").contains("[REDACTED]"));
    }

    #[test]
    fn derived_keys_are_per_entry() {
        let master = BarrierKey::generate();
        let a = master.derive_for_entry("hash-a");
        let b = master.derive_for_entry("hash-b");

        assert_eq!(a.as_bytes(), master.derive_for_entry("hash-a").as_bytes());
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), master.as_bytes());
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = BarrierKey::generate().derive_for_entry("entry");
        let sealed = key.seal(b"secret_id payload").expect("seal");

        assert_eq!(sealed.len(), NONCE_SIZE + 17 + TAG_SIZE);
        assert_eq!(key.open(&sealed).expect("open"), b"secret_id payload");
    }

    #[test]
    fn open_with_other_entry_key_fails() {
        let master = BarrierKey::generate();
        let sealed = master.derive_for_entry("a").seal(b"x").expect("seal");
        assert!(master.derive_for_entry("b").open(&sealed).is_err());
    }

    #[test]
    fn tampered_or_truncated_fails() {
        let key = BarrierKey::generate();
        let mut sealed = key.seal(b"payload").expect("seal");
        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0xFF;
        }
        assert!(key.open(&sealed).is_err());
        assert!(key.open(&[0u8; NONCE_SIZE + TAG_SIZE - 1]).is_err());
    }
}
