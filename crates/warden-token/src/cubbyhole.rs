//! Per-token, one-shot payload storage.
//!
//! Each entry lives at `<hash(token)>` and holds exactly one sealed payload.
//! Reading an entry deletes it through compare-and-swap against the bytes that
//! were read, so at most one reader ever observes the payload.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_store::codec::{self, duration_secs};
use warden_store::{ExpirySweep, ScopedStore, SweepReport};
use zeroize::Zeroizing;

use crate::barrier::BarrierKey;
use crate::error::{Error, Result};

/// Metadata describing a cubbyhole entry without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// When the entry was stored.
    pub creation_time: DateTime<Utc>,
    /// When the entry stops being readable.
    pub expire_time: DateTime<Utc>,
    /// TTL the entry was created with.
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// Operation whose response is held.
    pub creation_path: String,
    /// Accessor exposed by the held payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_accessor: Option<String>,
}

impl Envelope {
    /// Returns true if the entry has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_time <= now
    }
}

#[derive(Serialize, Deserialize)]
struct CubbyholeEntry {
    #[serde(flatten)]
    envelope: Envelope,
    sealed: String,
}

/// A payload removed from the cubbyhole.
pub struct Taken {
    /// The plaintext payload, zeroized on drop.
    pub payload: Zeroizing<Vec<u8>>,
    /// The entry's metadata.
    pub envelope: Envelope,
}

impl std::fmt::Debug for Taken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Taken")
            .field("payload", &"[REDACTED]")
            .field("envelope", &self.envelope)
            .finish()
    }
}

/// One-shot payload storage keyed by token hash.
pub struct Cubbyhole {
    store: ScopedStore,
    barrier: Arc<BarrierKey>,
}

impl Cubbyhole {
    /// Creates a cubbyhole over `store`, which should be scoped to `cubbyhole/`.
    #[must_use]
    pub fn new(store: ScopedStore, barrier: Arc<BarrierKey>) -> Self {
        Self { store, barrier }
    }

    /// Stores `payload` for the token with hash `token_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the token already has an entry.
    pub fn store(&self, token_hash: &str, payload: &[u8], envelope: Envelope) -> Result<()> {
        let sealed = self.barrier.derive_for_entry(token_hash).seal(payload)?;
        let entry = CubbyholeEntry {
            envelope,
            sealed: STANDARD.encode(sealed),
        };
        if !self
            .store
            .compare_and_swap(token_hash, None, Some(codec::encode(&entry)?))?
        {
            return Err(Error::conflict("cubbyhole entry already exists"));
        }
        Ok(())
    }

    fn load(&self, token_hash: &str) -> Result<(CubbyholeEntry, Vec<u8>)> {
        let (entry, raw) = self
            .store
            .get_json::<CubbyholeEntry>(token_hash)?
            .ok_or(Error::NotFound)?;
        if entry.envelope.is_expired_at(Utc::now()) {
            debug!("Cubbyhole entry expired");
            // Best effort; the sweep catches anything left behind
            if let Err(e) = self.store.compare_and_swap(token_hash, Some(&raw), None) {
                warn!(error = %e, "Failed to remove expired cubbyhole entry");
            }
            return Err(Error::NotFound);
        }
        Ok((entry, raw))
    }

    /// Returns an entry's metadata without reading or destroying the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no unexpired entry.
    pub fn peek(&self, token_hash: &str) -> Result<Envelope> {
        Ok(self.load(token_hash)?.0.envelope)
    }

    /// Reads and destroys an entry.
    ///
    /// The payload is opened before the entry is deleted, so a decryption
    /// failure leaves the entry in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no unexpired entry or another
    /// reader took it first.
    pub fn take(&self, token_hash: &str) -> Result<Taken> {
        let (entry, raw) = self.load(token_hash)?;
        let sealed = STANDARD.decode(&entry.sealed).map_err(|e| Error::Encryption {
            reason: format!("corrupt cubbyhole entry: {e}"),
        })?;
        let payload = Zeroizing::new(self.barrier.derive_for_entry(token_hash).open(&sealed)?);

        if !self.store.compare_and_swap(token_hash, Some(&raw), None)? {
            return Err(Error::NotFound);
        }
        Ok(Taken {
            payload,
            envelope: entry.envelope,
        })
    }

    /// Puts a taken payload back, undoing [`Cubbyhole::take`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn restore(&self, token_hash: &str, taken: &Taken) -> Result<()> {
        self.store(token_hash, &taken.payload, taken.envelope.clone())
    }

    /// Deletes an entry regardless of its state.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn destroy(&self, token_hash: &str) -> Result<()> {
        self.store.delete(token_hash)?;
        Ok(())
    }
}

impl ExpirySweep for Cubbyhole {
    fn name(&self) -> &str {
        "cubbyhole"
    }

    fn sweep_expired(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let hashes = match self.store.list("") {
            Ok(hashes) => hashes,
            Err(e) => {
                warn!(error = %e, "Failed to list cubbyhole entries for sweep");
                report.failed += 1;
                return report;
            }
        };

        let now = Utc::now();
        for hash in hashes {
            report.scanned += 1;
            let swept = self.store.get_json::<CubbyholeEntry>(&hash).and_then(|found| match found {
                Some((entry, raw)) if entry.envelope.is_expired_at(now) => {
                    self.store.compare_and_swap(&hash, Some(&raw), None)
                }
                _ => Ok(false),
            });
            match swept {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to sweep cubbyhole entry");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for Cubbyhole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cubbyhole")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
