//! The expiry sweep contract.
//!
//! Components that keep expiring records implement [`ExpirySweep`] so a single
//! background task can reclaim them. Sweeping is best-effort: lazy expiry on
//! access is what enforces correctness, the sweep only reclaims space.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Counters from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Records examined.
    pub scanned: usize,
    /// Records removed because they were expired or orphaned.
    pub removed: usize,
    /// Records that could not be examined or removed.
    pub failed: usize,
}

impl SweepReport {
    /// Returns true if nothing was removed and nothing failed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.removed == 0 && self.failed == 0
    }
}

impl AddAssign for SweepReport {
    fn add_assign(&mut self, rhs: Self) {
        self.scanned += rhs.scanned;
        self.removed += rhs.removed;
        self.failed += rhs.failed;
    }
}

/// A component whose expired records can be reclaimed in the background.
pub trait ExpirySweep: Send + Sync {
    /// A short name for log lines.
    fn name(&self) -> &str;

    /// Removes expired records.
    ///
    /// Individual failures are counted in the report rather than aborting the
    /// pass.
    fn sweep_expired(&self) -> SweepReport;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_accumulate() {
        let mut total = SweepReport::default();
        assert!(total.is_clean());

        total += SweepReport {
            scanned: 3,
            removed: 1,
            failed: 0,
        };
        total += SweepReport {
            scanned: 2,
            removed: 0,
            failed: 1,
        };

        assert_eq!(
            total,
            SweepReport {
                scanned: 5,
                removed: 1,
                failed: 1,
            }
        );
        assert!(!total.is_clean());
    }
}
