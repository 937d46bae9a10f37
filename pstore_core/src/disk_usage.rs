//! Disk usage accounting against a fixed quota.

use tracing::warn;

/// Bytes currently occupied by stored entries, bounded by a fixed maximum.
///
/// The ledger itself is not synchronized; the store keeps it behind the same
/// lock that serializes filesystem mutations, which makes `try_reserve` and
/// `release` linearizable with respect to each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsageLedger {
    used: u64,
    max: u64,
}

impl DiskUsageLedger {
    /// An empty ledger with the given capacity.
    pub fn new(max: u64) -> Self {
        Self { used: 0, max }
    }

    /// A ledger seeded with existing usage. Returns `None` if `used > max`.
    pub fn with_used(used: u64, max: u64) -> Option<Self> {
        (used <= max).then_some(Self { used, max })
    }

    /// A ledger seeded with existing usage that may already exceed `max`.
    ///
    /// While over quota every non-empty reservation fails; releases bring
    /// usage back under the ceiling.
    pub fn seeded(used: u64, max: u64) -> Self {
        Self { used, max }
    }

    /// Reserve `n` bytes if they fit. On failure the ledger is unchanged.
    pub fn try_reserve(&mut self, n: u64) -> bool {
        if n == 0 {
            return true;
        }
        match self.used.checked_add(n) {
            Some(total) if total <= self.max => {
                self.used = total;
                true
            }
            _ => false,
        }
    }

    /// Return `n` previously reserved bytes.
    pub fn release(&mut self, n: u64) {
        if n > self.used {
            // Only reachable when removing entries the ledger never counted,
            // e.g. files left by an earlier run in an unreconciled store.
            warn!(
                released = n,
                used = self.used,
                "releasing more bytes than are accounted for"
            );
        }
        self.used = self.used.saturating_sub(n);
    }

    pub fn current(&self) -> u64 {
        self.used
    }

    pub fn capacity(&self) -> u64 {
        self.max
    }

    /// Bytes that can still be reserved.
    pub fn available(&self) -> u64 {
        self.max.saturating_sub(self.used)
    }

    pub fn is_over_quota(&self) -> bool {
        self.used > self.max
    }
}
