/*!
 * Lock-Free Lock Statistics
 * Atomic counters updated outside the lock's mutex
 */

use crate::core::types::LockStats;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Atomic lock statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing with the state mutex
/// - All operations use relaxed ordering; counters are for monitoring only
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub(super) struct AtomicLockStats {
    submitted: AtomicU64,
    granted_immediately: AtomicU64,
    queued: AtomicU64,
    granted_from_queue: AtomicU64,
    released: AtomicU64,
    redundant_releases: AtomicU64,
    entry_failures: AtomicU64,
    rejected: AtomicU64,
    peak_pending: AtomicUsize,
    read_batches: AtomicU64,
}

impl AtomicLockStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_granted_immediately(&self) {
        self.granted_immediately.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a queued request and the queue depth it produced
    #[inline(always)]
    pub fn inc_queued(&self, pending: usize) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        self.peak_pending.fetch_max(pending, Ordering::Relaxed);
    }

    /// Record one drain that started `count` queued requests
    #[inline(always)]
    pub fn record_drain(&self, count: usize, reads: bool) {
        self.granted_from_queue
            .fetch_add(count as u64, Ordering::Relaxed);
        if reads && count > 1 {
            self.read_batches.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline(always)]
    pub fn inc_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_redundant_releases(&self) {
        self.redundant_releases.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_entry_failures(&self) {
        self.entry_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    ///
    /// # Note
    /// Counter values may not be perfectly consistent with each other due to
    /// concurrent updates, but each individual value is accurate.
    #[inline]
    pub fn snapshot(&self) -> LockStats {
        LockStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            granted_immediately: self.granted_immediately.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            granted_from_queue: self.granted_from_queue.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            redundant_releases: self.redundant_releases.load(Ordering::Relaxed),
            entry_failures: self.entry_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            peak_pending: self.peak_pending.load(Ordering::Relaxed),
            read_batches: self.read_batches.load(Ordering::Relaxed),
        }
    }
}
