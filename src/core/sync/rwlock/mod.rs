/*!
 * Task Read/Write Lock
 *
 * Non-blocking read/write lock that decides *when* a task may start and
 * leaves *where* it runs to the caller.
 *
 * # Model
 *
 * A caller submits `(mode, entry point)`. If the lock is compatible and no
 * older request is waiting, the entry point runs before `execute` returns;
 * otherwise the request joins a FIFO queue and its entry point is started
 * later, on whichever thread releases the grant that unblocks it. The entry
 * point receives a [`ReleaseCapability`] and ends its grant by releasing it,
 * possibly much later and from another executor.
 *
 * # Ordering
 *
 * - No request overtakes an older queued one, so writers never starve.
 * - Consecutive queued readers start together as one batch.
 * - A writer starts alone and holds the lock exclusively.
 */

mod async_ops;
mod atomic_stats;
mod dispatch;
mod entry;
mod grant;
mod operations;
mod state;

pub use async_ops::Acquire;
pub use entry::EntryOutcome;
pub use grant::ReleaseCapability;

use super::config::LockConfig;
use crate::core::types::{LockState, LockStats};
use atomic_stats::AtomicLockStats;
use dispatch::RunList;
use entry::EntryFn;
use parking_lot::Mutex;
use state::LockCore;
use std::fmt;
use std::sync::Arc;

/// State shared by every handle and grant of one lock
pub(super) struct Shared {
    core: Mutex<LockCore<EntryFn>>,
    /// Threads currently starting this lock's entry points
    dispatchers: Mutex<Vec<RunList>>,
    stats: AtomicLockStats,
    config: LockConfig,
}

/// Fair, non-blocking read/write lock for task scheduling
///
/// Cloning yields another handle to the same lock. Separate instances share
/// nothing.
///
/// # Example
///
/// ```
/// use ordered_rwlock::{LockMode, TaskRwLock};
///
/// let lock = TaskRwLock::new();
/// lock.execute(LockMode::Read, |release| {
///     // read the protected resource
///     release.release();
/// })
/// .unwrap();
/// assert!(lock.is_free());
/// ```
#[derive(Clone)]
pub struct TaskRwLock {
    shared: Arc<Shared>,
}

impl TaskRwLock {
    /// Create a lock with default configuration
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    /// Create a lock with custom configuration
    pub fn with_config(config: LockConfig) -> Self {
        tracing::debug!(
            lock = %config.name,
            max_pending = ?config.max_pending,
            "rwlock created"
        );

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(LockCore::new()),
                dispatchers: Mutex::new(Vec::new()),
                stats: AtomicLockStats::new(),
                config,
            }),
        }
    }

    /// Current grant state
    pub fn state(&self) -> LockState {
        self.shared.core.lock().state()
    }

    /// Number of queued requests
    pub fn pending(&self) -> usize {
        self.shared.core.lock().pending()
    }

    /// Whether no grant is held
    pub fn is_free(&self) -> bool {
        self.state().is_free()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> LockStats {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> &LockConfig {
        &self.shared.config
    }

    /// Whether two handles refer to the same lock
    pub fn same_lock(&self, other: &TaskRwLock) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Default for TaskRwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskRwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, pending) = {
            let core = self.shared.core.lock();
            (core.state(), core.pending())
        };
        f.debug_struct("TaskRwLock")
            .field("name", &self.shared.config.name)
            .field("state", &state)
            .field("pending", &pending)
            .finish()
    }
}
