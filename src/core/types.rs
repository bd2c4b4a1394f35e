/*!
 * Core Types
 * Common types shared by the lock, its grants and its statistics
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access mode requested by a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Shared access, runs alongside other readers
    Read,
    /// Exclusive access
    Write,
}

impl LockMode {
    #[inline]
    pub fn is_read(self) -> bool {
        matches!(self, LockMode::Read)
    }

    #[inline]
    pub fn is_write(self) -> bool {
        matches!(self, LockMode::Write)
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Read => f.write_str("read"),
            LockMode::Write => f.write_str("write"),
        }
    }
}

/// Identifier of one submitted request, assigned in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub u64);

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of grants currently held on a lock
///
/// `Reading(n)` always carries `n >= 1`; `Writing` never coexists with any
/// other grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "readers", rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Free,
    Reading(usize),
    Writing,
}

impl LockState {
    /// Whether a request of `mode` may start right now
    #[inline]
    pub fn admits(self, mode: LockMode) -> bool {
        match (self, mode) {
            (LockState::Free, _) => true,
            (LockState::Reading(_), LockMode::Read) => true,
            _ => false,
        }
    }

    /// State after granting one more request of `mode`
    ///
    /// Callers check [`admits`](Self::admits) first.
    #[inline]
    pub(crate) fn acquired(self, mode: LockMode) -> Self {
        debug_assert!(self.admits(mode), "{mode} grant issued while {self:?}");
        match mode {
            LockMode::Read => match self {
                LockState::Reading(n) => LockState::Reading(n + 1),
                _ => LockState::Reading(1),
            },
            LockMode::Write => LockState::Writing,
        }
    }

    /// State after one grant of `mode` ends
    #[inline]
    pub(crate) fn released(self, mode: LockMode) -> Self {
        match (self, mode) {
            (LockState::Reading(1), LockMode::Read) => LockState::Free,
            (LockState::Reading(n), LockMode::Read) => LockState::Reading(n - 1),
            (LockState::Writing, LockMode::Write) => LockState::Free,
            (state, mode) => {
                debug_assert!(false, "{mode} release while {state:?}");
                state
            }
        }
    }

    #[inline]
    pub fn is_free(self) -> bool {
        matches!(self, LockState::Free)
    }

    /// Number of grants currently held
    #[inline]
    pub fn holders(self) -> usize {
        match self {
            LockState::Free => 0,
            LockState::Reading(n) => n,
            LockState::Writing => 1,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Free => f.write_str("free"),
            LockState::Reading(n) => write!(f, "reading({n})"),
            LockState::Writing => f.write_str("writing"),
        }
    }
}

/// Lock statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockStats {
    pub submitted: u64,
    pub granted_immediately: u64,
    pub queued: u64,
    pub granted_from_queue: u64,
    pub released: u64,
    pub redundant_releases: u64,
    pub entry_failures: u64,
    pub rejected: u64,
    pub peak_pending: usize,
    /// Drains that started two or more queued readers together
    pub read_batches: u64,
}

impl LockStats {
    /// Total grants issued, immediate or drained
    #[inline]
    pub fn granted(&self) -> u64 {
        self.granted_immediately + self.granted_from_queue
    }
}
