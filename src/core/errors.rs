/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{GrantId, LockMode};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to the caller of a lock operation
///
/// Only the submitting caller ever sees these. Failures of entry points
/// started by some other caller's release are contained and logged.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LockError {
    #[error("Request queue full ({limit} pending)")]
    #[diagnostic(
        code(rwlock::queue_full),
        help("Too many requests are waiting. Release outstanding grants or raise max_pending.")
    )]
    QueueFull { limit: usize },

    #[error("Entry point for {mode} grant {grant} failed: {reason}")]
    #[diagnostic(
        code(rwlock::entry_failed),
        help("The grant was released on the entry point's behalf; queued requests continue.")
    )]
    EntryFailed {
        grant: GrantId,
        mode: LockMode,
        reason: String,
    },

    #[error("Entry point for {mode} grant {grant} panicked: {message}")]
    #[diagnostic(
        code(rwlock::entry_panicked),
        help("The grant was released on the entry point's behalf; queued requests continue.")
    )]
    EntryPanicked {
        grant: GrantId,
        mode: LockMode,
        message: String,
    },

    /// The waiter's entry point was dropped without being started
    ///
    /// A queued request keeps its lock alive, so this only happens when a
    /// thread unwinds out of dispatching with grants still deferred on it.
    /// Those grants are released uncalled and their waiters see this error.
    #[error("Request dropped before its entry point was started")]
    #[diagnostic(
        code(rwlock::abandoned),
        help("A panic escaped while this thread was starting queued entry points; the grant was handed back. Retry the request.")
    )]
    Abandoned,
}

impl LockError {
    /// Grant the error refers to, if any
    pub fn grant(&self) -> Option<GrantId> {
        match self {
            LockError::EntryFailed { grant, .. } | LockError::EntryPanicked { grant, .. } => {
                Some(*grant)
            }
            _ => None,
        }
    }

    /// Whether the request was turned away without touching lock state
    pub fn is_rejection(&self) -> bool {
        matches!(self, LockError::QueueFull { .. })
    }
}

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;
