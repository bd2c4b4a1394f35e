/*!
 * Ordered RwLock Library
 * Non-blocking, FIFO-fair read/write lock that schedules task entry points
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{LockError, LockResult};
pub use crate::core::sync::{
    Acquire, EntryOutcome, LockConfig, ReleaseCapability, TaskRwLock, DEFAULT_LOCK_NAME,
};
pub use crate::core::types::{GrantId, LockMode, LockState, LockStats};
pub use monitoring::{init_tracing, try_init_tracing};
