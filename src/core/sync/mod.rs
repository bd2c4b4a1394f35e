/*!
 * Synchronization Primitives
 *
 * Task-level coordination that never blocks the calling thread:
 * - `TaskRwLock`: FIFO-fair read/write lock that starts entry points once granted
 * - `LockConfig`: per-instance queue bound and diagnostics settings
 *
 * # Use Cases
 *
 * - **Resource managers**: Serialize writers to a shared index while readers overlap
 * - **Request handlers**: Order work by submission without parking executor threads
 */

mod config;
mod rwlock;

pub use config::{LockConfig, DEFAULT_LOCK_NAME};
pub use rwlock::{Acquire, EntryOutcome, ReleaseCapability, TaskRwLock};
