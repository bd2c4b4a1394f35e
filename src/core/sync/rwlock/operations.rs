/*!
 * Lock Core Operations
 * Submission, release and draining
 */

use super::dispatch::{self, Dispatch};
use super::entry::{self, EntryOutcome};
use super::grant::{GrantToken, ReleaseCapability};
use super::state::{Ready, Submission};
use super::{Shared, TaskRwLock};
use crate::core::errors::{LockError, LockResult};
use crate::core::types::{GrantId, LockMode};
use std::sync::Arc;
use tracing::{debug, warn};

impl TaskRwLock {
    /// Submit a task that needs `mode` access
    ///
    /// The entry point is invoked exactly once, with the capability that ends
    /// its grant:
    /// - immediately, on this thread, when the lock is compatible and nothing
    ///   is queued;
    /// - otherwise later, on the thread whose release unblocks it.
    ///
    /// # Errors
    ///
    /// - [`LockError::QueueFull`] if the request would exceed `max_pending`;
    ///   lock state is unchanged and the entry point is dropped uncalled.
    /// - [`LockError::EntryFailed`] / [`LockError::EntryPanicked`] if the entry
    ///   point ran here and failed. Its grant has already been released and
    ///   queued work proceeds as usual.
    ///
    /// A queued entry point that fails later is contained the same way, but
    /// only logged: nobody is left waiting on its result.
    pub fn execute<F, R>(&self, mode: LockMode, entry: F) -> LockResult<()>
    where
        F: FnOnce(ReleaseCapability) -> R + Send + 'static,
        R: EntryOutcome,
    {
        let entry = entry::boxed(entry);
        let (submission, state) = {
            let mut core = self.shared.core.lock();
            let submission = core.submit(mode, entry, &self.shared.config);
            (submission, core.state())
        };
        self.shared.stats.inc_submitted();

        match submission {
            Submission::Granted(ready) => {
                self.shared.stats.inc_granted_immediately();
                debug!(
                    lock = %self.shared.config.name,
                    grant = %ready.id,
                    mode = %mode,
                    state = %state,
                    "granted immediately"
                );
                dispatch::start(Shared::prepare(&self.shared, ready))
            }
            Submission::Queued { id, pending } => {
                self.shared.stats.inc_queued(pending);
                debug!(
                    lock = %self.shared.config.name,
                    grant = %id,
                    mode = %mode,
                    state = %state,
                    pending,
                    "request queued"
                );
                Ok(())
            }
            Submission::Rejected { payload, limit } => {
                self.shared.stats.inc_rejected();
                warn!(
                    lock = %self.shared.config.name,
                    mode = %mode,
                    limit,
                    "request rejected, queue full"
                );
                drop(payload);
                Err(LockError::QueueFull { limit })
            }
        }
    }

    /// Submit a task that needs shared access
    pub fn execute_read<F, R>(&self, entry: F) -> LockResult<()>
    where
        F: FnOnce(ReleaseCapability) -> R + Send + 'static,
        R: EntryOutcome,
    {
        self.execute(LockMode::Read, entry)
    }

    /// Submit a task that needs exclusive access
    pub fn execute_write<F, R>(&self, entry: F) -> LockResult<()>
    where
        F: FnOnce(ReleaseCapability) -> R + Send + 'static,
        R: EntryOutcome,
    {
        self.execute(LockMode::Write, entry)
    }
}

impl Shared {
    /// Attach a fresh grant token to a request that has just been granted
    fn prepare(this: &Arc<Self>, ready: Ready<super::entry::EntryFn>) -> Dispatch {
        let token = GrantToken::new(Arc::clone(this), ready.id, ready.mode);
        Dispatch::new(token, ready.payload)
    }

    /// End one grant and start whatever it unblocks
    ///
    /// Called exactly once per grant, by its token.
    pub(super) fn release_grant(this: &Arc<Self>, id: GrantId, mode: LockMode) {
        let (ready, state, pending) = {
            let mut core = this.core.lock();
            let ready = core.release(mode);
            (ready, core.state(), core.pending())
        };
        this.stats.inc_released();
        debug!(
            lock = %this.config.name,
            grant = %id,
            mode = %mode,
            state = %state,
            pending,
            "grant released"
        );

        if ready.is_empty() {
            return;
        }

        let reads = ready[0].mode.is_read();
        this.stats.record_drain(ready.len(), reads);
        debug!(
            lock = %this.config.name,
            mode = %ready[0].mode,
            count = ready.len(),
            pending,
            "draining queued requests"
        );

        let batch = ready
            .into_iter()
            .map(|ready| Self::prepare(this, ready))
            .collect();
        dispatch::schedule(this, batch);
    }
}
