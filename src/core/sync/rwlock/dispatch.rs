/*!
 * Entry Point Dispatch
 *
 * Starts granted requests outside the lock's mutex, with failure containment.
 *
 * ## Problem
 *
 * An entry point that releases synchronously drains the queue, which starts
 * the next entry point, which releases, and so on. Invoked naively every
 * link of that chain nests one more stack frame:
 * ```text
 * W1 entry -> release -> W2 entry -> release -> W3 entry -> ...
 * ```
 *
 * ## Solution
 *
 * The first dispatch of a lock on a thread becomes that lock's dispatcher on
 * that thread. Grants the same lock drains while it runs are appended to its
 * run list instead of being invoked in place, and the dispatcher works
 * through the list before it returns:
 * ```text
 * W1 entry -> release -> push W2   (returns)
 * dispatcher: W2 entry -> release -> push W3   (returns)
 * dispatcher: W3 entry -> ...
 * ```
 *
 * Run lists live in the lock, one per dispatching thread, so releasing
 * lock B from inside an entry point of lock A starts B's waiters right away.
 * Nesting is bounded by the number of distinct locks on the stack.
 *
 * Grants issued directly by `execute` always run in place, so a caller on an
 * idle lock sees its entry point start before `execute` returns.
 */

use super::entry::{panic_message, EntryFn};
use super::grant::{GrantToken, ReleaseCapability};
use super::Shared;
use crate::core::errors::{LockError, LockResult};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::warn;

/// Granted request ready to be started
pub(super) struct Dispatch {
    token: Arc<GrantToken>,
    entry: EntryFn,
}

impl Dispatch {
    pub(super) fn new(token: Arc<GrantToken>, entry: EntryFn) -> Self {
        Self { token, entry }
    }
}

/// Deferred grants of one lock on one dispatching thread
pub(super) struct RunList {
    thread: ThreadId,
    deferred: VecDeque<Dispatch>,
}

/// Marks the current thread as dispatching one lock until dropped
struct DispatcherScope {
    lock: Arc<Shared>,
    thread: ThreadId,
}

impl DispatcherScope {
    /// Become the dispatcher of `lock` on this thread with `deferred` queued
    ///
    /// `None` if this thread already dispatches `lock`; `deferred` then joins
    /// the existing run list.
    fn enter(lock: &Arc<Shared>, deferred: VecDeque<Dispatch>) -> Option<Self> {
        let thread = thread::current().id();
        let mut active = lock.dispatchers.lock();
        if let Some(run) = active.iter_mut().find(|run| run.thread == thread) {
            run.deferred.extend(deferred);
            return None;
        }
        active.push(RunList { thread, deferred });
        Some(Self {
            lock: Arc::clone(lock),
            thread,
        })
    }

    fn next(&self) -> Option<Dispatch> {
        self.lock
            .dispatchers
            .lock()
            .iter_mut()
            .find(|run| run.thread == self.thread)
            .and_then(|run| run.deferred.pop_front())
    }

    /// Run everything deferred so far, including work deferred while running
    fn run_deferred(&self) {
        while let Some(item) = self.next() {
            // Failures here belong to no waiting caller; `invoke` already logged them.
            let _ = invoke(item);
        }
    }
}

impl Drop for DispatcherScope {
    fn drop(&mut self) {
        let leftover = {
            let mut active = self.lock.dispatchers.lock();
            active
                .iter()
                .position(|run| run.thread == self.thread)
                .map(|pos| active.swap_remove(pos).deferred)
        };
        // Only non-empty when unwinding out of the loop. Their entry points
        // are dropped uncalled; hand the grants back so the queue keeps moving.
        for item in leftover.into_iter().flatten() {
            item.token.try_release();
        }
    }
}

/// Start a grant issued directly by `execute`, on the calling thread
///
/// Returns the entry point's own outcome. Grants drained as a side effect run
/// before this returns unless an outer dispatcher of the same lock on this
/// thread owns them.
pub(super) fn start(item: Dispatch) -> LockResult<()> {
    let lock = Arc::clone(item.token.lock());
    match DispatcherScope::enter(&lock, VecDeque::new()) {
        Some(scope) => {
            let outcome = invoke(item);
            scope.run_deferred();
            outcome
        }
        None => invoke(item),
    }
}

/// Start grants produced by a release of `lock`
///
/// Runs them in place unless this thread is already dispatching `lock`, in
/// which case they join that dispatcher's run list further up the stack.
pub(super) fn schedule(lock: &Arc<Shared>, batch: Vec<Dispatch>) {
    if batch.is_empty() {
        return;
    }

    if let Some(scope) = DispatcherScope::enter(lock, VecDeque::from(batch)) {
        scope.run_deferred();
    }
}

/// Run one entry point inside a failure boundary
///
/// A returned error or a panic counts as an immediate release: the grant is
/// handed back and draining continues. The error is reported to whoever
/// asked, and logged.
fn invoke(item: Dispatch) -> LockResult<()> {
    let Dispatch { token, entry } = item;
    let release = ReleaseCapability::new(Arc::clone(&token));

    let outcome = {
        let _entered = token.span().enter();
        catch_unwind(AssertUnwindSafe(move || entry(release)))
    };
    let error = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => LockError::EntryFailed {
            grant: token.id(),
            mode: token.mode(),
            reason: format!("{err:#}"),
        },
        Err(payload) => LockError::EntryPanicked {
            grant: token.id(),
            mode: token.mode(),
            message: panic_message(payload.as_ref()),
        },
    };

    // The capability may have escaped to other work before the failure;
    // whichever side releases first wins.
    token.try_release();
    token.lock().stats.inc_entry_failures();
    if token.lock().config.log_failures {
        warn!(
            lock = %token.lock().config.name,
            grant = %token.id(),
            mode = %token.mode(),
            error = %error,
            "entry point failed, grant released"
        );
    }
    Err(error)
}
