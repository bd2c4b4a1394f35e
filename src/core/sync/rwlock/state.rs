/*!
 * Grant State Machine
 * Active grant bookkeeping and the FIFO request queue
 */

use crate::core::sync::LockConfig;
use crate::core::types::{GrantId, LockMode, LockState};
use std::collections::VecDeque;

/// Request waiting in the queue
#[derive(Debug)]
pub(super) struct Pending<T> {
    pub id: GrantId,
    pub mode: LockMode,
    pub payload: T,
}

/// Request that has just been granted and must now be started
#[derive(Debug)]
pub(super) struct Ready<T> {
    pub id: GrantId,
    pub mode: LockMode,
    pub payload: T,
}

impl<T> From<Pending<T>> for Ready<T> {
    fn from(pending: Pending<T>) -> Self {
        Self {
            id: pending.id,
            mode: pending.mode,
            payload: pending.payload,
        }
    }
}

/// Outcome of a submission
#[derive(Debug)]
pub(super) enum Submission<T> {
    Granted(Ready<T>),
    Queued { id: GrantId, pending: usize },
    Rejected { payload: T, limit: usize },
}

/// Lock state plus request queue, guarded as one unit by the lock's mutex
///
/// Invariant: the queue is empty whenever the state is `Free`. Every
/// transition into `Free` drains before returning.
#[derive(Debug)]
pub(super) struct LockCore<T> {
    state: LockState,
    queue: VecDeque<Pending<T>>,
    next_id: u64,
}

impl<T> LockCore<T> {
    pub fn new() -> Self {
        Self {
            state: LockState::Free,
            queue: VecDeque::new(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn state(&self) -> LockState {
        self.state
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Admit a new request
    ///
    /// A request never overtakes an older queued one, even a reader that
    /// would be compatible with the readers currently running. The queue
    /// bound in `config` only applies to requests that would have to wait.
    pub fn submit(&mut self, mode: LockMode, payload: T, config: &LockConfig) -> Submission<T> {
        if self.queue.is_empty() && self.state.admits(mode) {
            let id = self.allocate_id();
            self.state = self.state.acquired(mode);
            return Submission::Granted(Ready { id, mode, payload });
        }

        if let Some(limit) = config.reached_limit(self.queue.len()) {
            return Submission::Rejected { payload, limit };
        }

        let id = self.allocate_id();
        self.queue.push_back(Pending { id, mode, payload });
        Submission::Queued {
            id,
            pending: self.queue.len(),
        }
    }

    /// End one grant of `mode` and return whatever may start as a result
    pub fn release(&mut self, mode: LockMode) -> Vec<Ready<T>> {
        self.state = self.state.released(mode);
        self.drain()
    }

    /// Promote queued requests while the front is compatible
    ///
    /// Only a free lock drains. From `Free` the front request is granted; a
    /// reader pulls every directly following reader along with it, a writer
    /// goes alone. A `Reading` lock with a non-empty queue is always waiting
    /// on a writer at the front, so nothing moves until the readers finish.
    fn drain(&mut self) -> Vec<Ready<T>> {
        let mut ready = Vec::new();
        if !self.state.is_free() {
            return ready;
        }

        let Some(front) = self.queue.pop_front() else {
            return ready;
        };
        self.state = self.state.acquired(front.mode);
        let batch_reads = front.mode.is_read();
        ready.push(Ready::from(front));

        if batch_reads {
            while self.queue.front().is_some_and(|next| next.mode.is_read()) {
                if let Some(next) = self.queue.pop_front() {
                    self.state = self.state.acquired(next.mode);
                    ready.push(Ready::from(next));
                }
            }
        }

        ready
    }

    #[inline]
    fn allocate_id(&mut self) -> GrantId {
        let id = GrantId(self.next_id);
        self.next_id += 1;
        id
    }
}
