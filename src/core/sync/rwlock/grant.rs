/*!
 * Grants and Release Capabilities
 *
 * A grant is one outstanding acquisition. Its release capability is the only
 * way to end it, and ending it twice is structurally impossible: the first
 * release flips an atomic flag, every later attempt observes the flag and
 * returns without touching lock state.
 */

use super::Shared;
use crate::core::types::{GrantId, LockMode};
use crate::monitoring::GrantSpan;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared record of one grant
///
/// Held by the capability and, while the entry point runs, by the dispatcher
/// so a failing entry point can be released on its behalf.
pub(super) struct GrantToken {
    lock: Arc<Shared>,
    id: GrantId,
    mode: LockMode,
    granted_at: Instant,
    released: AtomicBool,
    span: GrantSpan,
}

impl GrantToken {
    pub(super) fn new(lock: Arc<Shared>, id: GrantId, mode: LockMode) -> Arc<Self> {
        let span = GrantSpan::new(&lock.config.name, id, mode);
        Arc::new(Self {
            lock,
            id,
            mode,
            granted_at: Instant::now(),
            released: AtomicBool::new(false),
            span,
        })
    }

    #[inline]
    pub(super) fn id(&self) -> GrantId {
        self.id
    }

    #[inline]
    pub(super) fn mode(&self) -> LockMode {
        self.mode
    }

    #[inline]
    pub(super) fn lock(&self) -> &Arc<Shared> {
        &self.lock
    }

    #[inline]
    pub(super) fn span(&self) -> &GrantSpan {
        &self.span
    }

    #[inline]
    pub(super) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// End the grant if it is still held
    ///
    /// Returns `true` only for the call that actually ended it.
    pub(super) fn try_release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.span
            .close(self.granted_at.elapsed(), self.lock.config.slow_hold);
        Shared::release_grant(&self.lock, self.id, self.mode);
        true
    }
}

/// Single-use token handed to an entry point alongside its grant
///
/// Call [`release`](Self::release) when the protected work is done. Dropping
/// an unreleased capability releases it too, so moving it into the work
/// (a spawned task, a closure on another thread) ties the grant to that
/// work's lifetime. Leaking it with `mem::forget` holds the grant forever and
/// starves every conflicting request behind it.
#[must_use = "dropping a ReleaseCapability ends the grant immediately"]
pub struct ReleaseCapability {
    token: Arc<GrantToken>,
}

impl ReleaseCapability {
    pub(super) fn new(token: Arc<GrantToken>) -> Self {
        Self { token }
    }

    /// End the grant and let queued requests proceed
    ///
    /// Idempotent: only the first call has an effect. Returns whether this
    /// call was the one that released.
    pub fn release(&self) -> bool {
        if self.token.try_release() {
            return true;
        }
        self.token.lock.stats.inc_redundant_releases();
        tracing::trace!(
            lock = %self.token.lock.config.name,
            grant = %self.token.id,
            "redundant release ignored"
        );
        false
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.token.is_released()
    }

    #[inline]
    pub fn mode(&self) -> LockMode {
        self.token.mode
    }

    #[inline]
    pub fn grant_id(&self) -> GrantId {
        self.token.id
    }

    /// Time since the grant was issued
    #[inline]
    pub fn held_for(&self) -> Duration {
        self.token.granted_at.elapsed()
    }
}

impl Drop for ReleaseCapability {
    fn drop(&mut self) {
        self.token.try_release();
    }
}

impl fmt::Debug for ReleaseCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseCapability")
            .field("grant", &self.token.id)
            .field("mode", &self.token.mode)
            .field("released", &self.is_released())
            .finish()
    }
}
