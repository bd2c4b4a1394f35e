/*!
 * Async Acquisition
 *
 * Future-based access built on `execute`. The request is submitted when the
 * future is created, not when it is first polled, so its queue position is
 * fixed at the call site.
 */

use super::grant::ReleaseCapability;
use super::TaskRwLock;
use crate::core::errors::{LockError, LockResult};
use crate::core::types::LockMode;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Future resolving to a grant
///
/// Dropping it before completion withdraws nothing from the queue, but the
/// grant it would have received is released as soon as it is issued.
#[must_use = "futures do nothing unless polled; the request is already queued"]
#[derive(Debug)]
pub struct Acquire {
    inner: Result<oneshot::Receiver<ReleaseCapability>, Option<LockError>>,
}

impl Future for Acquire {
    type Output = LockResult<ReleaseCapability>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            Ok(rx) => Pin::new(rx)
                .poll(cx)
                .map(|granted| granted.map_err(|_| LockError::Abandoned)),
            Err(err) => Poll::Ready(Err(err.take().unwrap_or(LockError::Abandoned))),
        }
    }
}

impl TaskRwLock {
    /// Queue a request and get a future for its grant
    ///
    /// # Example
    ///
    /// ```
    /// # tokio_test_block_on(async {
    /// use ordered_rwlock::{LockMode, TaskRwLock};
    ///
    /// let lock = TaskRwLock::new();
    /// let grant = lock.acquire(LockMode::Write).await.unwrap();
    /// // exclusive work
    /// grant.release();
    /// # });
    /// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
    /// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
    /// # }
    /// ```
    pub fn acquire(&self, mode: LockMode) -> Acquire {
        let (tx, rx) = oneshot::channel();
        let submitted = self.execute(mode, move |release| {
            // A vanished waiter gets its capability back here, and dropping
            // it hands the grant straight back to the lock.
            let _ = tx.send(release);
        });

        Acquire {
            inner: submitted.map(|()| rx).map_err(Some),
        }
    }

    /// Shared access as a future
    pub fn read(&self) -> Acquire {
        self.acquire(LockMode::Read)
    }

    /// Exclusive access as a future
    pub fn write(&self) -> Acquire {
        self.acquire(LockMode::Write)
    }

    /// Run `work` while holding `mode` access
    ///
    /// The grant is released when `work` completes, or when this future is
    /// dropped.
    pub async fn run<Fut>(&self, mode: LockMode, work: Fut) -> LockResult<Fut::Output>
    where
        Fut: Future,
    {
        let grant = self.acquire(mode).await?;
        let output = work.await;
        grant.release();
        Ok(output)
    }
}
