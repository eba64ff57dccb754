//! Bounded concurrency guard for rendered-browser fetches.
//!
//! The limiter never queues: when every session is taken, `try_acquire`
//! fails immediately with `CapacityExceeded`. A [`SessionToken`] releases its
//! slot when dropped, so release happens on success, error, panic unwind, and
//! timeout-driven future cancellation alike.

use crate::errors::FetchError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide ceiling on concurrent rendered fetches.
#[derive(Debug, Clone)]
pub struct SessionLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// One active rendered-fetch slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct SessionToken {
    _permit: OwnedSemaphorePermit,
}

impl SessionLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Take a slot or fail immediately when at capacity.
    pub fn try_acquire(&self) -> Result<SessionToken, FetchError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => {
                tracing::debug!("rendered session acquired ({}/{})", self.active(), self.limit);
                Ok(SessionToken { _permit: permit })
            }
            Err(_) => Err(FetchError::CapacityExceeded { limit: self.limit }),
        }
    }

    /// Run `work` while holding a slot; the slot is released however `work` ends.
    pub async fn run<F, T>(&self, work: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        let _token = self.try_acquire()?;
        work.await
    }

    /// Number of sessions currently held.
    pub fn active(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
