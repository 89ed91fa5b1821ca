//! Bounded admission for heavy work (page rendering, index rebuilds).

use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// Held while one heavy operation runs; dropping it frees the slot.
#[derive(Debug)]
pub struct RenderPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone)]
pub struct RenderAdmission {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl RenderAdmission {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { semaphore: Arc::new(Semaphore::new(capacity)), capacity }
    }

    /// Sized to `configured`, else to the machine's available parallelism.
    pub fn from_settings(configured: Option<usize>) -> Self {
        let capacity = configured.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        });
        Self::new(capacity)
    }

    /// Waits until fewer than `capacity` permits are out.
    pub async fn acquire(&self) -> Result<RenderPermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        Ok(RenderPermit { _permit: permit })
    }

    pub fn try_acquire(&self) -> Result<RenderPermit, TryAcquireError> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned()?;
        Ok(RenderPermit { _permit: permit })
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
