use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Bounds the number of EDGAR requests in flight at once.
#[derive(Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
}

static EDGAR_RATE_LIMITER: OnceCell<RateLimiter> = OnceCell::new();

impl RateLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        RateLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.semaphore.acquire().await
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[cfg(test)]
    pub(crate) fn close(&self) {
        self.semaphore.close();
    }

    /// Process-wide limiter shared by every `EdgarClient`.
    pub fn edgar() -> &'static RateLimiter {
        EDGAR_RATE_LIMITER.get_or_init(RateLimiter::default)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(10) // SEC allows 10 requests per second
    }
}
