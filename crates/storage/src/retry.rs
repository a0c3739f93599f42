use std::future::Future;
use std::time::Duration;

use tracing::error;

use crate::error::StorageError;

/// Bounded retry with a fixed delay between attempts.
///
/// The attempt counter lives inside [`RetryPolicy::run`], so every call
/// starts from attempt 1 regardless of what earlier calls did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

/// The error returned once a [`RetryPolicy`] gives up.
#[derive(Debug)]
pub struct RetryError {
    pub attempts: u32,
    pub source: StorageError,
}

impl RetryPolicy {
    /// Policy for opening a store connection: 3 attempts, 2 s apart.
    pub const CONNECT: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(2));

    /// Policy for writing one work order: 3 attempts, 1 s apart.
    pub const WRITE: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(1));

    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
        }
    }

    /// Same attempt budget with no delay.
    pub const fn immediate(max_attempts: u32) -> Self {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    error!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        "store operation failed, retrying in {:?}",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(RetryError {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }
}
