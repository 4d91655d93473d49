use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_retry2::strategy::jitter;
use tokio_retry2::{Retry, RetryError};

use crate::ui::prelude::*;

/// Classifies component errors as transient (worth another attempt) or permanent.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Bounded exponential backoff applied at every remote call site.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Policy without waits, for tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            jitter: false,
        }
    }

    /// Delays between attempts: `initial * 2^i` capped at `max_backoff`.
    pub fn delays(&self) -> Vec<Duration> {
        let retries = self.max_attempts.max(1) - 1;
        (0..retries)
            .map(|i| {
                let factor = 2u32.saturating_pow(i);
                let delay = self
                    .initial_backoff
                    .checked_mul(factor)
                    .unwrap_or(self.max_backoff)
                    .min(self.max_backoff);
                if self.jitter { jitter(delay) } else { delay }
            })
            .collect()
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// The last error is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let attempt = AtomicU32::new(0);
        let attempt = &attempt;
        let op = &op;
        let max_attempts = self.max_attempts.max(1);

        Retry::spawn(self.delays(), move || async move {
            let current = attempt.fetch_add(1, Ordering::Relaxed) + 1;
            match op().await {
                Ok(value) => Ok(value),
                Err(err) if err.is_retryable() => {
                    if current < max_attempts {
                        emit(
                            Level::Debug,
                            "retry.transient",
                            &format!("{label}: attempt {current}/{max_attempts} failed: {err}"),
                            None,
                        );
                    }
                    Err(RetryError::Transient {
                        err,
                        retry_after: None,
                    })
                }
                Err(err) => {
                    emit(
                        Level::Debug,
                        "retry.permanent",
                        &format!("{label}: permanent failure: {err}"),
                        None,
                    );
                    Err(RetryError::Permanent(err))
                }
            }
        })
        .await
    }
}
