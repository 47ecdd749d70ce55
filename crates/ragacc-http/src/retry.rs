//! Retry for transient failures: transport errors, timeouts, 5xx and 429.
//!
//! Delay is `base * 2^attempt`; a 429 that names its own delay waits that
//! long instead. Both are capped at `max_delay`.

use std::time::Duration;

use ragacc_core::{ServiceError, ServiceResult};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, err: &ServiceError, attempt: u32) -> Duration {
        if let ServiceError::Status {
            status: 429,
            retry_after: Some(wait),
            ..
        } = err
        {
            return (*wait).min(self.max_delay);
        }
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn run<T>(&self, what: &str, op: impl FnMut() -> ServiceResult<T>) -> ServiceResult<T> {
        self.run_with_sleep(what, op, std::thread::sleep)
    }

    /// Like [`run`](Self::run), but only errors accepted by `retryable`
    /// are retried. Used for calls that are unsafe to repeat once the
    /// request may have reached the server.
    pub fn run_if<T>(
        &self,
        what: &str,
        op: impl FnMut() -> ServiceResult<T>,
        retryable: impl Fn(&ServiceError) -> bool,
    ) -> ServiceResult<T> {
        self.run_inner(what, op, retryable, std::thread::sleep)
    }

    pub fn run_with_sleep<T>(
        &self,
        what: &str,
        op: impl FnMut() -> ServiceResult<T>,
        sleep: impl FnMut(Duration),
    ) -> ServiceResult<T> {
        self.run_inner(what, op, ServiceError::is_transient, sleep)
    }

    fn run_inner<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> ServiceResult<T>,
        retryable: impl Fn(&ServiceError) -> bool,
        mut sleep: impl FnMut(Duration),
    ) -> ServiceResult<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_retries && e.is_transient() && retryable(&e) => {
                    let delay = self.delay_for(&e, attempt);
                    warn!("{what} failed ({e}), retrying in {delay:?}");
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
