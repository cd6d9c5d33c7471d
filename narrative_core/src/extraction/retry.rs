//! Retry policy for calls to the completion provider.
//!
//! Failures are classified into [`ErrorKind`]s. Rate limits, server errors
//! and connection failures are transient and retried with exponential
//! backoff plus jitter. Client errors are returned immediately.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::error::ExtractionError;

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimited,
    Server,
    Connection,
    Client,
}

impl ErrorKind {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }

    pub fn is_transient(&self) -> bool {
        !matches!(self, ErrorKind::Client)
    }
}

/// Retry settings as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 1000,
        }
    }
}

/// Exponential backoff with jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (0-based): `base * 2^attempt + jitter`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        backoff.saturating_add(jitter)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// `op` receives the attempt number. Blocks the thread between attempts.
    pub fn run<T, F>(&self, op: F) -> Result<T, ExtractionError>
    where
        F: FnMut(u32) -> Result<T, ExtractionError>,
    {
        self.run_with_sleep(op, std::thread::sleep)
    }

    /// Like [`RetryPolicy::run`] with a caller-supplied sleep.
    pub fn run_with_sleep<T, F, S>(&self, mut op: F, mut sleep: S) -> Result<T, ExtractionError>
    where
        F: FnMut(u32) -> Result<T, ExtractionError>,
        S: FnMut(Duration),
    {
        let mut attempt = 0;
        loop {
            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let kind = err.kind();
            if !kind.is_transient() || attempt >= self.max_retries {
                return Err(err);
            }

            let delay = err.retry_after().unwrap_or_else(|| self.delay_for(attempt));
            warn!(
                ?kind,
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying completion call"
            );
            sleep(delay);
            attempt += 1;
        }
    }
}
