// ABOUTME: Generic exponential-backoff executor for remote store calls
// ABOUTME: Retries transient failures with doubling delays and re-raises the final error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::errors::{AppError, AppResult};

/// Backoff settings for [`with_retry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of retries after the first attempt (total attempts = retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds; doubles per attempt
    pub initial_delay_ms: u64,
    /// Upper bound on the per-attempt delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Execute `op` with exponential backoff on failure.
///
/// Attempts the operation up to `max_retries + 1` times, sleeping
/// `initial_delay_ms * 2^attempt` (capped at `max_delay_ms`) between
/// attempts, and returns the final error once all attempts are exhausted.
///
/// Callers must only wrap operations that are safe to re-apply: the
/// conditional status update is issued exactly once elsewhere, and the
/// assignment insert is wrapped only together with its existence check.
///
/// # Errors
///
/// Returns the last error produced by `op` after all attempts fail.
pub async fn with_retry<T, F, Fut>(operation: &str, config: &RetryConfig, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut delay_ms = config.initial_delay_ms;
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = Some(e);

                if attempt < config.max_retries {
                    warn!(
                        "{} attempt {}/{} failed, retrying in {}ms: {}",
                        operation,
                        attempt + 1,
                        config.max_retries + 1,
                        delay_ms,
                        last_error
                            .as_ref()
                            .map_or_else(|| "unknown error".to_owned(), ToString::to_string)
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                    // Exponential backoff with cap
                    delay_ms = (delay_ms * 2).min(config.max_delay_ms);
                }
            }
        }
    }

    // All retries exhausted; re-raise the final failure
    Err(last_error
        .unwrap_or_else(|| AppError::internal(format!("{operation} failed without an error"))))
}
