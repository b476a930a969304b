// ABOUTME: Environment-only configuration for the client core
// ABOUTME: Loads retry and cache-window settings from env vars with validated defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use std::env;
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::retry::RetryConfig;

/// Default staleness window before a load refetches, in seconds
const DEFAULT_CACHE_WINDOW_SECS: u64 = 5;

/// Runtime configuration for the client core.
///
/// Configuration is environment-only: no config files. Every knob has a
/// default suitable for production; env vars override.
///
/// | Variable | Default | Meaning |
/// |---|---|---|
/// | `COACHLINK_MAX_RETRIES` | `3` | retries after the first attempt |
/// | `COACHLINK_RETRY_BASE_DELAY_MS` | `1000` | first backoff delay |
/// | `COACHLINK_RETRY_MAX_DELAY_MS` | `30000` | backoff delay cap |
/// | `COACHLINK_CACHE_WINDOW_SECS` | `5` | load throttle window |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backoff settings applied to retryable remote calls
    pub retry: RetryConfig,
    /// How long a loaded list stays fresh before a reload refetches
    pub cache_window: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            cache_window: Duration::from_secs(DEFAULT_CACHE_WINDOW_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a set variable fails to parse or
    /// violates its bounds (zero delays are rejected; zero retries is
    /// allowed and disables backoff).
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let max_retries = env_parse("COACHLINK_MAX_RETRIES", defaults.retry.max_retries)?;
        let initial_delay_ms = env_parse(
            "COACHLINK_RETRY_BASE_DELAY_MS",
            defaults.retry.initial_delay_ms,
        )?;
        let max_delay_ms = env_parse(
            "COACHLINK_RETRY_MAX_DELAY_MS",
            defaults.retry.max_delay_ms,
        )?;
        let cache_window_secs = env_parse(
            "COACHLINK_CACHE_WINDOW_SECS",
            defaults.cache_window.as_secs(),
        )?;

        if initial_delay_ms == 0 {
            return Err(AppError::config(
                "COACHLINK_RETRY_BASE_DELAY_MS must be greater than zero",
            ));
        }
        if max_delay_ms < initial_delay_ms {
            return Err(AppError::config(
                "COACHLINK_RETRY_MAX_DELAY_MS must be at least the base delay",
            ));
        }

        Ok(Self {
            retry: RetryConfig {
                max_retries,
                initial_delay_ms,
                max_delay_ms,
            },
            cache_window: Duration::from_secs(cache_window_secs),
        })
    }
}

/// Parse an env var into `T`, falling back to `default` when unset
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} has invalid value '{raw}'"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(AppError::config(format!("{name} is not valid unicode")))
        }
    }
}
