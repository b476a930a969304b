// ABOUTME: Application error types shared across the client core
// ABOUTME: Provides AppError/AppResult with constructor helpers for store and config failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use thiserror::Error;

/// Result alias used throughout the crate for store-level operations
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error for remote store, configuration, and plumbing
/// failures.
///
/// Domain rejections (duplicate pending request, stale resolution, guard
/// hits) live in [`crate::requests::RequestError`]; this type covers the
/// transport and infrastructure layer underneath them.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Remote store operation failed (connection, query, or mutation)
    #[error("Database error: {0}")]
    Database(String),

    /// Insert conflicted with an existing row under a uniqueness constraint
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Caller-supplied input failed validation before any I/O
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invariant violation or unexpected internal state
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Remote store failure
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Uniqueness conflict on insert
    pub fn unique_violation(msg: impl Into<String>) -> Self {
        Self::UniqueViolation(msg.into())
    }

    /// Input validation failure
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Missing row
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Configuration failure
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Internal invariant failure
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a uniqueness conflict.
    ///
    /// The create path maps this to a duplicate-pending rejection instead of
    /// a generic store failure.
    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {e}"))
    }
}
