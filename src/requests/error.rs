// ABOUTME: Domain error taxonomy for coach-request lifecycle operations
// ABOUTME: Distinguishes business-rule rejections from guard hits and transport failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use thiserror::Error;

use crate::errors::AppError;
use crate::models::RequestStatus;

/// Why a request-lifecycle operation was rejected or failed.
///
/// Every variant is surfaced to the view layer as a message; none of them is
/// fatal. Transport failures appear only after the retry wrapper is
/// exhausted.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// Input rejected before any I/O
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A pending request for this pair already exists
    #[error("A request to this coach is already pending")]
    DuplicatePending,

    /// The pair already has an accepted request
    #[error("This coach has already accepted a request from you")]
    AlreadyAccepted,

    /// The same request is being processed by another in-flight call
    #[error("This request is already being processed")]
    AlreadyProcessing,

    /// The target request vanished between check and act
    #[error("Request not found")]
    NotFound,

    /// Another actor resolved the request first; carries the actual outcome
    #[error("Request was already {0}")]
    AlreadyResolved(RequestStatus),

    /// No identity available from the auth collaborator
    #[error("Not authenticated")]
    Unauthenticated,

    /// Remote store failure after retries were exhausted
    #[error("Store operation failed: {0}")]
    Store(#[from] AppError),
}
