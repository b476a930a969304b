// ABOUTME: Domain entities for the coach-request lifecycle engine
// ABOUTME: Defines CoachRequest, request status, joined display data, and assignment rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of the optional free-text message on a request
pub const MAX_MESSAGE_LEN: usize = 500;

/// Lifecycle status of a coach request
///
/// `Pending` is the only non-terminal state. The sole legal transitions are
/// `Pending -> Accepted` and `Pending -> Rejected`, performed exactly once by
/// the coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting a decision from the coach
    #[default]
    Pending,
    /// Coach accepted; an active assignment links the pair
    Accepted,
    /// Coach declined; the row is disposable on re-request
    Rejected,
}

impl RequestStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }

    /// Whether the request still awaits a decision
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coaching-relationship proposal from a client to a coach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachRequest {
    /// Opaque unique identifier, assigned at creation
    pub id: Uuid,
    /// Client who sent the request; immutable
    pub client_user_id: Uuid,
    /// Coach the request is addressed to; immutable
    pub coach_id: Uuid,
    /// Lifecycle status; drives all business logic
    pub status: RequestStatus,
    /// Optional free text set at creation, trimmed, at most
    /// [`MAX_MESSAGE_LEN`] characters
    pub message: Option<String>,
    /// Creation timestamp; immutable
    pub requested_at: DateTime<Utc>,
    /// Set exactly once when status leaves `Pending`
    pub responded_at: Option<DateTime<Utc>>,
    /// Identity that resolved the request, set together with `responded_at`
    pub responded_by: Option<Uuid>,
}

/// Fields for inserting a new request; the store assigns id and timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoachRequest {
    /// Client sending the request
    pub client_user_id: Uuid,
    /// Coach the request is addressed to
    pub coach_id: Uuid,
    /// Trimmed message, `None` when empty
    pub message: Option<String>,
}

/// Terminal fields written by the conditional status update
///
/// Applied only where the row is still `pending`; the compare-and-swap on
/// the store side is the cross-device race resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResolution {
    /// Terminal status the request moves to
    pub status: RequestStatus,
    /// Moment the decision was made
    pub responded_at: DateTime<Utc>,
    /// Identity that made the decision
    pub responded_by: Uuid,
}

/// Denormalized display data for one party of a request, joined at read time
///
/// Join failures degrade to `Unavailable` rather than failing the whole
/// load; consumers must handle absence explicitly instead of null-checking
/// individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartyDisplay {
    /// Join succeeded; fields are safe to render
    Known {
        /// Display name of the party
        name: String,
        /// Avatar image URL, when one is set
        avatar_url: Option<String>,
    },
    /// Join failed or the related row is missing
    Unavailable,
}

impl PartyDisplay {
    /// Build a `Known` display from joined fields
    #[must_use]
    pub const fn known(name: String, avatar_url: Option<String>) -> Self {
        Self::Known { name, avatar_url }
    }

    /// Whether display data was resolved
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known { .. })
    }
}

/// A request together with its joined display data, as served to the view
/// layer
///
/// Display fields are read-time projections and are never persisted back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachRequestView {
    /// The authoritative request row
    pub request: CoachRequest,
    /// Display data for the client party
    pub client: PartyDisplay,
    /// Display data for the coach party
    pub coach: PartyDisplay,
}

/// Read model for a client profile row (join source for display data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// User this profile belongs to
    pub user_id: Uuid,
    /// Name shown in request lists
    pub display_name: String,
    /// Avatar image URL
    pub avatar_url: Option<String>,
}

/// Read model for a coach row (join source for display data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coach {
    /// Coach identifier
    pub id: Uuid,
    /// Full name shown in request lists
    pub full_name: String,
    /// Avatar image URL
    pub avatar_url: Option<String>,
}

/// Active coaching relationship created when a request is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachClientAssignment {
    /// Coach side of the relationship
    pub coach_id: Uuid,
    /// Client side of the relationship
    pub client_user_id: Uuid,
    /// Whether the relationship is currently active
    pub active: bool,
    /// When the assignment was created
    pub assigned_at: DateTime<Utc>,
}
