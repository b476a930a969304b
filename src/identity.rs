// ABOUTME: External auth collaborator contract supplying the acting identity
// ABOUTME: Provides the IdentityProvider trait and a static implementation for embedders and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use uuid::Uuid;

/// Authenticated client identity, as resolved by the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    /// User identifier
    pub id: Uuid,
}

/// Authenticated coach identity, as resolved by the host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentCoach {
    /// Coach identifier
    pub id: Uuid,
    /// Full name, used for logging and display
    pub full_name: String,
}

/// Source of the acting identity for all core operations.
///
/// Authentication and token management happen outside this crate; the core
/// only asks who is acting right now. `None` means no identity is available
/// and the operation is rejected before any I/O.
pub trait IdentityProvider: Send + Sync {
    /// The authenticated client, if any
    fn current_user(&self) -> Option<CurrentUser>;

    /// The authenticated coach, if any
    fn current_coach(&self) -> Option<CurrentCoach>;
}

/// Fixed identity provider for embedding apps with a session already
/// resolved, and for tests
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<CurrentUser>,
    coach: Option<CurrentCoach>,
}

impl StaticIdentity {
    /// Identity acting as a client
    #[must_use]
    pub const fn client(user_id: Uuid) -> Self {
        Self {
            user: Some(CurrentUser { id: user_id }),
            coach: None,
        }
    }

    /// Identity acting as a coach
    #[must_use]
    pub const fn coach(coach_id: Uuid, full_name: String) -> Self {
        Self {
            user: None,
            coach: Some(CurrentCoach {
                id: coach_id,
                full_name,
            }),
        }
    }

    /// Identity with no authenticated session
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user: None,
            coach: None,
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user
    }

    fn current_coach(&self) -> Option<CurrentCoach> {
        self.coach.clone()
    }
}
