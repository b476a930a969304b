// ABOUTME: Remote store abstraction consumed by the request lifecycle core
// ABOUTME: Capability trait covering row reads, writes, deletes, and change subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{
    Coach, CoachClientAssignment, CoachRequest, NewCoachRequest, Profile, RequestResolution,
    RequestStatus,
};

/// Change-event types and broadcast plumbing
pub mod events;

/// SQLite reference backend
pub mod sqlite;

pub use events::{ChangeBroadcaster, ChangeEvent, ChangeKind, ChangeStream, StreamSignal, SubscriptionFilter};
pub use sqlite::SqliteStore;

/// Remote store capability for the coach-request tables.
///
/// All request-lifecycle I/O goes through this trait so the core stays
/// independent of the hosted backend. The crate ships [`SqliteStore`] as the
/// reference implementation; production apps supply their own against the
/// platform's relational store.
///
/// Every method assumes an already-authenticated connection; identity
/// resolution lives in [`crate::identity`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // ================================
    // Request reads
    // ================================

    /// All requests sent by a client, newest first
    async fn query_requests_for_client(&self, client_user_id: Uuid)
        -> AppResult<Vec<CoachRequest>>;

    /// All requests addressed to a coach, newest first
    async fn query_requests_for_coach(&self, coach_id: Uuid) -> AppResult<Vec<CoachRequest>>;

    /// All requests between one client and one coach, any status
    async fn query_requests_for_pair(
        &self,
        client_user_id: Uuid,
        coach_id: Uuid,
    ) -> AppResult<Vec<CoachRequest>>;

    /// A single request by id
    async fn query_request_by_id(&self, id: Uuid) -> AppResult<Option<CoachRequest>>;

    // ================================
    // Request writes
    // ================================

    /// Insert a new pending request.
    ///
    /// Fails with a unique-violation kind when a conflicting pending row
    /// already exists for the pair.
    async fn insert_request(&self, new: &NewCoachRequest) -> AppResult<CoachRequest>;

    /// Conditionally resolve a request: apply `resolution` only where the
    /// row's status still equals `expected`.
    ///
    /// Returns the number of rows affected; zero means the compare-and-swap
    /// missed because another actor resolved the request first.
    async fn update_request_conditional(
        &self,
        id: Uuid,
        expected: RequestStatus,
        resolution: &RequestResolution,
    ) -> AppResult<u64>;

    /// Delete request rows by id, best-effort; returns rows removed
    async fn delete_requests(&self, ids: &[Uuid]) -> AppResult<u64>;

    // ================================
    // Assignments
    // ================================

    /// Create an active coach-client assignment
    async fn insert_assignment(&self, coach_id: Uuid, client_user_id: Uuid) -> AppResult<()>;

    /// The assignment row linking the pair, if one exists
    async fn query_assignment(
        &self,
        coach_id: Uuid,
        client_user_id: Uuid,
    ) -> AppResult<Option<CoachClientAssignment>>;

    // ================================
    // Display joins
    // ================================

    /// Profile row for the client party, if present
    async fn query_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>>;

    /// Coach row for the coach party, if present
    async fn query_coach(&self, coach_id: Uuid) -> AppResult<Option<Coach>>;

    // ================================
    // Change subscriptions
    // ================================

    /// Open a change-event stream scoped to `filter`.
    ///
    /// Events are invalidation hints: they carry row identifiers but no
    /// joined display data. Dropping the returned stream unsubscribes.
    fn subscribe(&self, filter: SubscriptionFilter) -> ChangeStream;
}
