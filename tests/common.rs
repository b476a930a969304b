// ABOUTME: Shared test utilities for the coach-request lifecycle engine
// ABOUTME: In-memory store setup, seeded identities, and a fault-injecting RemoteStore wrapper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

// Test files: allow missing_docs (rustc lint) and unwrap (valid in tests)
#![allow(missing_docs, clippy::unwrap_used, dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coachlink_client::config::ClientConfig;
use coachlink_client::errors::{AppError, AppResult};
use coachlink_client::identity::StaticIdentity;
use coachlink_client::models::{
    Coach, CoachClientAssignment, CoachRequest, NewCoachRequest, Profile, RequestResolution,
    RequestStatus,
};
use coachlink_client::requests::RequestStore;
use coachlink_client::retry::RetryConfig;
use coachlink_client::store::{ChangeStream, RemoteStore, SqliteStore, SubscriptionFilter};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Notify;
use uuid::Uuid;

/// Fixed client identity used across tests
pub fn client_id() -> Uuid {
    Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap()
}

/// Fixed coach identity used across tests
pub fn coach_id() -> Uuid {
    Uuid::parse_str("660e8400-e29b-41d4-a716-446655440000").unwrap()
}

/// A second coach for scope-isolation tests
pub fn other_coach_id() -> Uuid {
    Uuid::parse_str("770e8400-e29b-41d4-a716-446655440000").unwrap()
}

/// Fast backoff so failure-path tests finish quickly
pub fn test_config() -> ClientConfig {
    ClientConfig {
        retry: RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 4,
        },
        cache_window: Duration::from_secs(5),
    }
}

/// Create a migrated in-memory store seeded with the fixed client profile
/// and both coaches.
///
/// The pool is capped at one connection: each SQLite in-memory connection is
/// its own database, so a second pooled connection would see empty tables.
pub async fn seeded_store() -> SqliteStore {
    coachlink_client::logging::init();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteStore::new(pool);
    store.migrate().await.unwrap();

    sqlx::query("INSERT INTO profiles (user_id, display_name, avatar_url) VALUES ($1, $2, $3)")
        .bind(client_id().to_string())
        .bind("Casey Client")
        .bind(Option::<String>::None)
        .execute(store.pool())
        .await
        .unwrap();

    sqlx::query("INSERT INTO coaches (id, full_name, avatar_url) VALUES ($1, $2, $3)")
        .bind(coach_id().to_string())
        .bind("Coach Kim")
        .bind(Some("https://cdn.example/kim.png"))
        .execute(store.pool())
        .await
        .unwrap();

    sqlx::query("INSERT INTO coaches (id, full_name, avatar_url) VALUES ($1, $2, $3)")
        .bind(other_coach_id().to_string())
        .bind("Coach Lee")
        .bind(Option::<String>::None)
        .execute(store.pool())
        .await
        .unwrap();

    store
}

/// Request store acting as the seeded client
pub fn client_request_store(remote: Arc<dyn RemoteStore>) -> Arc<RequestStore> {
    Arc::new(RequestStore::new(
        remote,
        Arc::new(StaticIdentity::client(client_id())),
        test_config(),
    ))
}

/// Request store acting as the seeded coach
pub fn coach_request_store(remote: Arc<dyn RemoteStore>) -> Arc<RequestStore> {
    Arc::new(RequestStore::new(
        remote,
        Arc::new(StaticIdentity::coach(coach_id(), "Coach Kim".to_owned())),
        test_config(),
    ))
}

/// One-shot rendezvous point for pausing a store call mid-operation.
///
/// Arm it, wait for the operation to enter the gated call, then open it to
/// let the call proceed. Disarms itself after one pass so retries cannot
/// deadlock.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

/// Fault-injecting wrapper around the SQLite backend.
///
/// Counters and flags let tests assert I/O behavior (throttling, validation
/// before I/O) and force specific failure paths deterministically.
pub struct ChaosStore {
    inner: SqliteStore,
    /// Calls to `query_requests_for_pair`
    pub pair_query_count: AtomicU32,
    /// Calls to the client/coach list queries
    pub list_query_count: AtomicU32,
    /// Inject this many `query_request_by_id` failures
    pub fail_fetches: AtomicU32,
    /// Inject this many list-query failures
    pub fail_lists: AtomicU32,
    /// Fail every `query_profile` call
    pub fail_profile_joins: AtomicBool,
    /// Fail every `insert_assignment` call
    pub fail_assignments: AtomicBool,
    /// Make `query_requests_for_pair` return no rows
    pub hide_pair_rows: AtomicBool,
    /// Pauses `query_request_by_id` when armed
    pub fetch_gate: Gate,
    /// Pauses `update_request_conditional` when armed
    pub update_gate: Gate,
    /// Pauses the list queries when armed
    pub list_gate: Gate,
}

impl ChaosStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            pair_query_count: AtomicU32::new(0),
            list_query_count: AtomicU32::new(0),
            fail_fetches: AtomicU32::new(0),
            fail_lists: AtomicU32::new(0),
            fail_profile_joins: AtomicBool::new(false),
            fail_assignments: AtomicBool::new(false),
            hide_pair_rows: AtomicBool::new(false),
            fetch_gate: Gate::default(),
            update_gate: Gate::default(),
            list_gate: Gate::default(),
        }
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    fn countdown(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RemoteStore for ChaosStore {
    async fn query_requests_for_client(
        &self,
        client_user_id: Uuid,
    ) -> AppResult<Vec<CoachRequest>> {
        self.list_gate.pass().await;
        self.list_query_count.fetch_add(1, Ordering::SeqCst);
        if Self::countdown(&self.fail_lists) {
            return Err(AppError::database("injected list failure"));
        }
        self.inner.query_requests_for_client(client_user_id).await
    }

    async fn query_requests_for_coach(&self, coach_id: Uuid) -> AppResult<Vec<CoachRequest>> {
        self.list_gate.pass().await;
        self.list_query_count.fetch_add(1, Ordering::SeqCst);
        if Self::countdown(&self.fail_lists) {
            return Err(AppError::database("injected list failure"));
        }
        self.inner.query_requests_for_coach(coach_id).await
    }

    async fn query_requests_for_pair(
        &self,
        client_user_id: Uuid,
        coach_id: Uuid,
    ) -> AppResult<Vec<CoachRequest>> {
        self.pair_query_count.fetch_add(1, Ordering::SeqCst);
        if self.hide_pair_rows.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        self.inner
            .query_requests_for_pair(client_user_id, coach_id)
            .await
    }

    async fn query_request_by_id(&self, id: Uuid) -> AppResult<Option<CoachRequest>> {
        self.fetch_gate.pass().await;
        if Self::countdown(&self.fail_fetches) {
            return Err(AppError::database("injected fetch failure"));
        }
        self.inner.query_request_by_id(id).await
    }

    async fn insert_request(&self, new: &NewCoachRequest) -> AppResult<CoachRequest> {
        self.inner.insert_request(new).await
    }

    async fn update_request_conditional(
        &self,
        id: Uuid,
        expected: RequestStatus,
        resolution: &RequestResolution,
    ) -> AppResult<u64> {
        self.update_gate.pass().await;
        self.inner
            .update_request_conditional(id, expected, resolution)
            .await
    }

    async fn delete_requests(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.inner.delete_requests(ids).await
    }

    async fn insert_assignment(&self, coach_id: Uuid, client_user_id: Uuid) -> AppResult<()> {
        if self.fail_assignments.load(Ordering::SeqCst) {
            return Err(AppError::database("injected assignment failure"));
        }
        self.inner.insert_assignment(coach_id, client_user_id).await
    }

    async fn query_assignment(
        &self,
        coach_id: Uuid,
        client_user_id: Uuid,
    ) -> AppResult<Option<CoachClientAssignment>> {
        self.inner.query_assignment(coach_id, client_user_id).await
    }

    async fn query_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        if self.fail_profile_joins.load(Ordering::SeqCst) {
            return Err(AppError::database("injected profile join failure"));
        }
        self.inner.query_profile(user_id).await
    }

    async fn query_coach(&self, coach_id: Uuid) -> AppResult<Option<Coach>> {
        self.inner.query_coach(coach_id).await
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> ChangeStream {
        self.inner.subscribe(filter)
    }
}
