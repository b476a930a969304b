// ABOUTME: Request Store - the coach-request lifecycle state machine
// ABOUTME: Create/accept/reject operations with processing guard, optimistic update, and rollback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::errors::AppResult;
use crate::identity::IdentityProvider;
use crate::models::{
    CoachRequest, CoachRequestView, NewCoachRequest, PartyDisplay, RequestResolution,
    RequestStatus, MAX_MESSAGE_LEN,
};
use crate::requests::cache::RequestCache;
use crate::requests::error::RequestError;
use crate::retry::with_retry;
use crate::store::RemoteStore;

/// Releases the processing-set entry on every exit path
struct ProcessingGuard<'a> {
    set: &'a DashSet<Uuid>,
    id: Uuid,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

/// Authoritative in-memory owner of the viewer's visible request set.
///
/// Holds the lifecycle state machine, the per-request processing guard, and
/// the optimistic-update/rollback logic. The remote row remains the single
/// source of truth; this store's cache is reconciled on load and on
/// invalidation events from the change listener.
pub struct RequestStore {
    remote: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentityProvider>,
    config: ClientConfig,
    cache: Mutex<RequestCache>,
    processing: DashSet<Uuid>,
}

impl RequestStore {
    /// Create a store over a remote backend and an identity source
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        identity: Arc<dyn IdentityProvider>,
        config: ClientConfig,
    ) -> Self {
        Self {
            remote,
            identity,
            config,
            cache: Mutex::new(RequestCache::new()),
            processing: DashSet::new(),
        }
    }

    /// The remote backend this store operates against
    #[must_use]
    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    /// The identity source this store resolves callers with
    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    // ================================
    // Create
    // ================================

    /// Send a coaching request from the authenticated client to `coach_id`.
    ///
    /// Prior rejected requests for the pair are deleted best-effort before
    /// the new pending row is inserted. The created row feeds the caller
    /// directly; the cache is reconciled by the change listener.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Validation`] on empty coach id or over-long message
    /// - [`RequestError::DuplicatePending`] when a pending request exists
    /// - [`RequestError::AlreadyAccepted`] when the pair already matched
    /// - [`RequestError::Store`] on remote failure after retries
    pub async fn send_request(
        &self,
        coach_id: Uuid,
        message: Option<&str>,
    ) -> Result<CoachRequest, RequestError> {
        let user = self
            .identity
            .current_user()
            .ok_or(RequestError::Unauthenticated)?;

        if coach_id.is_nil() {
            return Err(RequestError::Validation(
                "coach id must not be empty".to_owned(),
            ));
        }
        let message = normalize_message(message)?;

        let existing = with_retry("query requests for pair", &self.config.retry, || {
            self.remote.query_requests_for_pair(user.id, coach_id)
        })
        .await?;

        if existing
            .iter()
            .any(|r| r.status == RequestStatus::Pending)
        {
            return Err(RequestError::DuplicatePending);
        }
        if existing
            .iter()
            .any(|r| r.status == RequestStatus::Accepted)
        {
            return Err(RequestError::AlreadyAccepted);
        }

        let rejected: Vec<Uuid> = existing
            .iter()
            .filter(|r| r.status == RequestStatus::Rejected)
            .map(|r| r.id)
            .collect();
        if !rejected.is_empty() {
            // Best-effort cleanup; a failed delete never blocks the new request
            let deleted = with_retry("delete rejected requests", &self.config.retry, || {
                self.remote.delete_requests(&rejected)
            })
            .await;
            match deleted {
                Ok(count) => debug!(%coach_id, count, "removed prior rejected requests"),
                Err(e) => warn!(%coach_id, error = %e, "failed to remove prior rejected requests"),
            }
        }

        let new = NewCoachRequest {
            client_user_id: user.id,
            coach_id,
            message,
        };
        match self.remote.insert_request(&new).await {
            Ok(created) => {
                info!(request_id = %created.id, %coach_id, "coach request sent");
                Ok(created)
            }
            // A concurrent writer slipped a pending row in between the check
            // and the insert
            Err(e) if e.is_unique_violation() => Err(RequestError::DuplicatePending),
            Err(e) => Err(RequestError::Store(e)),
        }
    }

    // ================================
    // Resolve
    // ================================

    /// Accept a pending request as the authenticated coach.
    ///
    /// On success an active coach-client assignment links the pair.
    ///
    /// # Errors
    ///
    /// `AlreadyProcessing`, `NotFound`, `AlreadyResolved`, `Unauthenticated`,
    /// or `Store`. Any failure restores the pre-operation view state exactly.
    pub async fn accept_request(&self, id: Uuid) -> Result<(), RequestError> {
        self.resolve(id, RequestStatus::Accepted).await
    }

    /// Reject a pending request as the authenticated coach.
    ///
    /// # Errors
    ///
    /// Same failure paths as [`accept_request`](Self::accept_request), minus
    /// the assignment write.
    pub async fn reject_request(&self, id: Uuid) -> Result<(), RequestError> {
        self.resolve(id, RequestStatus::Rejected).await
    }

    async fn resolve(&self, id: Uuid, target: RequestStatus) -> Result<(), RequestError> {
        let coach = self
            .identity
            .current_coach()
            .ok_or(RequestError::Unauthenticated)?;

        // Double-taps and re-rendered action buttons bounce here instead of
        // issuing duplicate network calls
        if !self.processing.insert(id) {
            return Err(RequestError::AlreadyProcessing);
        }
        let _guard = ProcessingGuard {
            set: &self.processing,
            id,
        };

        let resolution = RequestResolution {
            status: target,
            responded_at: Utc::now(),
            responded_by: coach.id,
        };

        let snapshot = {
            let mut cache = self.cache.lock().await;
            let snapshot = cache.snapshot();
            cache.apply_resolution(id, &resolution);
            snapshot
        };

        // Fail fast on requests another actor already resolved; the
        // conditional update below remains the authority
        let current = match with_retry("fetch request status", &self.config.retry, || {
            self.remote.query_request_by_id(id)
        })
        .await
        {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.restore(snapshot).await;
                return Err(RequestError::NotFound);
            }
            Err(e) => {
                warn!(%id, error = %e, "status fetch failed before resolution");
                self.restore(snapshot).await;
                return Err(RequestError::NotFound);
            }
        };
        if current.status != RequestStatus::Pending {
            self.restore(snapshot).await;
            return Err(RequestError::AlreadyResolved(current.status));
        }

        // Issued exactly once: re-applying could mask a lost race
        let affected = match self
            .remote
            .update_request_conditional(id, RequestStatus::Pending, &resolution)
            .await
        {
            Ok(affected) => affected,
            Err(e) => {
                self.restore(snapshot).await;
                return Err(RequestError::Store(e));
            }
        };
        if affected == 0 {
            self.restore(snapshot).await;
            let outcome = self.remote.query_request_by_id(id).await.ok().flatten();
            return Err(outcome.map_or(RequestError::NotFound, |row| {
                RequestError::AlreadyResolved(row.status)
            }));
        }

        if target == RequestStatus::Accepted {
            let linked = with_retry("create assignment", &self.config.retry, || {
                self.ensure_assignment(coach.id, current.client_user_id)
            })
            .await;
            if let Err(e) = linked {
                // The status update already landed server-side and is not
                // compensated; the error is surfaced instead
                warn!(%id, error = %e, "assignment creation failed after accept");
                self.restore(snapshot).await;
                return Err(RequestError::Store(e));
            }
        }

        info!(%id, status = %target, "request resolved");
        Ok(())
    }

    /// Create the assignment unless the pair is already linked.
    ///
    /// The existence check makes the write idempotent, which is what allows
    /// it to sit inside the retry wrapper.
    async fn ensure_assignment(&self, coach_id: Uuid, client_user_id: Uuid) -> AppResult<()> {
        if self
            .remote
            .query_assignment(coach_id, client_user_id)
            .await?
            .is_some()
        {
            return Ok(());
        }
        match self.remote.insert_assignment(coach_id, client_user_id).await {
            // A concurrent accept created it first; the pair is linked either way
            Err(e) if e.is_unique_violation() => Ok(()),
            other => other,
        }
    }

    // ================================
    // Load
    // ================================

    /// Load the request list visible to the authenticated client.
    ///
    /// Serves the cached list inside the staleness window and skips entirely
    /// when a load is already in flight. Display joins are best-effort per
    /// row.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Store`] when the row fetch fails after
    /// retries; join failures degrade to [`PartyDisplay::Unavailable`]
    /// instead.
    pub async fn load_for_client(&self) -> Result<Vec<CoachRequestView>, RequestError> {
        let user = self
            .identity
            .current_user()
            .ok_or(RequestError::Unauthenticated)?;
        self.load_list(|| self.remote.query_requests_for_client(user.id))
            .await
    }

    /// Load the request list visible to the authenticated coach.
    ///
    /// # Errors
    ///
    /// Same behavior as [`load_for_client`](Self::load_for_client).
    pub async fn load_for_coach(&self) -> Result<Vec<CoachRequestView>, RequestError> {
        let coach = self
            .identity
            .current_coach()
            .ok_or(RequestError::Unauthenticated)?;
        self.load_list(|| self.remote.query_requests_for_coach(coach.id))
            .await
    }

    async fn load_list<F, Fut>(&self, fetch: F) -> Result<Vec<CoachRequestView>, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<Vec<CoachRequest>>>,
    {
        {
            let mut cache = self.cache.lock().await;
            if cache.serves_stale(self.config.cache_window) {
                debug!("load served from cache inside staleness window");
                return Ok(cache.snapshot());
            }
            if !cache.begin_load() {
                debug!("load skipped, another load already in flight");
                return Ok(cache.snapshot());
            }
        }

        let fetched = with_retry("load requests", &self.config.retry, fetch).await;
        let rows = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                self.cache.lock().await.abort_load();
                return Err(RequestError::Store(e));
            }
        };

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(self.join_row(row).await);
        }

        let mut cache = self.cache.lock().await;
        cache.finish_load(views.clone());
        Ok(views)
    }

    /// Join display data for one row; a failed join degrades that row only
    async fn join_row(&self, request: CoachRequest) -> CoachRequestView {
        let client = match self.remote.query_profile(request.client_user_id).await {
            Ok(Some(profile)) => PartyDisplay::known(profile.display_name, profile.avatar_url),
            Ok(None) => PartyDisplay::Unavailable,
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "client profile join failed");
                PartyDisplay::Unavailable
            }
        };
        let coach = match self.remote.query_coach(request.coach_id).await {
            Ok(Some(coach)) => PartyDisplay::known(coach.full_name, coach.avatar_url),
            Ok(None) => PartyDisplay::Unavailable,
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "coach join failed");
                PartyDisplay::Unavailable
            }
        };

        CoachRequestView {
            request,
            client,
            coach,
        }
    }

    // ================================
    // Derived queries and cache control
    // ================================

    /// Number of cached requests still pending
    pub async fn pending_count(&self) -> usize {
        self.cache.lock().await.pending_count()
    }

    /// Whether a pending request to `coach_id` is cached
    pub async fn has_pending_with(&self, coach_id: Uuid) -> bool {
        self.cache.lock().await.has_pending_with(coach_id)
    }

    /// Current cached list by value, for rendering
    pub async fn snapshot(&self) -> Vec<CoachRequestView> {
        self.cache.lock().await.snapshot()
    }

    /// Flag the cache stale so the next load bypasses the staleness window.
    ///
    /// Called by the change listener on every push event, and available to
    /// embedders for pull-to-refresh.
    pub async fn invalidate(&self) {
        self.cache.lock().await.invalidate();
    }

    async fn restore(&self, snapshot: Vec<CoachRequestView>) {
        self.cache.lock().await.restore(snapshot);
    }
}

/// Trim the message, dropping it entirely when empty
fn normalize_message(message: Option<&str>) -> Result<Option<String>, RequestError> {
    let Some(raw) = message else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(RequestError::Validation(format!(
            "message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_owned()))
}
