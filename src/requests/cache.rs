// ABOUTME: Explicit in-memory cache for the viewer's request list
// ABOUTME: Staleness policy (TTL window, in-flight flag, invalidation) and optimistic transitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::models::{CoachRequestView, RequestResolution, RequestStatus};

/// Cached projection of the viewer's visible request set.
///
/// The remote row is the single source of truth; this cache is an
/// eventually-consistent projection reconciled on load and on invalidation
/// events, never the reverse. All mutation goes through the owning
/// `RequestStore`; the view layer only reads snapshots.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: Vec<CoachRequestView>,
    last_refresh: Option<Instant>,
    invalidated: bool,
    load_in_flight: bool,
}

impl RequestCache {
    /// Empty cache, stale by definition
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entries by value, for rendering
    #[must_use]
    pub fn snapshot(&self) -> Vec<CoachRequestView> {
        self.entries.clone()
    }

    /// Whether a load should serve the cached list instead of refetching.
    ///
    /// Stale is served only when the list is non-empty, younger than
    /// `window`, and not explicitly invalidated. This throttle reduces
    /// redundant traffic; it is never a correctness mechanism.
    #[must_use]
    pub fn serves_stale(&self, window: Duration) -> bool {
        !self.invalidated
            && !self.entries.is_empty()
            && self
                .last_refresh
                .is_some_and(|at| at.elapsed() < window)
    }

    /// Whether a load is currently running
    #[must_use]
    pub const fn load_in_flight(&self) -> bool {
        self.load_in_flight
    }

    /// Mark a load as started; clears the invalidation flag it is about to
    /// satisfy. Returns `false` when a load is already in flight.
    pub fn begin_load(&mut self) -> bool {
        if self.load_in_flight {
            return false;
        }
        self.load_in_flight = true;
        self.invalidated = false;
        true
    }

    /// Install a freshly fetched list and finish the in-flight load
    pub fn finish_load(&mut self, entries: Vec<CoachRequestView>) {
        self.entries = entries;
        self.last_refresh = Some(Instant::now());
        self.load_in_flight = false;
    }

    /// Finish a failed load, keeping the previous list and re-flagging it
    /// stale so the next load retries immediately
    pub fn abort_load(&mut self) {
        self.load_in_flight = false;
        self.invalidated = true;
    }

    /// Flag the cache stale so the next load bypasses the TTL window
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Optimistically resolve the matching entry in place.
    ///
    /// Callers take a [`snapshot`](Self::snapshot) first and
    /// [`restore`](Self::restore) it on failure; apply and restore together
    /// form the transactional optimistic update.
    pub fn apply_resolution(&mut self, id: Uuid, resolution: &RequestResolution) -> bool {
        self.entries
            .iter_mut()
            .find(|view| view.request.id == id)
            .map(|view| {
                view.request.status = resolution.status;
                view.request.responded_at = Some(resolution.responded_at);
                view.request.responded_by = Some(resolution.responded_by);
            })
            .is_some()
    }

    /// Restore a previously taken snapshot, undoing optimistic changes
    pub fn restore(&mut self, snapshot: Vec<CoachRequestView>) {
        self.entries = snapshot;
    }

    /// Number of cached requests still pending
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|view| view.request.status.is_pending())
            .count()
    }

    /// Whether a pending request to `coach_id` is cached
    #[must_use]
    pub fn has_pending_with(&self, coach_id: Uuid) -> bool {
        self.entries.iter().any(|view| {
            view.request.coach_id == coach_id && view.request.status == RequestStatus::Pending
        })
    }
}
