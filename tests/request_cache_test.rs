// ABOUTME: Unit tests for the explicit request cache and its staleness policy
// ABOUTME: Pure transition coverage - optimistic apply, restore, and load flags
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

#![allow(missing_docs, clippy::unwrap_used)]

use std::time::Duration;

use chrono::Utc;
use coachlink_client::models::{
    CoachRequest, CoachRequestView, PartyDisplay, RequestResolution, RequestStatus,
};
use coachlink_client::requests::RequestCache;
use uuid::Uuid;

fn view(status: RequestStatus, coach_id: Uuid) -> CoachRequestView {
    CoachRequestView {
        request: CoachRequest {
            id: Uuid::new_v4(),
            client_user_id: Uuid::new_v4(),
            coach_id,
            status,
            message: None,
            requested_at: Utc::now(),
            responded_at: None,
            responded_by: None,
        },
        client: PartyDisplay::Unavailable,
        coach: PartyDisplay::Unavailable,
    }
}

const WINDOW: Duration = Duration::from_secs(5);

#[test]
fn fresh_nonempty_cache_serves_stale() {
    let mut cache = RequestCache::new();
    assert!(!cache.serves_stale(WINDOW));

    assert!(cache.begin_load());
    cache.finish_load(vec![view(RequestStatus::Pending, Uuid::new_v4())]);
    assert!(cache.serves_stale(WINDOW));
}

#[test]
fn empty_cache_never_serves_stale() {
    let mut cache = RequestCache::new();
    assert!(cache.begin_load());
    cache.finish_load(Vec::new());
    assert!(!cache.serves_stale(WINDOW));
}

#[test]
fn invalidate_defeats_the_window() {
    let mut cache = RequestCache::new();
    assert!(cache.begin_load());
    cache.finish_load(vec![view(RequestStatus::Pending, Uuid::new_v4())]);

    cache.invalidate();
    assert!(!cache.serves_stale(WINDOW));

    // The next load clears the flag it is about to satisfy
    assert!(cache.begin_load());
    cache.finish_load(vec![view(RequestStatus::Pending, Uuid::new_v4())]);
    assert!(cache.serves_stale(WINDOW));
}

#[test]
fn second_begin_load_is_refused_until_finish() {
    let mut cache = RequestCache::new();
    assert!(cache.begin_load());
    assert!(!cache.begin_load());
    assert!(cache.load_in_flight());

    cache.finish_load(Vec::new());
    assert!(!cache.load_in_flight());
    assert!(cache.begin_load());
}

#[test]
fn aborted_load_keeps_entries_and_marks_stale() {
    let mut cache = RequestCache::new();
    assert!(cache.begin_load());
    cache.finish_load(vec![view(RequestStatus::Pending, Uuid::new_v4())]);

    assert!(cache.begin_load());
    cache.abort_load();

    assert_eq!(cache.snapshot().len(), 1);
    assert!(!cache.load_in_flight());
    assert!(!cache.serves_stale(WINDOW));
}

#[test]
fn apply_and_restore_round_trip_exactly() {
    let mut cache = RequestCache::new();
    let target = view(RequestStatus::Pending, Uuid::new_v4());
    let target_id = target.request.id;
    let other = view(RequestStatus::Pending, Uuid::new_v4());

    assert!(cache.begin_load());
    cache.finish_load(vec![target, other]);
    let before = cache.snapshot();

    let resolution = RequestResolution {
        status: RequestStatus::Accepted,
        responded_at: Utc::now(),
        responded_by: Uuid::new_v4(),
    };
    assert!(cache.apply_resolution(target_id, &resolution));

    let optimistic = cache.snapshot();
    let entry = optimistic
        .iter()
        .find(|v| v.request.id == target_id)
        .unwrap();
    assert_eq!(entry.request.status, RequestStatus::Accepted);
    assert_eq!(entry.request.responded_by, Some(resolution.responded_by));

    cache.restore(before.clone());
    assert_eq!(cache.snapshot(), before);
}

#[test]
fn apply_to_unknown_id_is_a_no_op() {
    let mut cache = RequestCache::new();
    assert!(cache.begin_load());
    cache.finish_load(vec![view(RequestStatus::Pending, Uuid::new_v4())]);
    let before = cache.snapshot();

    let resolution = RequestResolution {
        status: RequestStatus::Rejected,
        responded_at: Utc::now(),
        responded_by: Uuid::new_v4(),
    };
    assert!(!cache.apply_resolution(Uuid::new_v4(), &resolution));
    assert_eq!(cache.snapshot(), before);
}

#[test]
fn derived_queries_count_only_pending() {
    let coach_a = Uuid::new_v4();
    let coach_b = Uuid::new_v4();

    let mut cache = RequestCache::new();
    assert!(cache.begin_load());
    cache.finish_load(vec![
        view(RequestStatus::Pending, coach_a),
        view(RequestStatus::Accepted, coach_b),
        view(RequestStatus::Rejected, coach_b),
    ]);

    assert_eq!(cache.pending_count(), 1);
    assert!(cache.has_pending_with(coach_a));
    assert!(!cache.has_pending_with(coach_b));
}
