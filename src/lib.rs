// ABOUTME: Library entry point for the CoachLink mobile client core
// ABOUTME: Coach-request lifecycle engine with optimistic cache, retries, and live resync
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

#![deny(unsafe_code)]

//! # CoachLink Client Core
//!
//! The coach-request lifecycle engine behind the CoachLink mobile app: a
//! client proposes a coaching relationship, a coach accepts or declines it,
//! and every viewer of that relationship stays consistent despite concurrent
//! edits, network retries, and live push updates.
//!
//! ## Features
//!
//! - **Lifecycle state machine**: `pending -> accepted | rejected`, resolved
//!   exactly once; stale actions are told the actual outcome instead of
//!   silently overwriting it
//! - **Optimistic updates**: immediate UI feedback with exact rollback on
//!   any failure
//! - **Processing guard**: double-taps never issue duplicate network calls
//! - **Transient-failure resilience**: exponential-backoff retries around
//!   remote reads and idempotent writes
//! - **Live resync**: push events treated as invalidation hints driving a
//!   full reload
//!
//! ## Architecture
//!
//! The view layer calls [`requests::RequestStore`] operations; the store
//! validates, applies the optimistic update, and issues remote mutations
//! through the [`store::RemoteStore`] capability. On success the
//! [`requests::ChangeListener`] reconciles the cache from the same
//! connection; on failure the pre-operation view state is restored exactly.
//!
//! Rendering, navigation, authentication, media, and chat transport are
//! external collaborators and live outside this crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use coachlink_client::config::ClientConfig;
//! use coachlink_client::identity::StaticIdentity;
//! use coachlink_client::requests::RequestStore;
//! use coachlink_client::store::SqliteStore;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let remote = SqliteStore::connect("sqlite::memory:").await?;
//!     remote.migrate().await?;
//!
//!     let identity = StaticIdentity::client(Uuid::new_v4());
//!     let store = RequestStore::new(
//!         Arc::new(remote),
//!         Arc::new(identity),
//!         ClientConfig::from_env()?,
//!     );
//!
//!     let coach_id = Uuid::new_v4();
//!     let request = store.send_request(coach_id, Some("Hi")).await?;
//!     println!("request {} is {}", request.id, request.status);
//!     Ok(())
//! }
//! ```

/// Environment-only runtime configuration
pub mod config;

/// Application error types shared across the crate
pub mod errors;

/// External auth collaborator contract
pub mod identity;

/// Tracing subscriber initialization
pub mod logging;

/// Domain entities for the request lifecycle
pub mod models;

/// Request Store core: state machine, cache, change listener
pub mod requests;

/// Exponential-backoff retry wrapper for remote calls
pub mod retry;

/// Remote store capability and reference backend
pub mod store;
