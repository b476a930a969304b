// ABOUTME: Change-event types and broadcast fan-out for remote store subscriptions
// ABOUTME: Delivers identity-scoped row-change notifications used as cache invalidation hints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;
use uuid::Uuid;

/// Capacity of the broadcast channel backing subscriptions.
///
/// A lagged receiver is treated as an invalidation hint by consumers, so the
/// buffer only needs to ride out short bursts.
const CHANNEL_CAPACITY: usize = 64;

/// What happened to a request row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Row inserted
    Insert,
    /// Row updated
    Update,
    /// Row deleted
    Delete,
}

/// A row-change notification for a coach request.
///
/// Carries only identifiers, never joined display data: consumers treat
/// events as invalidation hints and reload, rather than applying the payload
/// to their cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Kind of row change
    pub kind: ChangeKind,
    /// Affected request
    pub request_id: Uuid,
    /// Client party of the affected request
    pub client_user_id: Uuid,
    /// Coach party of the affected request
    pub coach_id: Uuid,
}

/// Identity scope for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionFilter {
    /// All changes where the viewer is the client party
    Client(Uuid),
    /// All changes where the viewer is the coach party
    Coach(Uuid),
}

impl SubscriptionFilter {
    /// Whether an event falls inside this scope
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            Self::Client(id) => event.client_user_id == *id,
            Self::Coach(id) => event.coach_id == *id,
        }
    }
}

/// Signal delivered to a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSignal {
    /// A row change inside the subscription's scope
    Event(ChangeEvent),
    /// The receiver fell behind and `missed` events were dropped.
    ///
    /// Consumers must treat this as an invalidation hint, not an error.
    Lagged(u64),
}

/// A filtered change-event stream for one identity scope
#[derive(Debug)]
pub struct ChangeStream {
    filter: SubscriptionFilter,
    rx: BroadcastStream<ChangeEvent>,
}

impl ChangeStream {
    pub(crate) fn new(filter: SubscriptionFilter, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            filter,
            rx: BroadcastStream::new(rx),
        }
    }

    /// The scope this stream was subscribed with
    #[must_use]
    pub const fn filter(&self) -> SubscriptionFilter {
        self.filter
    }

    /// Wait for the next signal inside this stream's scope.
    ///
    /// Returns `None` once the publishing side is gone and all buffered
    /// events are drained.
    pub async fn next(&mut self) -> Option<StreamSignal> {
        while let Some(item) = self.rx.next().await {
            match item {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(StreamSignal::Event(event));
                }
                Ok(event) => trace!(?event, "change event outside subscription scope, skipped"),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    return Some(StreamSignal::Lagged(missed));
                }
            }
        }
        None
    }
}

/// Fan-out point for change events emitted by a remote store backend
#[derive(Debug, Clone)]
pub struct ChangeBroadcaster {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBroadcaster {
    /// Create a broadcaster with the default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Open a stream scoped to `filter`
    #[must_use]
    pub fn subscribe(&self, filter: SubscriptionFilter) -> ChangeStream {
        ChangeStream::new(filter, self.tx.subscribe())
    }

    /// Publish an event to all current subscribers.
    ///
    /// Having no subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: ChangeEvent) {
        if self.tx.send(event).is_err() {
            trace!(?event, "change event published with no subscribers");
        }
    }
}
