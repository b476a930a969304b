// ABOUTME: Change listener bridging remote push events to cache invalidation
// ABOUTME: Identity-scoped subscriptions that trigger a full resync on every row change
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::requests::store::RequestStore;
use crate::store::{ChangeStream, StreamSignal, SubscriptionFilter};

/// Which viewer role a stream reloads for
#[derive(Debug, Clone, Copy)]
enum ListenerRole {
    Client,
    Coach,
}

/// Subscribes to row changes scoped to the viewer's identity and treats
/// every event as an invalidation hint.
///
/// Events are never applied to the cache directly: the payload is the raw
/// row without joined display data, so the listener invalidates and reloads
/// instead. One stream per identity role; starting again replaces the
/// previous subscriptions; dropping the listener tears them down.
pub struct ChangeListener {
    tasks: Vec<JoinHandle<()>>,
}

impl ChangeListener {
    /// Subscribe for every role the store's identity currently has.
    ///
    /// A store whose identity has neither a user nor a coach session gets a
    /// listener with no active streams.
    #[must_use]
    pub fn start(store: &Arc<RequestStore>) -> Self {
        let mut tasks = Vec::new();

        if let Some(user) = store.identity().current_user() {
            let stream = store.remote().subscribe(SubscriptionFilter::Client(user.id));
            tasks.push(tokio::spawn(run_stream(
                Arc::clone(store),
                stream,
                ListenerRole::Client,
            )));
        }
        if let Some(coach) = store.identity().current_coach() {
            let stream = store
                .remote()
                .subscribe(SubscriptionFilter::Coach(coach.id));
            tasks.push(tokio::spawn(run_stream(
                Arc::clone(store),
                stream,
                ListenerRole::Coach,
            )));
        }

        debug!(streams = tasks.len(), "change listener started");
        Self { tasks }
    }

    /// Tear down the previous subscriptions and subscribe afresh.
    ///
    /// Used when the identity changes; guarantees at most one active
    /// subscription per identity per stream.
    pub fn restart(&mut self, store: &Arc<RequestStore>) {
        self.stop();
        *self = Self::start(store);
    }

    /// Abort all subscription tasks
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Whether any subscription stream is still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_stream(store: Arc<RequestStore>, mut stream: ChangeStream, role: ListenerRole) {
    while let Some(signal) = stream.next().await {
        match signal {
            StreamSignal::Event(event) => {
                debug!(?event, "change event received, resyncing");
            }
            // Missed events carry no less information than received ones:
            // either way the cache is stale and a resync follows
            StreamSignal::Lagged(missed) => {
                warn!(missed, "change stream lagged, resyncing");
            }
        }

        store.invalidate().await;
        let reloaded = match role {
            ListenerRole::Client => store.load_for_client().await.map(|_| ()),
            ListenerRole::Coach => store.load_for_coach().await.map(|_| ()),
        };
        if let Err(e) = reloaded {
            warn!(error = %e, "resync after change event failed");
        }
    }
    debug!("change stream closed");
}
