// ABOUTME: Tracing subscriber initialization for embedding applications
// ABOUTME: One-shot env-filtered logging setup, safe to call from multiple entry points
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Filter level comes from `RUST_LOG` (default `info`). Subsequent calls are
/// no-ops, so library consumers and test binaries can both call this without
/// coordinating.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // A subscriber may already be installed by the host app; that is fine
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
