// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Security Event Log
//!
//! Structured records of denied and suspicious requests, kept for offline
//! audit. The log is a pure observer: nothing recorded here feeds back into a
//! gate decision, and a failing sink never fails the request.
//!
//! ## Sinks
//!
//! - [`TracingSink`] - `warn!` on the `security` target
//! - [`JsonlFileSink`] - one JSON object per line, written off-thread
//! - [`FanoutSink`] - several of the above

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub mod event;
pub mod sink;

pub use event::{SecurityEvent, SecurityEventKind};
pub use sink::{FanoutSink, JsonlFileSink, SecurityEventSink, TracingSink};

/// Handle the gates use to emit security events.
///
/// Applies the logging-enabled flag and isolates the gates from sink
/// failures.
#[derive(Clone)]
pub struct SecurityLog {
    enabled: bool,
    sink: Arc<dyn SecurityEventSink>,
}

impl SecurityLog {
    pub fn new(enabled: bool, sink: Arc<dyn SecurityEventSink>) -> Self {
        Self { enabled, sink }
    }

    /// A log that drops everything.
    pub fn disabled() -> Self {
        Self::new(false, Arc::new(TracingSink))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the event produced by `build`. The closure is not called when
    /// logging is disabled.
    pub fn record_with<F>(&self, build: F)
    where
        F: FnOnce() -> SecurityEvent,
    {
        if !self.enabled {
            return;
        }
        let sink = &self.sink;
        let outcome = catch_unwind(AssertUnwindSafe(|| sink.record(&build())));
        if outcome.is_err() {
            tracing::debug!("Security event sink panicked; event dropped");
        }
    }
}

impl std::fmt::Debug for SecurityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityLog")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
