// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Destinations for security events.
//!
//! Sinks are called on the request path. They must not block and must not
//! report failure; whatever goes wrong inside a sink stays inside it.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use super::SecurityEvent;

/// Append-only receiver of security events.
pub trait SecurityEventSink: Send + Sync {
    fn record(&self, event: &SecurityEvent);
}

impl<T: SecurityEventSink + ?Sized> SecurityEventSink for Arc<T> {
    fn record(&self, event: &SecurityEvent) {
        (**self).record(event)
    }
}

/// Writes events to the `security` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SecurityEventSink for TracingSink {
    fn record(&self, event: &SecurityEvent) {
        tracing::warn!(
            target: "security",
            event_id = %event.event_id,
            kind = %event.kind,
            client = %event.client,
            origin = event.declared_origin.as_deref().unwrap_or("-"),
            user_agent = event.user_agent.as_deref().unwrap_or("-"),
            details = %event.details_line(),
            "Security event"
        );
    }
}

/// Events queued for the writer thread before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Appends events to a file, one JSON object per line.
///
/// Writes happen on a dedicated thread fed by a bounded queue. `record` only
/// ever enqueues; when the queue is full the event is dropped. Dropping the
/// last handle closes the queue and lets the writer flush and exit.
pub struct JsonlFileSink {
    tx: SyncSender<SecurityEvent>,
    path: PathBuf,
}

impl JsonlFileSink {
    /// Open (or create) `path` for appending and start the writer thread.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_with_capacity(path, DEFAULT_QUEUE_CAPACITY)
    }

    /// Like [`JsonlFileSink::open`], holding at most `capacity` pending events.
    pub fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (tx, rx) = mpsc::sync_channel::<SecurityEvent>(capacity);

        thread::Builder::new()
            .name("security-log-writer".to_string())
            .spawn(move || {
                let mut writer = BufWriter::new(file);
                while let Ok(event) = rx.recv() {
                    if let Err(e) = write_line(&mut writer, &event) {
                        tracing::debug!(error = %e, "Failed to append security event");
                        continue;
                    }
                    if let Err(e) = writer.flush() {
                        tracing::debug!(error = %e, "Failed to flush security log");
                    }
                }
            })?;

        Ok(Self { tx, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_line(writer: &mut impl Write, event: &SecurityEvent) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, event)?;
    writer.write_all(b"\n")
}

impl SecurityEventSink for JsonlFileSink {
    fn record(&self, event: &SecurityEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::debug!(
                    event_id = %event.event_id,
                    "Security log queue full; event dropped"
                );
            }
            // Writer gone: nothing useful to do on the request path.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl std::fmt::Debug for JsonlFileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlFileSink")
            .field("path", &self.path)
            .finish()
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn SecurityEventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn SecurityEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl SecurityEventSink for FanoutSink {
    fn record(&self, event: &SecurityEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{testing::RecordingSink, SecurityEventKind};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn read_lines(path: &Path, expected: usize) -> Vec<String> {
        // The writer thread runs asynchronously; poll briefly.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let content = std::fs::read_to_string(path).unwrap_or_default();
            let lines: Vec<String> = content.lines().map(str::to_string).collect();
            if lines.len() >= expected || Instant::now() > deadline {
                return lines;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn jsonl_sink_appends_one_object_per_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("security.jsonl");
        let sink = JsonlFileSink::open(&path).unwrap();

        let first = SecurityEvent::new(SecurityEventKind::AuthFailure, "198.51.100.1")
            .with_detail("path", "/api/trades");
        let second = SecurityEvent::new(SecurityEventKind::SpoofingAttempt, "198.51.100.1")
            .with_origin(Some("http://localhost"));
        sink.record(&first);
        sink.record(&second);

        let lines = read_lines(&path, 2);
        assert_eq!(lines.len(), 2);
        let parsed: Vec<SecurityEvent> = lines
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed[0], first);
        assert_eq!(parsed[1], second);
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn jsonl_sink_appends_to_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("security.jsonl");
        std::fs::write(&path, "{\"previous\":true}\n").unwrap();

        let sink = JsonlFileSink::open(&path).unwrap();
        sink.record(&SecurityEvent::new(SecurityEventKind::AuthFailure, "::1"));

        let lines = read_lines(&path, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "{\"previous\":true}");
    }

    #[test]
    fn jsonl_sink_drops_events_instead_of_blocking_when_full() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("security.jsonl");
        let sink = JsonlFileSink::open_with_capacity(&path, 1).unwrap();

        let burst = 500;
        for _ in 0..burst {
            sink.record(&SecurityEvent::new(SecurityEventKind::AuthFailure, "203.0.113.9"));
        }

        let lines = read_lines(&path, 1);
        assert!(!lines.is_empty());
        assert!(lines.len() <= burst);
        let first: SecurityEvent = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.kind, SecurityEventKind::AuthFailure);
    }

    #[test]
    fn jsonl_sink_open_fails_for_missing_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("no-such-dir").join("security.jsonl");
        assert!(JsonlFileSink::open(path).is_err());
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        let fanout = FanoutSink::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(TracingSink));
        assert_eq!(fanout.len(), 3);

        fanout.record(&SecurityEvent::new(SecurityEventKind::AuthFailure, "::1"));
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }
}
