// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Security event records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of security events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// Credential gate denied the request.
    AuthFailure,
    /// Origin gate denied a caller it could not trust.
    ExternalAccessDenied,
    /// A non-loopback caller declared a local origin.
    SpoofingAttempt,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::AuthFailure => "auth_failure",
            SecurityEventKind::ExternalAccessDenied => "external_access_denied",
            SecurityEventKind::SpoofingAttempt => "spoofing_attempt",
        }
    }
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A security event entry. Append-only; the gates never read these back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub kind: SecurityEventKind,
    /// Client endpoint the request was attributed to.
    pub client: String,
    /// Declared origin (Origin or Referer), verbatim.
    pub declared_origin: Option<String>,
    /// Caller's User-Agent, verbatim.
    pub user_agent: Option<String>,
    /// Additional context.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl SecurityEvent {
    /// Create a new security event.
    pub fn new(kind: SecurityEventKind, client: impl std::fmt::Display) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            client: client.to_string(),
            declared_origin: None,
            user_agent: None,
            details: BTreeMap::new(),
        }
    }

    /// Set the declared origin.
    pub fn with_origin(mut self, origin: Option<impl Into<String>>) -> Self {
        self.declared_origin = origin.map(Into::into);
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: Option<impl Into<String>>) -> Self {
        self.user_agent = user_agent.map(Into::into);
        self
    }

    /// Add one detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Details rendered as `k=v` pairs, for single-line log output.
    pub fn details_line(&self) -> String {
        self.details
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_security_event() {
        let event = SecurityEvent::new(SecurityEventKind::SpoofingAttempt, "203.0.113.4")
            .with_origin(Some("http://localhost:3000"))
            .with_user_agent(None::<String>)
            .with_detail("matched_local_name", "localhost");

        assert_eq!(event.kind, SecurityEventKind::SpoofingAttempt);
        assert_eq!(event.client, "203.0.113.4");
        assert_eq!(event.declared_origin.as_deref(), Some("http://localhost:3000"));
        assert!(event.user_agent.is_none());
        assert_eq!(event.details["matched_local_name"], "localhost");
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn serializes_kind_in_snake_case() {
        let event = SecurityEvent::new(SecurityEventKind::ExternalAccessDenied, "unknown");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "external_access_denied");
        assert!(json.get("details").is_none());

        let back: SecurityEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn details_line_is_sorted() {
        let event = SecurityEvent::new(SecurityEventKind::AuthFailure, "::1")
            .with_detail("reason", "invalid_token")
            .with_detail("path", "/api/trades");
        assert_eq!(event.details_line(), "path=/api/trades reason=invalid_token");
    }
}
