// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gate decisions and denial responses.
//!
//! A denial carries two distinct things: an internal [`DenialReason`] used
//! for logs and tests, and the public message returned to the caller. The
//! public side is limited to the fixed templates below.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

const MISSING_AUTHORIZATION_MESSAGE: &str =
    "Authorization header is required. Format: Authorization: Bearer <token>";
const MALFORMED_HEADER_MESSAGE: &str = "Malformed Authorization header. Expected: Bearer <token>";
const INVALID_SCHEME_MESSAGE: &str =
    "Authorization header must use Bearer scheme. Format: Authorization: Bearer <token>";
const INVALID_TOKEN_MESSAGE: &str =
    "Invalid Bearer token. Please check your authentication credentials.";
const NO_ORIGIN_EXTERNAL_IP_MESSAGE: &str =
    "Access denied - no origin header and not from localhost";
const DOMAIN_NOT_ALLOWED_PREFIX: &str = "Access denied for domain: ";

/// Why a gate denied a request. Internal vocabulary, never sent to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialReason {
    /// No `Authorization` header, or an empty one
    MissingAuthorization,
    /// Header present but not `<scheme> <token>`
    MalformedHeader,
    /// Scheme other than Bearer
    InvalidScheme,
    /// Token not in the credential set
    InvalidToken,
    /// Remote caller without Origin or Referer
    NoOriginExternalIp,
    /// Declared origin not whitelisted, or a spoofed local origin
    DomainNotAllowed,
}

impl DenialReason {
    /// Short code placed in the `error` field of the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            DenialReason::MissingAuthorization => "Missing authorization",
            DenialReason::MalformedHeader => "Malformed header",
            DenialReason::InvalidScheme => "Invalid scheme",
            DenialReason::InvalidToken => "Invalid token",
            DenialReason::NoOriginExternalIp => "Access denied",
            DenialReason::DomainNotAllowed => "Domain not allowed",
        }
    }

    /// HTTP status for this denial.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DenialReason::MissingAuthorization
            | DenialReason::MalformedHeader
            | DenialReason::InvalidScheme
            | DenialReason::InvalidToken => StatusCode::UNAUTHORIZED,
            DenialReason::NoOriginExternalIp | DenialReason::DomainNotAllowed => {
                StatusCode::FORBIDDEN
            }
        }
    }

    /// Identifier used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::MissingAuthorization => "missing_authorization",
            DenialReason::MalformedHeader => "malformed_header",
            DenialReason::InvalidScheme => "invalid_scheme",
            DenialReason::InvalidToken => "invalid_token",
            DenialReason::NoOriginExternalIp => "no_origin_external_ip",
            DenialReason::DomainNotAllowed => "domain_not_allowed",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A denial: internal reason plus the exact public message.
///
/// Only the constructors below can build one, so every public message comes
/// from a fixed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    reason: DenialReason,
    message: String,
}

impl Denial {
    fn fixed(reason: DenialReason, message: &str) -> Self {
        Self {
            reason,
            message: message.to_string(),
        }
    }

    pub fn missing_authorization() -> Self {
        Self::fixed(DenialReason::MissingAuthorization, MISSING_AUTHORIZATION_MESSAGE)
    }

    pub fn malformed_header() -> Self {
        Self::fixed(DenialReason::MalformedHeader, MALFORMED_HEADER_MESSAGE)
    }

    pub fn invalid_scheme() -> Self {
        Self::fixed(DenialReason::InvalidScheme, INVALID_SCHEME_MESSAGE)
    }

    pub fn invalid_token() -> Self {
        Self::fixed(DenialReason::InvalidToken, INVALID_TOKEN_MESSAGE)
    }

    pub fn no_origin_external_ip() -> Self {
        Self::fixed(DenialReason::NoOriginExternalIp, NO_ORIGIN_EXTERNAL_IP_MESSAGE)
    }

    /// Denial naming the declared domain. Used for both whitelist misses and
    /// spoofed local origins, which must be indistinguishable to the caller.
    pub fn domain_not_allowed(domain: &str) -> Self {
        Self {
            reason: DenialReason::DomainNotAllowed,
            message: format!("{DOMAIN_NOT_ALLOWED_PREFIX}{domain}"),
        }
    }

    pub fn reason(&self) -> DenialReason {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> StatusCode {
        self.reason.status_code()
    }
}

/// Outcome of a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The denial reason, if any.
    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(denial) => Some(denial.reason()),
        }
    }
}

/// JSON body returned for every denial.
#[derive(Debug, Serialize, ToSchema)]
pub struct DenialBody {
    /// Always `false`.
    pub success: bool,
    /// Short error code.
    pub error: String,
    /// Human readable explanation.
    pub message: String,
    /// ISO-8601 UTC time of the response.
    pub timestamp: String,
}

/// Current time in the `2026-01-01T00:00:00.000Z` form.
pub fn response_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(DenialBody {
            success: false,
            error: self.reason.error_code().to_string(),
            message: self.message,
            timestamp: response_timestamp(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    const ALL_REASONS: [DenialReason; 6] = [
        DenialReason::MissingAuthorization,
        DenialReason::MalformedHeader,
        DenialReason::InvalidScheme,
        DenialReason::InvalidToken,
        DenialReason::NoOriginExternalIp,
        DenialReason::DomainNotAllowed,
    ];

    #[tokio::test]
    async fn invalid_token_renders_401_envelope() {
        let response = Denial::invalid_token().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid token");
        assert_eq!(
            body["message"],
            "Invalid Bearer token. Please check your authentication credentials."
        );
        let ts = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(ts.ends_with('Z'));
    }

    #[tokio::test]
    async fn domain_denial_renders_403() {
        let response = Denial::domain_not_allowed("attacker.com").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Domain not allowed");
        assert_eq!(body["message"], "Access denied for domain: attacker.com");
    }

    #[test]
    fn status_codes_split_by_gate() {
        for reason in ALL_REASONS {
            let expected = match reason {
                DenialReason::NoOriginExternalIp | DenialReason::DomainNotAllowed => {
                    StatusCode::FORBIDDEN
                }
                _ => StatusCode::UNAUTHORIZED,
            };
            assert_eq!(reason.status_code(), expected);
        }
    }

    #[test]
    fn public_text_never_contains_internal_names() {
        let denials = [
            Denial::missing_authorization(),
            Denial::malformed_header(),
            Denial::invalid_scheme(),
            Denial::invalid_token(),
            Denial::no_origin_external_ip(),
            Denial::domain_not_allowed("example.org"),
        ];
        for denial in denials {
            for reason in ALL_REASONS {
                assert!(!denial.message().contains(reason.as_str()));
                assert!(!denial.message().contains(&format!("{reason:?}")));
                assert!(!reason.error_code().contains(reason.as_str()));
            }
        }
    }
}
