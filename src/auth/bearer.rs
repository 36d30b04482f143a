// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential gate: bearer token authentication.

use axum::http::header::{AUTHORIZATION, USER_AGENT};

use super::{CredentialSet, Decision, Denial, DenialReason, RequestView};
use crate::audit::{SecurityEvent, SecurityEventKind, SecurityLog};

/// Requests under this prefix skip authentication entirely.
pub const EXEMPT_PATH_PREFIX: &str = "/api/health";

/// Whether `path` is exempt from the gates.
pub fn is_exempt_path(path: &str) -> bool {
    path.starts_with(EXEMPT_PATH_PREFIX)
}

/// Split an `Authorization` value into its bearer token.
///
/// Only the scheme comparison (case-insensitive) and whitespace trimming
/// normalize the input; the value is not URL-decoded.
pub fn parse_bearer(value: &str) -> Result<&str, DenialReason> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DenialReason::MissingAuthorization);
    }

    let Some((scheme, rest)) = value.split_once(char::is_whitespace) else {
        return Err(DenialReason::MalformedHeader);
    };
    let token = rest.trim();
    if token.is_empty() {
        return Err(DenialReason::MalformedHeader);
    }

    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(DenialReason::InvalidScheme);
    }

    Ok(token)
}

/// Validates the presented bearer credential against the accepted set.
#[derive(Debug, Clone)]
pub struct CredentialGate {
    credentials: CredentialSet,
    log: SecurityLog,
}

impl CredentialGate {
    pub fn new(credentials: CredentialSet, log: SecurityLog) -> Self {
        Self { credentials, log }
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    pub fn authenticate(&self, request: &RequestView<'_>) -> Decision {
        if is_exempt_path(request.path()) {
            return Decision::Allow;
        }

        let result = match request.header(AUTHORIZATION) {
            None => Err(DenialReason::MissingAuthorization),
            // Any UTF-8 is accepted so configured non-ASCII tokens can match.
            Some(value) => match std::str::from_utf8(value.as_bytes()) {
                Ok(text) => parse_bearer(text).and_then(|token| {
                    if self.credentials.contains(token) {
                        Ok(())
                    } else {
                        Err(DenialReason::InvalidToken)
                    }
                }),
                Err(_) => Err(DenialReason::MalformedHeader),
            },
        };

        match result {
            Ok(()) => Decision::Allow,
            Err(reason) => {
                self.record_failure(request, reason);
                Decision::Deny(denial_for(reason))
            }
        }
    }

    fn record_failure(&self, request: &RequestView<'_>, reason: DenialReason) {
        self.log.record_with(|| {
            let client = request.client_endpoint();
            tracing::debug!(
                %client,
                %reason,
                path = request.path(),
                "Credential gate denied request"
            );
            SecurityEvent::new(SecurityEventKind::AuthFailure, client)
                .with_user_agent(request.header_str(USER_AGENT))
                .with_detail("method", request.method().as_str())
                .with_detail("path", request.path())
                .with_detail("reason", reason.as_str())
        });
    }
}

fn denial_for(reason: DenialReason) -> Denial {
    match reason {
        DenialReason::MissingAuthorization => Denial::missing_authorization(),
        DenialReason::MalformedHeader => Denial::malformed_header(),
        DenialReason::InvalidScheme => Denial::invalid_scheme(),
        DenialReason::InvalidToken => Denial::invalid_token(),
        DenialReason::NoOriginExternalIp => Denial::no_origin_external_ip(),
        // Carries no domain, so it can only name an empty one.
        DenialReason::DomainNotAllowed => Denial::domain_not_allowed(""),
    }
}
