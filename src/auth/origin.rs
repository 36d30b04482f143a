// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network-origin gate.
//!
//! Trust is rooted in network position, corroborated by the declared origin:
//!
//! | Client   | Declared origin          | Outcome                         |
//! |----------|--------------------------|---------------------------------|
//! | loopback | none                     | allow                           |
//! | remote   | none                     | deny, no origin                 |
//! | loopback | localhost / loopback IP  | allow                           |
//! | remote   | localhost / loopback IP  | deny, spoofing attempt recorded |
//! | any      | whitelisted domain       | allow                           |
//! | any      | anything else            | deny, domain not allowed        |
//!
//! The local-name check runs before the whitelist, so a spoofed local origin
//! is denied even if `localhost` appears in the allowed domains.

use axum::http::header::{ORIGIN, REFERER, USER_AGENT};
use url::Url;

use super::request::{is_loopback, parse_ip_literal};
use super::{ClientEndpoint, Decision, Denial, RequestView};
use crate::audit::{SecurityEvent, SecurityEventKind, SecurityLog};

/// Caller-declared origin, from `Origin` or else `Referer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredOrigin {
    /// Neither header present (or both empty).
    Absent,
    /// An http(s) URL with a host.
    Host { raw: String, host: String },
    /// Present but not an http(s) URL with a host.
    Malformed { raw: String },
}

impl DeclaredOrigin {
    /// Read the declared origin of a request.
    pub fn from_request(request: &RequestView<'_>) -> Self {
        let raw = [ORIGIN, REFERER].into_iter().find_map(|name| {
            request
                .header(name)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string())
                .filter(|v| !v.is_empty())
        });

        match raw {
            None => DeclaredOrigin::Absent,
            Some(raw) => match origin_host(&raw) {
                Some(host) => DeclaredOrigin::Host { raw, host },
                None => DeclaredOrigin::Malformed { raw },
            },
        }
    }
}

/// Lower-cased hostname of an absolute http(s) URL. Scheme, port and path
/// are discarded.
pub fn origin_host(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_ascii_lowercase())
}

/// `localhost` or a loopback literal (bracketed IPv6 accepted).
pub fn is_local_name(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || parse_ip_literal(host).is_some_and(|ip| is_loopback(&ip))
}

/// Exact match, or a subdomain on a `.` boundary.
pub fn domain_allowed(host: &str, allowed_domains: &[String]) -> bool {
    let host = host.to_ascii_lowercase();
    allowed_domains.iter().any(|domain| {
        let domain = domain.to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    })
}

/// Decides whether the request's network origin is trusted.
#[derive(Debug, Clone)]
pub struct OriginGate {
    allowed_domains: Vec<String>,
    log: SecurityLog,
}

impl OriginGate {
    pub fn new(allowed_domains: Vec<String>, log: SecurityLog) -> Self {
        Self {
            allowed_domains,
            log,
        }
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    pub fn check_origin(&self, request: &RequestView<'_>) -> Decision {
        let client = request.client_endpoint();

        match DeclaredOrigin::from_request(request) {
            DeclaredOrigin::Absent => {
                if client.is_loopback() {
                    return Decision::Allow;
                }
                self.record(request, &client, SecurityEventKind::ExternalAccessDenied, None, |e| {
                    e.with_detail("reason", "no_origin")
                });
                Decision::Deny(Denial::no_origin_external_ip())
            }

            DeclaredOrigin::Malformed { raw } => {
                if is_local_name(&raw) && !client.is_loopback() {
                    self.record_spoof(request, &client, &raw, &raw);
                } else {
                    self.record(
                        request,
                        &client,
                        SecurityEventKind::ExternalAccessDenied,
                        Some(&raw),
                        |e| e.with_detail("reason", "malformed_origin"),
                    );
                }
                Decision::Deny(Denial::domain_not_allowed(&raw))
            }

            DeclaredOrigin::Host { raw, host } => {
                if is_local_name(&host) {
                    if client.is_loopback() {
                        return Decision::Allow;
                    }
                    self.record_spoof(request, &client, &raw, &host);
                    return Decision::Deny(Denial::domain_not_allowed(&host));
                }

                if domain_allowed(&host, &self.allowed_domains) {
                    return Decision::Allow;
                }

                self.record(
                    request,
                    &client,
                    SecurityEventKind::ExternalAccessDenied,
                    Some(&raw),
                    |e| {
                        e.with_detail("domain", host.as_str())
                            .with_detail("reason", "domain_not_allowed")
                    },
                );
                Decision::Deny(Denial::domain_not_allowed(&host))
            }
        }
    }

    fn record_spoof(
        &self,
        request: &RequestView<'_>,
        client: &ClientEndpoint,
        raw: &str,
        local_name: &str,
    ) {
        tracing::debug!(%client, origin = raw, "Local origin declared by non-loopback client");
        self.record(request, client, SecurityEventKind::SpoofingAttempt, Some(raw), |e| {
            let e = e.with_detail("matched_local_name", local_name);
            match request.forwarded_for().and_then(|v| v.to_str().ok()) {
                Some(chain) => e.with_detail("forwarded_for", chain),
                None => e,
            }
        });
    }

    fn record<F>(
        &self,
        request: &RequestView<'_>,
        client: &ClientEndpoint,
        kind: SecurityEventKind,
        origin: Option<&str>,
        extra: F,
    ) where
        F: FnOnce(SecurityEvent) -> SecurityEvent,
    {
        self.log.record_with(|| {
            let event = SecurityEvent::new(kind, client)
                .with_origin(origin)
                .with_user_agent(request.header_str(USER_AGENT))
                .with_detail("method", request.method().as_str())
                .with_detail("path", request.path());
            extra(event)
        });
    }
}
