// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access-Control Gate
//!
//! Two independent gates run ahead of every business route:
//!
//! 1. **Credential gate** ([`CredentialGate`]) - the request must carry
//!    `Authorization: Bearer <token>` with a token from the configured
//!    [`CredentialSet`]. Paths under `/api/health` are exempt.
//! 2. **Network-origin gate** ([`OriginGate`]) - the caller's network
//!    position (optionally through a trusted proxy chain) and its declared
//!    `Origin`/`Referer` must be consistent with a trusted context.
//!
//! Both gates are synchronous and stateless per call. Their only state is the
//! immutable configuration injected at construction. A denial is an ordinary
//! return value ([`Decision::Deny`]) rendered as a fixed JSON body.
//!
//! ## Security
//!
//! - Token comparison does not short-circuit on the first differing byte
//! - Tokens never appear in logs or security events
//! - Forwarded-for headers are ignored unless proxy trust is enabled
//! - A non-loopback caller declaring a local origin is denied and recorded as
//!   a spoofing attempt, with the same public response as any other
//!   domain denial

pub mod bearer;
pub mod credentials;
pub mod error;
pub mod middleware;
pub mod origin;
pub mod request;

pub use bearer::{is_exempt_path, parse_bearer, CredentialGate, EXEMPT_PATH_PREFIX};
pub use credentials::CredentialSet;
pub use error::{Decision, Denial, DenialBody, DenialReason};
pub use middleware::{credential_gate_middleware, origin_gate_middleware};
pub use origin::{DeclaredOrigin, OriginGate};
pub use request::{ClientClass, ClientEndpoint, RequestView};
