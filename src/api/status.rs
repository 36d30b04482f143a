// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway status, visible only to authenticated callers.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::error::response_timestamp;
use crate::auth::DenialBody;
use crate::state::AppState;

/// Gateway status response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
    /// Crate version.
    pub version: String,
    /// Seconds since the gates were built.
    pub uptime_seconds: u64,
    /// Whether forwarded-for headers are used for classification.
    pub trust_proxy: bool,
    /// Number of allowed declared-origin domains.
    pub allowed_domains: usize,
    /// Number of accepted credentials.
    pub credentials: usize,
    /// Current timestamp.
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = "Gateway",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Gateway status", body = StatusResponse),
        (status = 401, description = "Missing or invalid credential", body = DenialBody),
        (status = 403, description = "Untrusted network origin", body = DenialBody)
    )
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        trust_proxy: state.trust_proxy,
        allowed_domains: state.origin_gate.allowed_domains().len(),
        credentials: state.credential_gate.credential_count(),
        timestamp: response_timestamp(),
    })
}
