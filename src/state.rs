// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Instant;

use crate::audit::{SecurityEventSink, SecurityLog};
use crate::auth::{CredentialGate, OriginGate};
use crate::config::GateConfig;

#[derive(Clone)]
pub struct AppState {
    pub credential_gate: Arc<CredentialGate>,
    pub origin_gate: Arc<OriginGate>,
    pub trust_proxy: bool,
    pub started_at: Instant,
}

impl AppState {
    /// Build both gates from startup configuration.
    pub fn new(config: GateConfig, sink: Arc<dyn SecurityEventSink>) -> Self {
        let log = SecurityLog::new(config.security_logging, sink);
        Self {
            credential_gate: Arc::new(CredentialGate::new(config.credentials, log.clone())),
            origin_gate: Arc::new(OriginGate::new(config.allowed_domains, log)),
            trust_proxy: config.trust_proxy,
            started_at: Instant::now(),
        }
    }
}
