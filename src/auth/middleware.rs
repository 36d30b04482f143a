// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum middleware adapters for the two gates.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/api/trades", get(list_trades))
//!     .layer(from_fn_with_state(state.clone(), origin_gate_middleware))
//!     .layer(from_fn_with_state(state.clone(), credential_gate_middleware))
//!     .with_state(state);
//! ```
//!
//! Layers added last run first, so the credential gate short-circuits before
//! any origin classification happens.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{is_exempt_path, Decision, RequestView};
use crate::state::AppState;

/// Build the gate view of an axum request.
///
/// The transport address comes from `ConnectInfo`; without it the caller
/// classifies as remote.
pub fn request_view(request: &Request, trust_proxy: bool) -> RequestView<'_> {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    RequestView::new(
        request.method(),
        request.uri().path(),
        request.headers(),
        remote,
        trust_proxy,
    )
}

/// Rejects requests without an accepted bearer credential.
pub async fn credential_gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let decision = {
        let view = request_view(&request, state.trust_proxy);
        state.credential_gate.authenticate(&view)
    };

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Deny(denial) => denial.into_response(),
    }
}

/// Rejects requests from untrusted network origins. Health paths pass.
pub async fn origin_gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt_path(request.uri().path()) {
        return next.run(request).await;
    }

    let decision = {
        let view = request_view(&request, state.trust_proxy);
        state.origin_gate.check_origin(&view)
    };

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Deny(denial) => denial.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Method;

    #[test]
    fn view_uses_connect_info() {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/orders?symbol=BTCUSDT")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

        let view = request_view(&request, false);
        assert_eq!(view.method(), Method::POST);
        assert_eq!(view.path(), "/api/orders");
        assert_eq!(view.remote_addr(), Some("127.0.0.1".parse().unwrap()));
        assert!(view.client_endpoint().is_loopback());
    }

    #[test]
    fn view_without_connect_info_is_remote() {
        let request = Request::builder().uri("/api/orders").body(Body::empty()).unwrap();
        let view = request_view(&request, true);
        assert!(view.remote_addr().is_none());
        assert!(view.trust_proxy());
        assert!(!view.client_endpoint().is_loopback());
    }
}
