// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{credential_gate_middleware, origin_gate_middleware, DenialBody},
    error::ApiError,
    state::AppState,
};

pub mod health;
pub mod status;

/// Router with the built-in routes only.
pub fn router(state: AppState) -> Router {
    router_with(state, Router::new())
}

/// Mount `routes` behind both gates.
///
/// The credential gate runs first, then the origin gate, then the route.
/// `/api/health*` is exempt from both.
pub fn router_with(state: AppState, routes: Router<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/health/live", get(health::liveness))
        .route("/api/health/ready", get(health::readiness))
        .route("/api/status", get(status::status))
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), origin_gate_middleware))
        .layer(from_fn_with_state(state.clone(), credential_gate_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        status::status
    ),
    components(
        schemas(
            DenialBody,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            status::StatusResponse
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Health", description = "Liveness and readiness probes (no authentication)"),
        (name = "Gateway", description = "Gateway introspection")
    )
)]
struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{testing::RecordingSink, SecurityEventKind};
    use crate::auth::CredentialSet;
    use crate::config::GateConfig;
    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{Request, StatusCode},
        response::Response,
    };
    use std::{net::SocketAddr, sync::Arc};
    use tower::ServiceExt;

    const TOKEN: &str = "tg_live_7f3a9c";
    const LOOPBACK: ([u8; 4], u16) = ([127, 0, 0, 1], 51000);
    const REMOTE: ([u8; 4], u16) = ([203, 0, 113, 7], 51000);

    fn test_app(sink: Arc<RecordingSink>) -> Router {
        let config = GateConfig {
            credentials: CredentialSet::new([TOKEN, "tg_backup_token"]),
            allowed_domains: vec!["example.com".to_string()],
            trust_proxy: false,
            security_logging: true,
        };
        let state = AppState::new(config, sink);
        let trades = Router::new().route("/api/trades", get(|| async { "[]" }));
        router_with(state, trades)
    }

    fn request(path: &str, from: ([u8; 4], u16), headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(from)));
        request
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = test_app(Arc::new(RecordingSink::default()));
        let _ = app.into_make_service_with_connect_info::<SocketAddr>();
    }

    #[tokio::test]
    async fn loopback_request_without_origin_needs_only_a_token() {
        let app = test_app(Arc::new(RecordingSink::default()));
        let auth = format!("Bearer {TOKEN}");
        let response = app
            .oneshot(request("/api/trades", LOOPBACK, &[("authorization", &auth)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn loopback_request_without_credential_is_rejected() {
        let app = test_app(Arc::new(RecordingSink::default()));
        let response = app
            .oneshot(request("/api/trades", LOOPBACK, &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing authorization");
    }

    #[tokio::test]
    async fn wrong_token_gets_401_envelope() {
        for from in [LOOPBACK, REMOTE] {
            let sink = Arc::new(RecordingSink::default());
            let app = test_app(sink.clone());
            let response = app
                .oneshot(request(
                    "/api/trades",
                    from,
                    &[("authorization", "Bearer wrong")],
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()["content-type"], "application/json");

            let body = json_body(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Invalid token");
            assert_eq!(
                body["message"],
                "Invalid Bearer token. Please check your authentication credentials."
            );
            assert!(body["timestamp"].is_string());

            // The origin gate never ran.
            let events = sink.events();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, SecurityEventKind::AuthFailure);
        }
    }

    #[tokio::test]
    async fn valid_token_from_foreign_origin_gets_403() {
        let sink = Arc::new(RecordingSink::default());
        let app = test_app(sink.clone());
        let auth = format!("Bearer {TOKEN}");
        let response = app
            .oneshot(request(
                "/api/trades",
                REMOTE,
                &[("authorization", &auth), ("origin", "http://attacker.com")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Domain not allowed");
        assert_eq!(body["message"], "Access denied for domain: attacker.com");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::ExternalAccessDenied);
    }

    #[tokio::test]
    async fn health_is_exempt_from_both_gates() {
        let sink = Arc::new(RecordingSink::default());
        for path in ["/api/health", "/api/health/live", "/api/health/ready"] {
            let app = test_app(sink.clone());
            let response = app.oneshot(request(path, REMOTE, &[])).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn remote_spoofing_localhost_gets_ordinary_denial() {
        let sink = Arc::new(RecordingSink::default());
        let app = test_app(sink.clone());
        let auth = format!("Bearer {TOKEN}");
        let response = app
            .oneshot(request(
                "/api/trades",
                REMOTE,
                &[("authorization", &auth), ("origin", "http://localhost:3000")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Domain not allowed");
        assert_eq!(body["message"], "Access denied for domain: localhost");
        assert_eq!(sink.events()[0].kind, SecurityEventKind::SpoofingAttempt);
    }

    #[tokio::test]
    async fn remote_without_origin_gets_403() {
        let app = test_app(Arc::new(RecordingSink::default()));
        let auth = format!("Bearer {TOKEN}");
        let response = app
            .oneshot(request("/api/status", REMOTE, &[("authorization", &auth)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Access denied");
        assert_eq!(
            body["message"],
            "Access denied - no origin header and not from localhost"
        );
    }

    #[tokio::test]
    async fn whitelisted_subdomain_reaches_status() {
        let app = test_app(Arc::new(RecordingSink::default()));
        let auth = format!("Bearer {TOKEN}");
        let response = app
            .oneshot(request(
                "/api/status",
                REMOTE,
                &[("authorization", &auth), ("origin", "https://app.example.com")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["credentials"], 2);
        assert_eq!(body["allowed_domains"], 1);
        assert_eq!(body["trust_proxy"], false);
    }

    #[tokio::test]
    async fn unknown_route_is_gated_then_404() {
        let app = test_app(Arc::new(RecordingSink::default()));
        let response = app
            .clone()
            .oneshot(request("/api/nope", REMOTE, &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let auth = format!("Bearer {TOKEN}");
        let response = app
            .oneshot(request("/api/nope", LOOPBACK, &[("authorization", &auth)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn openapi_document_lists_gateway_routes() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["paths"]["/api/health"].is_object());
        assert!(json["paths"]["/api/status"].is_object());
        assert!(json["components"]["securitySchemes"]["bearer"].is_object());
    }
}
