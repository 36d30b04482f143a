// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tradegate_server::{
    api::router,
    audit::{FanoutSink, JsonlFileSink, SecurityEventSink, TracingSink},
    config::{GateConfig, LogFormat, ServerConfig, DEFAULT_LOG_FILTER},
    state::AppState,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    let server_config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            // Logging is not up yet.
            eprintln!("invalid server configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(server_config.log_format);

    match run(server_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Server exited with error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run(server_config: ServerConfig) -> Result<(), BoxError> {
    let gate_config = GateConfig::from_env()?;

    tracing::info!(
        credentials = gate_config.credentials.len(),
        allowed_domains = ?gate_config.allowed_domains,
        trust_proxy = gate_config.trust_proxy,
        security_logging = gate_config.security_logging,
        "Gate configuration loaded"
    );

    let mut sink = FanoutSink::new().with(Arc::new(TracingSink));
    if let Some(path) = &server_config.security_log_file {
        let file_sink = JsonlFileSink::open(path)?;
        tracing::info!(path = %path.display(), "Appending security events to file");
        sink = sink.with(Arc::new(file_sink));
    }
    let sink: Arc<dyn SecurityEventSink> = Arc::new(sink);

    let app = router(AppState::new(gate_config, sink));
    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    let addr = server_config.bind_addr;

    match &server_config.tls {
        Some(paths) => {
            // The ring provider must be installed before any TLS config is built.
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                tracing::debug!("rustls crypto provider already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key).await?;
            tracing::info!(%addr, "Tradegate listening on https (docs at /docs)");
            tokio::select! {
                served = axum_server::bind_rustls(addr, tls_config).serve(service) => served?,
                () = shutdown_signal() => {}
            }
        }
        None => {
            tracing::info!(%addr, "Tradegate listening on http (docs at /docs)");
            tokio::select! {
                served = axum_server::bind(addr).serve(service) => served?,
                () = shutdown_signal() => {}
            }
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
