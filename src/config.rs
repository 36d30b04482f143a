// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup and is immutable afterwards; the gates receive it by value
//! at construction time.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `API_TOKENS` | Comma-separated accepted bearer credentials | Required |
//! | `ALLOWED_DOMAINS` | Comma-separated domains allowed as declared origin | empty |
//! | `TRUST_PROXY` | Use `X-Forwarded-For` / `X-Real-IP` for classification | `false` |
//! | `SECURITY_LOGGING` | Emit security events for denials | `true` |
//! | `SECURITY_LOG_FILE` | Append security events as JSONL to this file | unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` | PEM certificate chain (enables HTTPS with `TLS_KEY_PATH`) | unset |
//! | `TLS_KEY_PATH` | PEM private key | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::auth::CredentialSet;

/// Accepted bearer credentials, comma separated.
pub const API_TOKENS_ENV: &str = "API_TOKENS";

/// Allowed declared-origin domains, comma separated.
pub const ALLOWED_DOMAINS_ENV: &str = "ALLOWED_DOMAINS";

/// Whether forwarded-for headers are trusted for client classification.
///
/// Only enable this when the service is reachable exclusively through a
/// reverse proxy that overwrites `X-Forwarded-For`.
pub const TRUST_PROXY_ENV: &str = "TRUST_PROXY";

/// Whether denials emit security events.
pub const SECURITY_LOGGING_ENV: &str = "SECURITY_LOGGING";

/// Optional JSONL file receiving security events.
pub const SECURITY_LOG_FILE_ENV: &str = "SECURITY_LOG_FILE";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Logging format selector (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration errors detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API_TOKENS is not set")]
    MissingTokens,

    #[error("API_TOKENS contains no usable tokens")]
    EmptyTokens,

    #[error("{name} must be a boolean, got {value:?}")]
    InvalidBool { name: &'static str, value: String },

    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

/// Immutable configuration consumed by the two request gates.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub credentials: CredentialSet,
    /// Lower-cased, non-empty domains.
    pub allowed_domains: Vec<String>,
    pub trust_proxy: bool,
    pub security_logging: bool,
}

impl GateConfig {
    /// Load gate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load gate configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_tokens = lookup(API_TOKENS_ENV).ok_or(ConfigError::MissingTokens)?;
        let credentials = CredentialSet::new(split_list(&raw_tokens));
        if credentials.is_empty() {
            return Err(ConfigError::EmptyTokens);
        }

        let allowed_domains = lookup(ALLOWED_DOMAINS_ENV)
            .map(|raw| {
                split_list(&raw)
                    .into_iter()
                    .map(|d| d.to_ascii_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            credentials,
            allowed_domains,
            trust_proxy: read_bool(&lookup, TRUST_PROXY_ENV, false)?,
            security_logging: read_bool(&lookup, SECURITY_LOGGING_ENV, true)?,
        })
    }
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// TLS material locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Process-level settings that do not influence gate decisions.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
    pub security_log_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        // IPv6 hosts may be given bare (`::`) or bracketed (`[::]`).
        let literal = host.trim();
        let literal = literal
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(literal);
        let ip: IpAddr = literal
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(host.clone()))?;
        let bind_addr = SocketAddr::new(ip, port);

        let tls = match (
            non_empty(lookup(TLS_CERT_PATH_ENV)),
            non_empty(lookup(TLS_KEY_PATH_ENV)),
        ) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            tls,
            log_format,
            security_log_file: non_empty(lookup(SECURITY_LOG_FILE_ENV)).map(PathBuf::from),
        })
    }
}

/// Split a comma-separated value, trimming entries and dropping empty ones.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_bool<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { name, value: raw }),
    }
}
