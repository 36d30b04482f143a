// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only view of an inbound request and client endpoint classification.

use std::net::{IpAddr, SocketAddr};

use axum::http::{header::AsHeaderName, HeaderMap, HeaderName, HeaderValue, Method};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Network position of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientClass {
    /// 127.0.0.0/8, `::1` or `::ffff:127.x.x.x`
    Loopback,
    /// Everything else, including unknown or unparseable addresses.
    Remote,
}

/// The address a request is attributed to, and its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientEndpoint {
    /// Address used for attribution. `None` when no transport address was
    /// observed.
    pub ip: Option<IpAddr>,
    pub class: ClientClass,
}

impl ClientEndpoint {
    fn from_ip(ip: IpAddr) -> Self {
        let class = if is_loopback(&ip) {
            ClientClass::Loopback
        } else {
            ClientClass::Remote
        };
        Self { ip: Some(ip), class }
    }

    /// Forced `Remote`, keeping `ip` only for attribution in logs.
    fn untrusted(ip: Option<IpAddr>) -> Self {
        Self {
            ip,
            class: ClientClass::Remote,
        }
    }

    pub fn is_loopback(&self) -> bool {
        self.class == ClientClass::Loopback
    }
}

impl std::fmt::Display for ClientEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ip {
            Some(ip) => write!(f, "{ip}"),
            None => f.write_str("unknown"),
        }
    }
}

/// Snapshot of the parts of a request the gates look at.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    method: &'a Method,
    path: &'a str,
    headers: &'a HeaderMap,
    remote_addr: Option<IpAddr>,
    trust_proxy: bool,
}

impl<'a> RequestView<'a> {
    pub fn new(
        method: &'a Method,
        path: &'a str,
        headers: &'a HeaderMap,
        remote_addr: Option<IpAddr>,
        trust_proxy: bool,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            remote_addr,
            trust_proxy,
        }
    }

    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn path(&self) -> &str {
        self.path
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy
    }

    /// Raw header value.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&'a HeaderValue> {
        self.headers.get(name)
    }

    /// Header value as text. Values that are not visible ASCII read as absent.
    pub fn header_str<K: AsHeaderName>(&self, name: K) -> Option<&'a str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Raw `X-Forwarded-For`, if present.
    pub fn forwarded_for(&self) -> Option<&'a HeaderValue> {
        self.header(&X_FORWARDED_FOR)
    }

    /// Raw `X-Real-IP`, if present.
    pub fn real_ip(&self) -> Option<&'a HeaderValue> {
        self.header(&X_REAL_IP)
    }

    /// Classify the caller.
    ///
    /// Without proxy trust only the transport address counts. With it, the
    /// first `X-Forwarded-For` entry (or `X-Real-IP` when there is no
    /// forwarded chain) replaces the transport address; a present but
    /// malformed value classifies as `Remote`.
    pub fn client_endpoint(&self) -> ClientEndpoint {
        let transport = || match self.remote_addr {
            Some(ip) => ClientEndpoint::from_ip(ip),
            None => ClientEndpoint::untrusted(None),
        };

        if !self.trust_proxy {
            return transport();
        }

        let forwarded = if let Some(value) = self.forwarded_for() {
            Some(value.to_str().ok().and_then(parse_forwarded_for))
        } else {
            self.real_ip()
                .map(|value| value.to_str().ok().and_then(|v| parse_ip_literal(v.trim())))
        };

        match forwarded {
            Some(Some(ip)) => ClientEndpoint::from_ip(ip),
            Some(None) => ClientEndpoint::untrusted(self.remote_addr),
            None => transport(),
        }
    }
}

/// Loopback test shared by client classification and origin matching.
pub fn is_loopback(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
    }
}

/// First entry of a forwarded-for chain, if it is a well-formed address.
pub fn parse_forwarded_for(raw: &str) -> Option<IpAddr> {
    let first = raw.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    parse_ip_literal(first)
}

/// Parse `1.2.3.4`, `::1`, `[::1]`, `1.2.3.4:5678` or `[::1]:5678`.
pub fn parse_ip_literal(raw: &str) -> Option<IpAddr> {
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    raw.strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .and_then(|inner| inner.parse::<IpAddr>().ok())
}
