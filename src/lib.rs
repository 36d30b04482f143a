// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tradegate - access control in front of the trading API proxy
//!
//! Every request reaching the bot's REST proxy passes two gates before any
//! trading route runs: a bearer-credential check and a network-origin check.
//! Denials are recorded as security events.
//!
//! ## Modules
//!
//! - `api` - HTTP router, health and status handlers (Axum)
//! - `audit` - Security events and their sinks
//! - `auth` - Credential gate, network-origin gate and their middlewares
//! - `config` - Startup configuration from the environment

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
