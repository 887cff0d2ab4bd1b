// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound HTTP boundary for the Gatepass sync service.
//!
//! Webhook delivery and `/health` are public. Everything else under `/v1`
//! requires the configured bearer token and delegates to the services in
//! `gatepass-sync`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{GatewayState, ServerConfig, build_router, start_server};
