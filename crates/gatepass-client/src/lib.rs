// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for HikCentral-style access-control systems.
//!
//! [`DeviceClient`] queues every request on a single dispatcher task that
//! enforces the profile's rate limit, retries transient failures with
//! exponential backoff, and authenticates with either an HMAC request
//! signature or RFC 2617 Digest.

pub mod auth;
pub mod transport;

pub use auth::{DigestAuth, DigestChallenge, HmacSigner};
pub use transport::{AuthScheme, ClientSettings, DeviceClient, DeviceResponse};
