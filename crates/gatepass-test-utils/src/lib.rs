// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Gatepass integration tests.
//!
//! Provides a temp SQLite store, a scripted mock of the external
//! access-control system, and a harness wiring both to a device profile.
//!
//! # Components
//!
//! - [`TestHarness`] - temp database plus mock device and a matching profile
//! - [`MockDevice`] - wiremock server answering the person and status endpoints

pub mod device;
pub mod harness;

pub use device::MockDevice;
pub use harness::{TestHarness, TestHarnessBuilder};
