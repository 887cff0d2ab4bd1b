// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Gatepass access-control sync service.
//!
//! This crate provides the shared error type, the domain types persisted and
//! reported by the sync core, and the [`SyncStore`] trait every storage
//! backend implements.

pub mod error;
pub mod traits;
pub mod types;

pub use error::GatepassError;
pub use traits::SyncStore;
pub use types::{
    Attendee, AuthType, BatchCompletion, BatchStatus, BatchTrigger, ConnectionStatus, EndpointMap,
    LogStatus, NewAttendee, NewSyncLog, NewWebhookLog, StatusCount, StoredProfile, SyncBatch,
    SyncLog, SyncStatus, SyncType, WebhookLog, WebhookStatus,
};
