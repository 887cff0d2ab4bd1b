// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attendee synchronization with external access-control systems.
//!
//! - [`SyncService`] drives the per-attendee state machine and batch runs
//! - [`WebhookIngestor`] records and dispatches inbound events
//! - [`StatusService`] aggregates counts, recent activity and connectivity
//! - [`ProfileStore`] persists device profiles with encrypted credentials
//!
//! Each service receives its store and client explicitly, so several device
//! profiles can run side by side in one process.

pub mod mapper;
pub mod profiles;
pub mod scheduler;
pub mod service;
pub mod shutdown;
pub mod status;
pub mod webhook;

pub use mapper::{MappingSettings, PersonRecord, to_person_record};
pub use profiles::{ProfileStore, ProfileView};
pub use scheduler::{run_auto_sync, spawn_auto_sync};
pub use service::{AttendeeSyncStatus, BatchSyncResult, SyncOptions, SyncResult, SyncService};
pub use status::{BatchDetail, FailedAttendee, StatusService, SyncErrorReport, SyncOverview};
pub use webhook::{EventHandler, WebhookIngestor, WebhookReceipt};
