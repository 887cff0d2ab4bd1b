// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the sync core and its collaborators.
//!
//! Traits use `#[async_trait]` so they can be held as `Arc<dyn ...>`.

pub mod store;

pub use store::SyncStore;
