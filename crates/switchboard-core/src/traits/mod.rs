// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Port traits for the collaborators the handoff core depends on.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod clock;
pub mod notification;
pub mod storage;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use notification::NotificationAdapter;
pub use storage::StorageAdapter;
