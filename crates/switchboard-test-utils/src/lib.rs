// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Switchboard integration tests.
//!
//! Provides in-memory adapters and fixtures for fast, deterministic,
//! CI-runnable tests without a database or a pub/sub transport.
//!
//! # Components
//!
//! - [`MemoryStorage`] - `StorageAdapter` over hash maps, with fault injection
//! - [`RecordingNotifier`] - captures every published notification
//! - [`FailingNotifier`] - rejects every publish
//! - [`ManualClock`] - a `Clock` tests move by hand
//! - [`fixtures`] - prebuilt settings, agents and timestamps

pub mod clock;
pub mod fixtures;
pub mod memory_storage;
pub mod notifier;

pub use clock::ManualClock;
pub use memory_storage::MemoryStorage;
pub use notifier::{FailingNotifier, RecordingNotifier};
