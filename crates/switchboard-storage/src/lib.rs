// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Switchboard handoff service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for
//! conversations, messages, agent availability and tenant settings.
//!
//! Every multi-step flow in the handoff core is built from the point reads
//! and single-row conditional updates exposed here. All writes go through
//! the one `tokio-rusqlite` background thread owned by [`Database`].

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
