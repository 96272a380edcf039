// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Switchboard handoff service.

use thiserror::Error;

use crate::types::ConversationStatus;

/// The primary error type used across all Switchboard adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// Configuration errors (invalid TOML, malformed timezone, bad schedule window).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Notification transport errors (closed channel, transport failure).
    #[error("notification error on {channel}: {message}")]
    Notification { channel: String, message: String },

    /// A record referenced by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A conversation transition that the state machine does not permit.
    #[error("invalid conversation transition: {from} -> {to}")]
    InvalidTransition {
        from: ConversationStatus,
        to: ConversationStatus,
    },

    /// A conditional update lost a race against a concurrent writer.
    #[error("conflicting update: {0}")]
    Conflict(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchboardError {
    /// Wrap any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}
