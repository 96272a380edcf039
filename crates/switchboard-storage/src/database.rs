// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use switchboard_core::SwitchboardError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SwitchboardError {
    SwitchboardError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single SQLite connection used by the storage adapter.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL enabled and run migrations.
    pub async fn open(path: &str) -> Result<Self, SwitchboardError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, SwitchboardError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(SwitchboardError::storage)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SwitchboardError::Storage {
                source: Box::new(e),
            })?;

        let db = Self { conn };
        db.configure(wal_mode).await?;
        db.migrate().await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    async fn configure(&self, wal_mode: bool) -> Result<(), SwitchboardError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    let _mode: String =
                        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                            row.get(0)
                        })?;
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn migrate(&self) -> Result<(), SwitchboardError> {
        self.conn
            .call(|conn| run_migrations(conn))
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                _ => SwitchboardError::Internal(
                    "database connection closed while running migrations".to_string(),
                ),
            })?;
        debug!("migrations applied");
        Ok(())
    }

    /// The underlying connection; all query modules go through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), SwitchboardError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
