// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter wiring shared by every subcommand.

use std::sync::Arc;

use switchboard_bus::BroadcastNotifier;
use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{PluginAdapter, StorageAdapter, SwitchboardError, SystemClock};
use switchboard_handoff::{HandoffConfig, HandoffService};
use switchboard_storage::SqliteStorage;
use tracing::{info, warn};

/// The concrete adapters behind a [`HandoffService`].
pub struct App {
    pub storage: Arc<SqliteStorage>,
    pub notifier: Arc<BroadcastNotifier>,
    pub service: Arc<HandoffService>,
}

impl App {
    /// Open the database, run migrations and build the service.
    pub async fn open(config: &SwitchboardConfig) -> Result<Self, SwitchboardError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let notifier = Arc::new(BroadcastNotifier::new(
            config.notifications.channel_capacity,
        ));

        let service = HandoffService::new(
            storage.clone(),
            notifier.clone(),
            Arc::new(SystemClock),
            HandoffConfig::from_config(config),
        )?;

        info!(
            instance = %config.service.name,
            database = %config.storage.database_path,
            "switchboard ready"
        );

        Ok(Self {
            storage,
            notifier,
            service: Arc::new(service),
        })
    }

    /// Flush the database and drop notification channels.
    pub async fn close(&self) {
        if let Err(e) = self.storage.close().await {
            warn!(error = %e, "storage close failed");
        }
        if let Err(e) = self.notifier.shutdown().await {
            warn!(error = %e, "notifier shutdown failed");
        }
    }
}
