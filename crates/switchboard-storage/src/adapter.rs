// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use switchboard_config::model::StorageConfig;
use switchboard_core::types::{
    AgentAvailability, ChatMessage, Conversation, ConversationStatus, HandoffSettings, Presence,
};
use switchboard_core::{
    AdapterType, AgentTransition, HealthStatus, PluginAdapter, StorageAdapter, SwitchboardError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, SwitchboardError> {
        self.db.get().ok_or_else(|| SwitchboardError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SwitchboardError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SwitchboardError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SwitchboardError> {
        self.db()?.checkpoint().await
    }

    // --- Conversations ---

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), SwitchboardError> {
        queries::conversations::insert_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn find_active_conversation(
        &self,
        tenant_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::find_active_conversation(self.db()?, tenant_id, visitor_id).await
    }

    async fn update_conversation_if(
        &self,
        conversation: &Conversation,
        expected: ConversationStatus,
    ) -> Result<bool, SwitchboardError> {
        queries::conversations::update_conversation_if(self.db()?, conversation, expected).await
    }

    async fn update_conversation_if_idle(
        &self,
        conversation: &Conversation,
        expected: ConversationStatus,
        observed_last_seen_at: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        queries::conversations::update_conversation_if_idle(
            self.db()?,
            conversation,
            expected,
            observed_last_seen_at,
        )
        .await
    }

    async fn update_customer_presence(
        &self,
        conversation_id: &str,
        presence: Presence,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<bool, SwitchboardError> {
        queries::conversations::update_customer_presence(
            self.db()?,
            conversation_id,
            presence,
            last_seen_at,
        )
        .await
    }

    async fn list_waiting(&self, tenant_id: &str) -> Result<Vec<Conversation>, SwitchboardError> {
        queries::conversations::list_waiting(self.db()?, tenant_id).await
    }

    async fn count_waiting(&self, tenant_id: &str) -> Result<u32, SwitchboardError> {
        queries::conversations::count_waiting(self.db()?, tenant_id).await
    }

    async fn count_waiting_before(
        &self,
        tenant_id: &str,
        before: DateTime<Utc>,
    ) -> Result<u32, SwitchboardError> {
        queries::conversations::count_waiting_before(self.db()?, tenant_id, before).await
    }

    async fn list_stale_conversations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        queries::conversations::list_stale_conversations(self.db()?, cutoff).await
    }

    // --- Messages ---

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), SwitchboardError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessage>, SwitchboardError> {
        queries::messages::list_messages(self.db()?, conversation_id, limit).await
    }

    // --- Agents ---

    async fn get_agent(
        &self,
        tenant_id: &str,
        agent_id: &str,
    ) -> Result<Option<AgentAvailability>, SwitchboardError> {
        queries::agents::get_agent(self.db()?, tenant_id, agent_id).await
    }

    async fn insert_agent(&self, agent: &AgentAvailability) -> Result<bool, SwitchboardError> {
        queries::agents::insert_agent(self.db()?, agent).await
    }

    async fn touch_agent(
        &self,
        tenant_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        queries::agents::touch_agent(self.db()?, tenant_id, agent_id, now).await
    }

    async fn set_agent_status(
        &self,
        tenant_id: &str,
        agent_id: &str,
        status: Presence,
        now: DateTime<Utc>,
        reset_chat_count: bool,
    ) -> Result<bool, SwitchboardError> {
        queries::agents::set_agent_status(
            self.db()?,
            tenant_id,
            agent_id,
            status,
            now,
            reset_chat_count,
        )
        .await
    }

    async fn transition_agent_if(
        &self,
        transition: &AgentTransition,
    ) -> Result<bool, SwitchboardError> {
        queries::agents::transition_agent_if(self.db()?, transition).await
    }

    async fn list_online_agents(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<AgentAvailability>, SwitchboardError> {
        queries::agents::list_online_agents(self.db()?, tenant_id).await
    }

    async fn list_present_agents(&self) -> Result<Vec<AgentAvailability>, SwitchboardError> {
        queries::agents::list_present_agents(self.db()?).await
    }

    async fn try_claim_slot(
        &self,
        tenant_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        queries::agents::try_claim_slot(self.db()?, tenant_id, agent_id, now).await
    }

    async fn release_slot(&self, tenant_id: &str, agent_id: &str) -> Result<(), SwitchboardError> {
        queries::agents::release_slot(self.db()?, tenant_id, agent_id).await
    }

    // --- Settings ---

    async fn get_settings(
        &self,
        tenant_id: &str,
    ) -> Result<Option<HandoffSettings>, SwitchboardError> {
        queries::settings::get_settings(self.db()?, tenant_id).await
    }

    async fn put_settings(&self, settings: &HandoffSettings) -> Result<(), SwitchboardError> {
        queries::settings::put_settings(self.db()?, settings).await
    }
}
