// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant settings cache.
//!
//! Settings are read on every inbound message, so each tenant's row is
//! cached for a fixed TTL. A write through [`HandoffService::update_settings`]
//! invalidates the local entry; other process instances keep serving their
//! cached copy until it expires, so readers may see settings up to one TTL
//! old. A tenant's keyword list is compiled once per load and cached with
//! the row.
//!
//! [`HandoffService::update_settings`]: crate::HandoffService::update_settings

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use switchboard_core::{Clock, HandoffSettings, StorageAdapter, SwitchboardError};

use crate::trigger::KeywordMatcher;

/// A tenant's settings row together with its compiled keyword list.
#[derive(Debug, Clone, Default)]
pub struct TenantSettings {
    /// `None` when the tenant never configured handoff.
    pub settings: Option<HandoffSettings>,
    /// `None` when the tenant has no keyword list of its own, or it failed
    /// to compile; callers fall back to the service defaults.
    pub keywords: Option<Arc<KeywordMatcher>>,
}

impl TenantSettings {
    fn compile(tenant_id: &str, settings: Option<HandoffSettings>) -> Self {
        let keywords = settings
            .as_ref()
            .filter(|s| !s.keywords.is_empty())
            .and_then(|s| match KeywordMatcher::new(&s.keywords) {
                Ok(matcher) => Some(Arc::new(matcher)),
                Err(e) => {
                    warn!(tenant_id, error = %e, "tenant keywords invalid, using defaults");
                    None
                }
            });
        Self { settings, keywords }
    }
}

#[derive(Debug, Clone)]
struct CachedSettings {
    tenant: TenantSettings,
    fetched_at: DateTime<Utc>,
}

/// TTL cache of [`HandoffSettings`] keyed by tenant.
pub struct SettingsCache {
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, CachedSettings>,
}

impl SettingsCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            ttl,
            clock,
            entries: DashMap::new(),
        }
    }

    /// Cached settings for `tenant_id`, loading from storage when missing or expired.
    pub async fn get(
        &self,
        storage: &dyn StorageAdapter,
        tenant_id: &str,
    ) -> Result<Option<HandoffSettings>, SwitchboardError> {
        Ok(self.get_tenant(storage, tenant_id).await?.settings)
    }

    /// Like [`get`](Self::get), with the tenant's compiled keywords.
    pub async fn get_tenant(
        &self,
        storage: &dyn StorageAdapter,
        tenant_id: &str,
    ) -> Result<TenantSettings, SwitchboardError> {
        let now = self.clock.now();
        if let Some(entry) = self.fresh_entry(tenant_id, now) {
            debug!(tenant_id, "settings cache hit");
            return Ok(entry.tenant);
        }

        let settings = storage.get_settings(tenant_id).await?;
        debug!(tenant_id, found = settings.is_some(), "settings loaded");
        let tenant = TenantSettings::compile(tenant_id, settings);
        self.entries.insert(
            tenant_id.to_string(),
            CachedSettings {
                tenant: tenant.clone(),
                fetched_at: now,
            },
        );
        Ok(tenant)
    }

    fn fresh_entry(&self, tenant_id: &str, now: DateTime<Utc>) -> Option<CachedSettings> {
        let entry = self.entries.get(tenant_id)?;
        if now.signed_duration_since(entry.fetched_at) < self.ttl {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    /// Drop one tenant's entry so the next read goes to storage.
    pub fn invalidate(&self, tenant_id: &str) {
        self.entries.remove(tenant_id);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_test_utils::fixtures::{disabled_settings, enabled_settings, monday_at};
    use switchboard_test_utils::{ManualClock, MemoryStorage};

    fn cache(clock: &ManualClock) -> SettingsCache {
        SettingsCache::new(Duration::from_secs(60), Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn serves_cached_copy_within_ttl() {
        let clock = ManualClock::new(monday_at(10, 0, 0));
        let storage = MemoryStorage::new();
        storage.put_settings(&enabled_settings("t1")).await.unwrap();
        let cache = cache(&clock);

        assert!(cache.get(&storage, "t1").await.unwrap().unwrap().enabled);

        storage.put_settings(&disabled_settings("t1")).await.unwrap();
        clock.advance(chrono::Duration::seconds(59));
        assert!(cache.get(&storage, "t1").await.unwrap().unwrap().enabled);

        clock.advance(chrono::Duration::seconds(1));
        assert!(!cache.get(&storage, "t1").await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn absence_is_cached_too() {
        let clock = ManualClock::new(monday_at(10, 0, 0));
        let storage = MemoryStorage::new();
        let cache = cache(&clock);

        assert!(cache.get(&storage, "t1").await.unwrap().is_none());
        storage.put_settings(&enabled_settings("t1")).await.unwrap();
        assert!(cache.get(&storage, "t1").await.unwrap().is_none());

        cache.invalidate("t1");
        assert!(cache.get(&storage, "t1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalidate_all_clears_every_tenant() {
        let clock = ManualClock::new(monday_at(10, 0, 0));
        let storage = MemoryStorage::new();
        let cache = cache(&clock);
        cache.get(&storage, "t1").await.unwrap();
        cache.get(&storage, "t2").await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn keyword_matcher_is_compiled_once_per_load() {
        let clock = ManualClock::new(monday_at(10, 0, 0));
        let storage = MemoryStorage::new();
        let mut settings = enabled_settings("t1");
        settings.keywords = vec!["supervisor".to_string()];
        storage.put_settings(&settings).await.unwrap();
        let cache = cache(&clock);

        let first = cache.get_tenant(&storage, "t1").await.unwrap();
        let second = cache.get_tenant(&storage, "t1").await.unwrap();
        let (a, b) = (first.keywords.unwrap(), second.keywords.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.find("get me a Supervisor"), Some("supervisor"));

        cache.invalidate("t1");
        let reloaded = cache.get_tenant(&storage, "t1").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &reloaded.keywords.unwrap()));
    }

    #[tokio::test]
    async fn empty_keyword_list_leaves_matcher_unset() {
        let clock = ManualClock::new(monday_at(10, 0, 0));
        let storage = MemoryStorage::new();
        let mut settings = enabled_settings("t1");
        settings.keywords.clear();
        storage.put_settings(&settings).await.unwrap();
        let cache = cache(&clock);

        let tenant = cache.get_tenant(&storage, "t1").await.unwrap();
        assert!(tenant.settings.is_some());
        assert!(tenant.keywords.is_none());
        assert!(cache.get_tenant(&storage, "t2").await.unwrap().keywords.is_none());
    }

    #[tokio::test]
    async fn storage_errors_are_not_cached() {
        let clock = ManualClock::new(monday_at(10, 0, 0));
        let storage = MemoryStorage::new();
        let cache = cache(&clock);
        storage.fail_operation("get_settings").await;
        assert!(cache.get(&storage, "t1").await.is_err());
        assert!(cache.is_empty());

        storage.clear_failures().await;
        assert!(cache.get(&storage, "t1").await.unwrap().is_none());
    }
}
