// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Switchboard handoff service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Switchboard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to the production timeouts.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Customer and agent presence thresholds.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Abandoned conversation sweep.
    #[serde(default)]
    pub abandonment: AbandonmentConfig,

    /// Per-tenant handoff settings cache.
    #[serde(default)]
    pub settings_cache: SettingsCacheConfig,

    /// Service-wide handoff defaults used when a tenant has not configured one.
    #[serde(default)]
    pub handoff: HandoffDefaultsConfig,

    /// In-process notification fan-out.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Metrics export.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "switchboard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("switchboard").join("switchboard.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("switchboard.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Presence thresholds and agent sweep cadence.
///
/// Customer presence is derived from the age of the last customer activity;
/// agent presence decays from the age of the last heartbeat via periodic sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceConfig {
    /// Customer activity age at which presence becomes `away`.
    #[serde(default = "default_customer_away_secs")]
    pub customer_away_secs: u64,

    /// Customer activity age at which presence becomes `offline`.
    #[serde(default = "default_customer_offline_secs")]
    pub customer_offline_secs: u64,

    /// Heartbeat age at which an online agent is demoted to `away`.
    #[serde(default = "default_agent_away_secs")]
    pub agent_away_secs: u64,

    /// Heartbeat age at which any agent is demoted to `offline`.
    #[serde(default = "default_agent_offline_secs")]
    pub agent_offline_secs: u64,

    /// Interval between agent presence sweeps.
    #[serde(default = "default_agent_sweep_interval_secs")]
    pub agent_sweep_interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            customer_away_secs: default_customer_away_secs(),
            customer_offline_secs: default_customer_offline_secs(),
            agent_away_secs: default_agent_away_secs(),
            agent_offline_secs: default_agent_offline_secs(),
            agent_sweep_interval_secs: default_agent_sweep_interval_secs(),
        }
    }
}

fn default_customer_away_secs() -> u64 {
    120
}

fn default_customer_offline_secs() -> u64 {
    300
}

fn default_agent_away_secs() -> u64 {
    900 // 15 minutes
}

fn default_agent_offline_secs() -> u64 {
    1800 // 30 minutes
}

fn default_agent_sweep_interval_secs() -> u64 {
    300
}

/// Abandoned conversation sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AbandonmentConfig {
    /// Customer inactivity after which a non-terminal conversation is closed.
    #[serde(default = "default_abandonment_threshold_secs")]
    pub threshold_secs: u64,

    /// Interval between abandonment sweeps.
    #[serde(default = "default_abandonment_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// System message appended to force-closed conversations.
    #[serde(default = "default_abandonment_message")]
    pub system_message: String,
}

impl Default for AbandonmentConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_abandonment_threshold_secs(),
            sweep_interval_secs: default_abandonment_sweep_interval_secs(),
            system_message: default_abandonment_message(),
        }
    }
}

fn default_abandonment_threshold_secs() -> u64 {
    86_400 // 24 hours
}

fn default_abandonment_sweep_interval_secs() -> u64 {
    3600
}

fn default_abandonment_message() -> String {
    "This conversation was closed automatically after 24 hours of inactivity.".to_string()
}

/// Handoff settings cache configuration.
///
/// Settings are read on every inbound message. Updates become visible to
/// an instance at most `ttl_secs` after they are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsCacheConfig {
    #[serde(default = "default_settings_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for SettingsCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_settings_ttl_secs(),
        }
    }
}

fn default_settings_ttl_secs() -> u64 {
    60
}

/// Service-wide handoff defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffDefaultsConfig {
    /// Human-intent keywords used when a tenant has none configured,
    /// including tenants with no handoff settings at all.
    #[serde(default = "default_keywords")]
    pub default_keywords: Vec<String>,

    /// Chat cap for agents whose tenant has no settings.
    #[serde(default = "default_max_concurrent_chats")]
    pub default_max_concurrent_chats: u32,

    /// Low-confidence threshold used for newly created tenant settings.
    #[serde(default = "default_low_confidence_threshold")]
    pub default_low_confidence_threshold: f64,
}

impl Default for HandoffDefaultsConfig {
    fn default() -> Self {
        Self {
            default_keywords: default_keywords(),
            default_max_concurrent_chats: default_max_concurrent_chats(),
            default_low_confidence_threshold: default_low_confidence_threshold(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    [
        "human",
        "real person",
        "live agent",
        "agent",
        "representative",
        "operator",
        "speak to someone",
        "talk to someone",
        "customer service",
        "customer support",
        "support team",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_max_concurrent_chats() -> u32 {
    3
}

fn default_low_confidence_threshold() -> f64 {
    0.35
}

/// In-process notification transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Buffered events per channel before slow subscribers start lagging.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

/// Metrics export configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder at startup.
    #[serde(default)]
    pub prometheus_enabled: bool,

    /// Serve the Prometheus text format over HTTP on this address while
    /// `serve` runs, e.g. `127.0.0.1:9464`. Requires `prometheus_enabled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_addr: Option<std::net::SocketAddr>,
}
