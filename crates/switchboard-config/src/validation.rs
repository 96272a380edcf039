// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as threshold ordering, non-zero intervals, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::SwitchboardConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SwitchboardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let presence = &config.presence;
    if presence.customer_away_secs == 0 {
        fail("presence.customer_away_secs must be greater than 0".to_string());
    }
    if presence.customer_offline_secs <= presence.customer_away_secs {
        fail(format!(
            "presence.customer_offline_secs ({}) must be greater than presence.customer_away_secs ({})",
            presence.customer_offline_secs, presence.customer_away_secs
        ));
    }
    if presence.agent_away_secs == 0 {
        fail("presence.agent_away_secs must be greater than 0".to_string());
    }
    if presence.agent_offline_secs <= presence.agent_away_secs {
        fail(format!(
            "presence.agent_offline_secs ({}) must be greater than presence.agent_away_secs ({})",
            presence.agent_offline_secs, presence.agent_away_secs
        ));
    }
    if presence.agent_sweep_interval_secs == 0 {
        fail("presence.agent_sweep_interval_secs must be greater than 0".to_string());
    }

    if config.abandonment.threshold_secs == 0 {
        fail("abandonment.threshold_secs must be greater than 0".to_string());
    }
    if config.abandonment.sweep_interval_secs == 0 {
        fail("abandonment.sweep_interval_secs must be greater than 0".to_string());
    }

    if config.settings_cache.ttl_secs == 0 {
        fail("settings_cache.ttl_secs must be greater than 0".to_string());
    }

    let handoff = &config.handoff;
    if handoff.default_max_concurrent_chats == 0 {
        fail("handoff.default_max_concurrent_chats must be at least 1".to_string());
    }
    if !(0.0..=1.0).contains(&handoff.default_low_confidence_threshold) {
        fail(format!(
            "handoff.default_low_confidence_threshold must be within 0.0-1.0, got {}",
            handoff.default_low_confidence_threshold
        ));
    }
    for (i, keyword) in handoff.default_keywords.iter().enumerate() {
        if keyword.trim().is_empty() {
            fail(format!("handoff.default_keywords[{i}] must not be empty"));
        }
    }

    if config.notifications.channel_capacity == 0 {
        fail("notifications.channel_capacity must be at least 1".to_string());
    }

    if let Some(addr) = config.metrics.listen_addr {
        if !config.metrics.prometheus_enabled {
            fail(format!(
                "metrics.listen_addr ({addr}) is set but metrics.prometheus_enabled is false"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
