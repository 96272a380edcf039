// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./switchboard.toml` > `~/.config/switchboard/switchboard.toml`
//! > `/etc/switchboard/switchboard.toml` with environment variable overrides via
//! the `SWITCHBOARD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SwitchboardConfig;

/// Section names recognised in environment variable keys.
///
/// Longer names come first so `settings_cache_ttl_secs` is not split at `settings_`.
const ENV_SECTIONS: &[&str] = &[
    "settings_cache",
    "notifications",
    "abandonment",
    "presence",
    "service",
    "storage",
    "handoff",
    "metrics",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/switchboard/switchboard.toml` (system-wide)
/// 3. `~/.config/switchboard/switchboard.toml` (user XDG config)
/// 4. `./switchboard.toml` (local directory)
/// 5. `SWITCHBOARD_*` environment variables
pub fn load_config() -> Result<SwitchboardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SwitchboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SwitchboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::file("/etc/switchboard/switchboard.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("switchboard/switchboard.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("switchboard.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `SWITCHBOARD_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because both section and
/// key names contain underscores: `SWITCHBOARD_PRESENCE_AGENT_AWAY_SECS` must
/// become `presence.agent_away_secs`.
fn env_provider() -> Env {
    Env::prefixed("SWITCHBOARD_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
