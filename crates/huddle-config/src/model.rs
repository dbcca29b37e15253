// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Huddle chat server.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Huddle configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HuddleConfig {
    /// Gateway server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Message history paging settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Conversation actor runtime settings.
    #[serde(default)]
    pub actor: ActorConfig,

    /// Agent workflow settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Push escalation settings.
    #[serde(default)]
    pub push: PushConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

/// Message history paging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Page size when the client omits `limit`.
    #[serde(default = "default_history_limit")]
    pub default_limit: usize,

    /// Hard cap on a single history page.
    #[serde(default = "default_history_max")]
    pub max_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
            max_limit: default_history_max(),
        }
    }
}

/// Conversation actor runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ActorConfig {
    /// Capacity of each conversation actor's command mailbox.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Seconds of mailbox silence before an idle actor is evicted.
    #[serde(default = "default_idle_evict_secs")]
    pub idle_evict_secs: u64,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            idle_evict_secs: default_idle_evict_secs(),
        }
    }
}

/// Agent workflow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Model identifier passed through to the AI capability.
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per completion call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// How many recent messages the AVAILABILITY step reads.
    #[serde(default = "default_availability_window")]
    pub availability_window: usize,

    /// How many recent messages the PREFERENCES step reads.
    #[serde(default = "default_preferences_window")]
    pub preferences_window: usize,

    /// Number of venue candidates the VENUES step generates.
    #[serde(default = "default_venue_count")]
    pub venue_count: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            availability_window: default_availability_window(),
            preferences_window: default_preferences_window(),
            venue_count: default_venue_count(),
        }
    }
}

/// Push escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Disable to skip the external gateway entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bound on concurrent per-recipient gateway calls.
    #[serde(default = "default_push_batch")]
    pub batch_size: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_push_batch(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> String {
    "huddle.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_history_limit() -> usize {
    50
}

fn default_history_max() -> usize {
    200
}

fn default_mailbox_capacity() -> usize {
    256
}

fn default_idle_evict_secs() -> u64 {
    300
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_availability_window() -> usize {
    20
}

fn default_preferences_window() -> usize {
    50
}

fn default_venue_count() -> usize {
    3
}

fn default_push_batch() -> usize {
    16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = HuddleConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8787);
        assert!(config.storage.wal_mode);
        assert_eq!(config.history.default_limit, 50);
        assert_eq!(config.agent.venue_count, 3);
        assert!(config.push.enabled);
    }
}
