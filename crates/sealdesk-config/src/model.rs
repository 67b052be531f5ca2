// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sealdesk ticket bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use sealdesk_core::Topic;
use serde::{Deserialize, Serialize};

/// Top-level Sealdesk configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; validation decides which empty values are acceptable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SealdeskConfig {
    /// Bot identity and logging settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Database and archive storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Platform channel ids the bot operates against.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Interaction webhook listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Static topic catalog, topic id -> topic definition.
    #[serde(default)]
    pub topics: BTreeMap<String, Topic>,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name of the bot.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "sealdesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Database and archive storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory where sealed transcript archives are written.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    /// Public base URL under which `storage_root` is exposed. Joined with
    /// the archive filename to produce the ticket URL shown to users.
    #[serde(default)]
    pub exposed_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            storage_root: default_storage_root(),
            exposed_base_url: String::new(),
        }
    }
}

fn default_database_path() -> String {
    "sealdesk.db".to_string()
}

fn default_storage_root() -> String {
    "transcripts".to_string()
}

/// Platform channel configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    /// Staff log channel receiving close summaries and one-time keys.
    #[serde(default)]
    pub log_channel: String,

    /// Parent channel under which ticket threads are created, and to which
    /// closed threads are reparented when locked.
    #[serde(default)]
    pub thread_channel: String,
}

/// Interaction webhook listener configuration.
///
/// The platform delivers interactions over HTTPS; TLS termination is
/// expected to happen in a reverse proxy in front of this listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the webhook listener binds to.
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port the webhook listener binds to.
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8130
}
