// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sealdesk.toml` > `~/.config/sealdesk/sealdesk.toml`
//! > `/etc/sealdesk/sealdesk.toml` with environment variable overrides via
//! `SEALDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SealdeskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sealdesk/sealdesk.toml` (system-wide)
/// 3. `~/.config/sealdesk/sealdesk.toml` (user XDG config)
/// 4. `./sealdesk.toml` (local directory)
/// 5. `SEALDESK_*` environment variables
pub fn load_config() -> Result<SealdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SealdeskConfig::default()))
        .merge(Toml::file("/etc/sealdesk/sealdesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sealdesk/sealdesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sealdesk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<SealdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SealdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SealdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SealdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SEALDESK_STORAGE_DATABASE_PATH` must
/// map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("SEALDESK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: SEALDESK_STORAGE_STORAGE_ROOT -> "storage_storage_root"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("bot_", "bot.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("channels_", "channels.", 1)
            .replacen("server_", "server.", 1);
        mapped.into()
    })
}
