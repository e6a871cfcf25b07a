// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sqlthread.toml` > `~/.config/sqlthread/sqlthread.toml`
//! > `/etc/sqlthread/sqlthread.toml` with environment variable overrides via the
//! `SQLTHREAD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SqlthreadConfig;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/sqlthread/sqlthread.toml";
pub const LOCAL_CONFIG_PATH: &str = "sqlthread.toml";

/// Top-level sections an environment variable may address.
const SECTIONS: [&str; 4] = ["connection", "query", "worker", "logging"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sqlthread/sqlthread.toml` (system-wide)
/// 3. `~/.config/sqlthread/sqlthread.toml` (user XDG config)
/// 4. `./sqlthread.toml` (local directory)
/// 5. `SQLTHREAD_*` environment variables
pub fn load_config() -> Result<SqlthreadConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SqlthreadConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SqlthreadConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SqlthreadConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SqlthreadConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SqlthreadConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// `$XDG_CONFIG_HOME/sqlthread/sqlthread.toml`, when a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sqlthread").join("sqlthread.toml"))
}

/// Create the environment variable provider with explicit section mapping.
///
/// Only the first underscore after a known section name becomes a dot:
/// `SQLTHREAD_WORKER_RELAY_THREAD_NAME` maps to `worker.relay_thread_name`.
fn env_provider() -> Env {
    Env::prefixed("SQLTHREAD_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_at_section_only() {
        assert_eq!(map_env_key("connection_database"), "connection.database");
        assert_eq!(
            map_env_key("worker_relay_thread_name"),
            "worker.relay_thread_name"
        );
        assert_eq!(map_env_key("query_initial_query"), "query.initial_query");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
