// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for sqlthread.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::fmt;

use serde::{Deserialize, Serialize};

use sqlthread_core::{ConnectionSpec, PrecisionPolicy};

/// Top-level sqlthread configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SqlthreadConfig {
    /// Database connection parameters.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Query defaults applied at construction.
    #[serde(default)]
    pub query: QueryConfig,

    /// Worker and relay thread settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Logging settings for the binary.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection parameters.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Registered driver name.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Database name; a file path or `:memory:` for SQLite.
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionConfig {
    /// Snapshot handed to the worker at startup.
    pub fn to_spec(&self) -> ConnectionSpec {
        ConnectionSpec {
            driver: self.driver.clone(),
            database: self.database.clone(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            database: default_database(),
            host: None,
            port: None,
            user: None,
            password: None,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_driver() -> String {
    "sqlite".to_string()
}

fn default_database() -> String {
    ":memory:".to_string()
}

/// Query defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Restrict cursors to forward movement.
    #[serde(default)]
    pub forward_only: bool,

    /// How numeric result values are materialized.
    #[serde(default)]
    pub precision_policy: PrecisionPolicy,

    /// Statement executed and fetched right after connecting.
    #[serde(default)]
    pub initial_query: Option<String>,
}

/// Worker and relay thread settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    #[serde(default = "default_relay_thread_name")]
    pub relay_thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            relay_thread_name: default_relay_thread_name(),
        }
    }
}

fn default_thread_name() -> String {
    "sqlthread-worker".to_string()
}

fn default_relay_thread_name() -> String {
    "sqlthread-relay".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
