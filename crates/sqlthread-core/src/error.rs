// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for sqlthread.

use std::sync::Arc;

use thiserror::Error;

/// Boxed, shareable error source.
///
/// Errors are mirrored on the façade and fanned out to every observer, so the
/// source lives behind an `Arc` to keep [`QueryError`] cheaply cloneable.
pub type ErrorSource = Arc<dyn std::error::Error + Send + Sync>;

/// The error type carried by failed query events and façade operations.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The worker could not open its connection. Every later command on the
    /// same façade fails with this error.
    #[error("connection error: {message}")]
    Connection {
        message: String,
        source: Option<ErrorSource>,
    },

    /// A single command failed against the driver. The worker keeps running.
    #[error("driver error: {message}")]
    Driver {
        message: String,
        source: Option<ErrorSource>,
    },

    /// A call addressed a query identity that is no longer current.
    #[error("usage error: {message}")]
    Usage { message: String },

    /// The worker thread is no longer accepting commands.
    #[error("worker stopped")]
    WorkerStopped,

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),
}

impl QueryError {
    /// Builds a [`QueryError::Driver`] without an underlying source.
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`QueryError::Driver`] wrapping an underlying error.
    pub fn driver_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Driver {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Builds a [`QueryError::Connection`] without an underlying source.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`QueryError::Connection`] wrapping an underlying error.
    pub fn connection_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns `true` for errors that poison the whole connection.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Short, stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Driver { .. } => "driver",
            Self::Usage { .. } => "usage",
            Self::WorkerStopped => "worker_stopped",
            Self::Config(_) => "config",
        }
    }
}
