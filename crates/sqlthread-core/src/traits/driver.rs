// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver boundary: the blocking database collaborator owned by the worker.

use crate::error::QueryError;
use crate::types::{Bindings, ConnectionSpec, QueryOptions, RowSet};

/// Factory for connections of one database flavour.
///
/// Drivers are shared with the worker thread at startup, so they must be
/// `Send + Sync`. `connect` is always called on the worker thread.
pub trait Driver: Send + Sync + 'static {
    /// Returns the driver name matched against [`ConnectionSpec::driver`].
    fn name(&self) -> &str;

    /// Opens a connection. Failures should be [`QueryError::Connection`].
    fn connect(&self, spec: &ConnectionSpec) -> Result<Box<dyn Connection>, QueryError>;
}

/// A live, blocking connection. Only ever touched by the worker thread.
pub trait Connection: Send {
    /// Checks that `text` is a valid statement without running it.
    fn prepare(&mut self, text: &str) -> Result<(), QueryError>;

    /// Runs `text` with `bindings` and materializes the outcome.
    fn execute(
        &mut self,
        text: &str,
        bindings: &Bindings,
        options: &QueryOptions,
    ) -> Result<RowSet, QueryError>;

    fn begin_transaction(&mut self) -> Result<(), QueryError>;

    fn commit(&mut self) -> Result<(), QueryError>;

    fn rollback(&mut self) -> Result<(), QueryError>;
}
