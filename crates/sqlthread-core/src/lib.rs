// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for sqlthread.
//!
//! This crate provides the error taxonomy, the data model shared by the
//! façade and its worker (identities, values, rows, commands and events) and
//! the two trait seams: [`Driver`]/[`Connection`] for the blocking database
//! and [`QueryObserver`] for event consumers.

pub mod error;
pub mod identity;
pub mod message;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::QueryError;
pub use identity::QueryIdentity;
pub use message::{Command, CommandKind, Navigation, QueryEvent};
pub use traits::{Connection, Driver, QueryObserver};
pub use types::{
    BatchMode, Bindings, BoundValue, ConnectionSpec, ParamDirection, Position, PrecisionPolicy,
    QueryOptions, Row, RowSet, Value,
};
