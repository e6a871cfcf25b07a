// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asynchronous façade over a blocking, single-connection query object.
//!
//! A [`ThreadQuery`] owns two threads:
//! - a worker that holds the database connection and runs commands in order
//! - a relay that hands the worker's events to observers in order
//!
//! Callers on any thread mutate mirrored state and enqueue commands without
//! waiting for the database. Each logical query carries a [`QueryIdentity`]
//! so calls addressed to a superseded query are dropped before they reach
//! the worker.
//!
//! [`QueryIdentity`]: sqlthread_core::QueryIdentity

mod cursor;
mod dispatcher;
pub mod facade;
pub mod lock;
pub mod metrics;
pub mod registry;
mod relay;
pub mod state;
mod worker;

pub use facade::{DEFAULT_RELAY_NAME, DEFAULT_WORKER_NAME, QueryBuilder, ThreadQuery};
pub use lock::{ScopeGuard, ScopeLock};
pub use registry::DriverRegistry;
pub use state::SharedState;
