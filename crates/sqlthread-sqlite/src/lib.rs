// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite driver for sqlthread.
//!
//! Opens one rusqlite connection per query worker. Statements are cached on
//! the connection, so `prepare` followed by `execute` compiles the SQL once.

pub mod convert;
pub mod driver;

pub use driver::{SqliteConnection, SqliteDriver};
