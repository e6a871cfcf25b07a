// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams: the database driver and event observers.

pub mod driver;
pub mod observer;

pub use driver::{Connection, Driver};
pub use observer::QueryObserver;
