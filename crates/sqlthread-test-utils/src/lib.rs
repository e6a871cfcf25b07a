// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for sqlthread.
//!
//! Provides a scripted driver and event collectors for fast, deterministic
//! tests without a database.
//!
//! # Components
//!
//! - [`MockDriver`] - driver with a call journal, scripted results, injected
//!   failures and a gate that holds the worker
//! - [`RecordingObserver`] - observer that stores and waits for events
//! - [`collect_events`] / [`collect_until`] - async helpers over
//!   `ThreadQuery::subscribe` receivers

pub mod events;
pub mod mock_driver;

pub use events::{RecordingObserver, collect_events, collect_until};
pub use mock_driver::{JournalEntry, MockDriver};
