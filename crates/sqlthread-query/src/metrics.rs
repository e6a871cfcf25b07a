// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these.
//! Without a recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all sqlthread metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "sqlthread_commands_total",
        "Commands executed by query workers"
    );
    describe_counter!(
        "sqlthread_failures_total",
        "Failed events produced by query workers"
    );
    describe_gauge!(
        "sqlthread_queue_depth",
        "Commands waiting in worker inbound queues"
    );
    describe_histogram!(
        "sqlthread_command_seconds",
        "Time spent executing one worker command"
    );
}

pub fn record_command(kind: &'static str, seconds: f64) {
    metrics::counter!("sqlthread_commands_total", "kind" => kind).increment(1);
    metrics::histogram!("sqlthread_command_seconds", "kind" => kind).record(seconds);
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("sqlthread_failures_total", "kind" => kind).increment(1);
}

pub fn set_queue_depth(worker: &str, depth: usize) {
    metrics::gauge!("sqlthread_queue_depth", "worker" => worker.to_string()).set(depth as f64);
}
