// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observer boundary for worker events.

use crate::error::QueryError;
use crate::identity::QueryIdentity;
use crate::message::QueryEvent;
use crate::types::{Position, Row};

/// Receives events in the exact order the worker produced them.
///
/// Callbacks run on the relay thread. Identities are not filtered: an
/// observer may receive events for a query that is no longer current.
pub trait QueryObserver: Send + Sync + 'static {
    fn on_prepared(&self, _identity: QueryIdentity) {}

    fn on_executed(&self, _identity: QueryIdentity, _rows_affected: u64, _has_rows: bool) {}

    fn on_position_changed(&self, _identity: QueryIdentity, _position: Position) {}

    fn on_rows(&self, _identity: QueryIdentity, _rows: &[Row]) {}

    fn on_row(&self, _identity: QueryIdentity, _row: &Row) {}

    fn on_failed(&self, _identity: QueryIdentity, _error: &QueryError) {}

    /// Dispatches one event to the matching callback.
    fn on_event(&self, event: &QueryEvent) {
        match event {
            QueryEvent::Prepared { identity } => self.on_prepared(*identity),
            QueryEvent::Executed {
                identity,
                rows_affected,
                has_rows,
            } => self.on_executed(*identity, *rows_affected, *has_rows),
            QueryEvent::PositionChanged { identity, position } => {
                self.on_position_changed(*identity, *position)
            }
            QueryEvent::RowsReady { identity, rows } => self.on_rows(*identity, rows),
            QueryEvent::RowReady { identity, row } => self.on_row(*identity, row),
            QueryEvent::Failed { identity, error } => self.on_failed(*identity, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl QueryObserver for Recorder {
        fn on_rows(&self, _identity: QueryIdentity, rows: &[Row]) {
            assert!(rows.is_empty());
            self.calls.lock().unwrap().push("rows");
        }

        fn on_failed(&self, _identity: QueryIdentity, _error: &QueryError) {
            self.calls.lock().unwrap().push("failed");
        }
    }

    #[test]
    fn on_event_routes_to_callbacks() {
        let recorder = Recorder::default();
        let id = QueryIdentity::new();
        recorder.on_event(&QueryEvent::RowsReady {
            identity: id,
            rows: Vec::new(),
        });
        recorder.on_event(&QueryEvent::Prepared { identity: id });
        recorder.on_event(&QueryEvent::Failed {
            identity: id,
            error: QueryError::driver("x"),
        });
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["rows", "failed"]);
    }
}
