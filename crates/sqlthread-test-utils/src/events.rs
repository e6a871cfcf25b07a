// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for collecting query events in tests.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use sqlthread_core::{QueryEvent, QueryObserver};

/// Observer that stores every event it receives.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<QueryEvent>>,
    arrived: Condvar,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<QueryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Blocks until at least `count` events arrived or `timeout` elapses,
    /// then returns everything received.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<QueryEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        while events.len() < count {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            events = self
                .arrived
                .wait_timeout(events, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        events.clone()
    }
}

impl QueryObserver for RecordingObserver {
    fn on_event(&self, event: &QueryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        self.arrived.notify_all();
    }
}

/// Receives events until `done` returns `true` for one of them, the channel
/// closes, or `timeout` elapses. The matching event is included.
pub async fn collect_until<F>(
    rx: &mut mpsc::UnboundedReceiver<QueryEvent>,
    timeout: Duration,
    mut done: F,
) -> Vec<QueryEvent>
where
    F: FnMut(&QueryEvent) -> bool,
{
    let mut events = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Some(event) = rx.recv().await {
            let finished = done(&event);
            events.push(event);
            if finished {
                break;
            }
        }
    })
    .await;
    events
}

/// Receives exactly `count` events, or fewer on timeout or close.
pub async fn collect_events(
    rx: &mut mpsc::UnboundedReceiver<QueryEvent>,
    count: usize,
    timeout: Duration,
) -> Vec<QueryEvent> {
    let mut seen = 0;
    if count == 0 {
        return Vec::new();
    }
    collect_until(rx, timeout, |_| {
        seen += 1;
        seen >= count
    })
    .await
}
