// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result relay: delivers worker events to registered observers.
//!
//! The relay runs on its own thread so slow observers never hold up the
//! worker. Events are delivered in exactly the order the worker produced
//! them. Failures overwrite the façade's last error before any observer sees
//! them. No identity filtering happens here: observers must expect events
//! for queries that are no longer current.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use sqlthread_core::{QueryError, QueryEvent, QueryObserver};

/// Last error mirrored on the façade for synchronous inspection.
pub(crate) type ErrorMirror = Arc<Mutex<Option<QueryError>>>;

#[derive(Clone)]
enum Subscriber {
    Observer(Arc<dyn QueryObserver>),
    Channel(mpsc::UnboundedSender<QueryEvent>),
}

/// Registered observers, shared between the façade and the relay thread.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    inner: Arc<RwLock<Vec<Subscriber>>>,
}

impl Observers {
    pub(crate) fn add(&self, observer: Arc<dyn QueryObserver>) {
        self.write().push(Subscriber::Observer(observer));
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<QueryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.write().push(Subscriber::Channel(tx));
        rx
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Subscriber>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers one event to every subscriber in registration order.
    ///
    /// Callbacks run on a snapshot of the list with no lock held, so an
    /// observer may register further subscribers from inside `on_event`.
    /// Those receive events from the next one on.
    fn deliver(&self, event: &QueryEvent) {
        let subscribers = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut closed = false;
        for subscriber in &subscribers {
            match subscriber {
                Subscriber::Observer(observer) => {
                    let outcome =
                        panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event)));
                    if outcome.is_err() {
                        error!(event = event.label(), "observer panicked, continuing delivery");
                    }
                }
                Subscriber::Channel(tx) => {
                    closed |= tx.send(event.clone()).is_err();
                }
            }
        }
        if closed {
            self.write().retain(|s| match s {
                Subscriber::Channel(tx) => !tx.is_closed(),
                Subscriber::Observer(_) => true,
            });
            debug!("pruned closed event subscribers");
        }
    }
}

/// Relay thread body. Returns once the worker has dropped its sender and
/// every queued event has been delivered.
pub(crate) fn run(
    name: String,
    mut events: mpsc::UnboundedReceiver<QueryEvent>,
    observers: Observers,
    last_error: ErrorMirror,
) {
    debug!(relay = %name, "result relay started");
    let mut delivered = 0u64;
    while let Some(event) = events.blocking_recv() {
        if let QueryEvent::Failed { error, .. } = &event {
            *last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.clone());
        }
        observers.deliver(&event);
        delivered += 1;
    }
    info!(relay = %name, delivered, "result relay stopped");
}
