// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch from caller threads to the worker's inbound queue.
//!
//! The façade calls [`Dispatcher::send`] while it still holds its state lock,
//! so the order in which commands land on the queue is the order in which
//! the mirrored state was mutated. The queue is unbounded: sending never
//! waits for the worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use sqlthread_core::{Command, CommandKind, QueryError, QueryIdentity};

use crate::metrics;
use crate::relay::ErrorMirror;

pub(crate) struct Dispatcher {
    outbox: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    depth: Arc<AtomicUsize>,
    worker_name: String,
    last_error: ErrorMirror,
}

impl Dispatcher {
    pub(crate) fn new(
        outbox: mpsc::UnboundedSender<Command>,
        depth: Arc<AtomicUsize>,
        worker_name: String,
        last_error: ErrorMirror,
    ) -> Self {
        Self {
            outbox: Mutex::new(Some(outbox)),
            depth,
            worker_name,
            last_error,
        }
    }

    /// Enqueues one command. Returns `false` if the worker no longer accepts
    /// commands, in which case [`QueryError::WorkerStopped`] is mirrored.
    pub(crate) fn send(
        &self,
        identity: QueryIdentity,
        generation: QueryIdentity,
        kind: CommandKind,
    ) -> bool {
        let command = Command {
            identity,
            generation,
            kind,
        };
        let label = command.kind.label();

        // Counted before sending so the worker never decrements below zero.
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        let outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = match outbox.as_ref() {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        };
        drop(outbox);

        if sent {
            metrics::set_queue_depth(&self.worker_name, depth);
            debug!(command = label, %identity, depth, "command queued");
        } else {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            warn!(command = label, %identity, "worker stopped, command dropped");
            *self
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(QueryError::WorkerStopped);
        }
        sent
    }

    /// Stops intake. Returns `true` the first time it is called.
    pub(crate) fn close(&self) -> bool {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Number of commands queued and not yet picked up by the worker.
    pub(crate) fn pending(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> (Dispatcher, mpsc::UnboundedReceiver<Command>, ErrorMirror) {
        let (tx, rx) = mpsc::unbounded_channel();
        let last_error = ErrorMirror::default();
        let dispatcher = Dispatcher::new(
            tx,
            Arc::new(AtomicUsize::new(0)),
            "test-worker".into(),
            Arc::clone(&last_error),
        );
        (dispatcher, rx, last_error)
    }

    #[test]
    fn commands_arrive_in_send_order() {
        let (dispatcher, mut rx, _) = dispatcher();
        let id = QueryIdentity::new();
        let generation = QueryIdentity::new();

        assert!(dispatcher.send(id, generation, CommandKind::Transaction));
        assert!(dispatcher.send(id, generation, CommandKind::FetchAll));
        assert!(dispatcher.send(id, generation, CommandKind::Commit));
        assert_eq!(dispatcher.pending(), 3);

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Transaction,
                CommandKind::FetchAll,
                CommandKind::Commit
            ]
        );
    }

    #[test]
    fn send_after_close_mirrors_worker_stopped() {
        let (dispatcher, _rx, last_error) = dispatcher();
        assert!(dispatcher.close());
        assert!(!dispatcher.close());

        let sent = dispatcher.send(QueryIdentity::new(), QueryIdentity::new(), CommandKind::Clear);

        assert!(!sent);
        assert!(matches!(
            *last_error.lock().unwrap(),
            Some(QueryError::WorkerStopped)
        ));
    }
}
