// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted mock driver for deterministic tests.
//!
//! `MockDriver` implements [`Driver`] without a database. Every connection
//! call is appended to a shared journal, result sets can be scripted per SQL
//! text, failures can be injected per SQL text or at connect time, and a gate
//! can hold the worker inside its next driver call until released.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use sqlthread_core::{
    Bindings, Connection, ConnectionSpec, Driver, QueryError, QueryOptions, Row, RowSet, Value,
};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    Connect {
        spec: ConnectionSpec,
    },
    Prepare {
        text: String,
    },
    Execute {
        text: String,
        bindings: Bindings,
        options: QueryOptions,
    },
    Begin,
    Commit,
    Rollback,
    /// The connection was dropped, on the named thread.
    Close {
        thread: Option<String>,
    },
}

#[derive(Default)]
struct Inner {
    journal: Mutex<Vec<JournalEntry>>,
    scripts: Mutex<HashMap<String, RowSet>>,
    failures: Mutex<HashMap<String, String>>,
    connect_failure: Mutex<Option<String>>,
    held: Mutex<bool>,
    opened: Condvar,
}

impl Inner {
    fn record(&self, entry: JournalEntry) {
        lock(&self.journal).push(entry);
    }

    /// Blocks while the gate is held.
    fn pass_gate(&self) {
        let mut held = lock(&self.held);
        while *held {
            held = self
                .opened
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn check_failure(&self, text: &str) -> Result<(), QueryError> {
        match lock(&self.failures).get(text) {
            Some(message) => Err(QueryError::driver(message.clone())),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A driver whose connections answer from scripts instead of a database.
///
/// Clones share the same journal, scripts and gate.
#[derive(Clone, Default)]
pub struct MockDriver {
    inner: Arc<Inner>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the result set returned whenever `sql` is executed.
    pub fn script_rows(&self, sql: &str, columns: Vec<&str>, rows: Vec<Vec<Value>>) {
        let columns = columns.into_iter().map(String::from).collect();
        lock(&self.inner.scripts).insert(sql.to_string(), RowSet::from_rows(columns, rows));
    }

    /// Scripts the rows-affected count returned whenever `sql` is executed.
    pub fn script_affected(&self, sql: &str, rows_affected: u64) {
        lock(&self.inner.scripts).insert(sql.to_string(), RowSet::affected(rows_affected));
    }

    /// Makes every prepare or execute of `sql` fail with a driver error.
    pub fn fail_on(&self, sql: &str, message: &str) {
        lock(&self.inner.failures).insert(sql.to_string(), message.to_string());
    }

    /// Makes the next connection attempts fail.
    pub fn fail_connect(&self, message: &str) {
        *lock(&self.inner.connect_failure) = Some(message.to_string());
    }

    /// Holds every subsequent driver call until [`release`](Self::release).
    pub fn hold(&self) {
        *lock(&self.inner.held) = true;
    }

    pub fn release(&self) {
        *lock(&self.inner.held) = false;
        self.inner.opened.notify_all();
    }

    /// Snapshot of every recorded call, in order.
    pub fn journal(&self) -> Vec<JournalEntry> {
        lock(&self.inner.journal).clone()
    }

    /// SQL text of every execute call, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter_map(|entry| match entry {
                JournalEntry::Execute { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Polls the journal until it holds `len` entries or `timeout` elapses.
    pub fn wait_for_journal(&self, len: usize, timeout: Duration) -> Vec<JournalEntry> {
        let step = Duration::from_millis(5);
        let mut waited = Duration::ZERO;
        loop {
            let journal = self.journal();
            if journal.len() >= len || waited >= timeout {
                return journal;
            }
            thread::sleep(step);
            waited += step;
        }
    }
}

impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&self, spec: &ConnectionSpec) -> Result<Box<dyn Connection>, QueryError> {
        self.inner.record(JournalEntry::Connect { spec: spec.clone() });
        if let Some(message) = lock(&self.inner.connect_failure).clone() {
            return Err(QueryError::connection(message));
        }
        Ok(Box::new(MockConnection {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockConnection {
    inner: Arc<Inner>,
}

impl Connection for MockConnection {
    fn prepare(&mut self, text: &str) -> Result<(), QueryError> {
        self.inner.pass_gate();
        self.inner.record(JournalEntry::Prepare {
            text: text.to_string(),
        });
        self.inner.check_failure(text)
    }

    fn execute(
        &mut self,
        text: &str,
        bindings: &Bindings,
        options: &QueryOptions,
    ) -> Result<RowSet, QueryError> {
        self.inner.pass_gate();
        self.inner.record(JournalEntry::Execute {
            text: text.to_string(),
            bindings: bindings.clone(),
            options: *options,
        });
        self.inner.check_failure(text)?;

        let Some(mut set) = lock(&self.inner.scripts).get(text).cloned() else {
            return Ok(RowSet::affected(1));
        };
        set.rows = set
            .rows
            .into_iter()
            .map(|row| {
                let values = row
                    .values()
                    .iter()
                    .cloned()
                    .map(|v| options.precision.apply(v))
                    .collect();
                Row::new(Arc::clone(&set.columns), values)
            })
            .collect();
        Ok(set)
    }

    fn begin_transaction(&mut self) -> Result<(), QueryError> {
        self.inner.pass_gate();
        self.inner.record(JournalEntry::Begin);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), QueryError> {
        self.inner.pass_gate();
        self.inner.record(JournalEntry::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), QueryError> {
        self.inner.pass_gate();
        self.inner.record(JournalEntry::Rollback);
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.inner.record(JournalEntry::Close {
            thread: thread::current().name().map(String::from),
        });
    }
}
