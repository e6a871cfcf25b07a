// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker: a dedicated thread that owns the connection and cursor.
//!
//! The worker drains its inbound queue strictly in arrival order, performs
//! one blocking driver call per command and posts the resulting events to the
//! relay. It never skips or reorders commands. When the façade stops intake
//! the remaining queue is drained, the connection is dropped on this thread
//! and the loop ends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sqlthread_core::{
    BatchMode, Bindings, BoundValue, Command, CommandKind, Connection, ConnectionSpec, Driver,
    Navigation, QueryError, QueryEvent, QueryIdentity, QueryOptions, Value,
};

use crate::cursor::Cursor;
use crate::metrics;

/// Everything the worker thread needs, moved in at spawn time.
pub(crate) struct WorkerContext {
    pub name: String,
    pub driver: Arc<dyn Driver>,
    pub spec: ConnectionSpec,
    pub options: QueryOptions,
    /// Identity failed connection attempts are reported under.
    pub identity: QueryIdentity,
    pub generation: QueryIdentity,
    pub inbox: mpsc::UnboundedReceiver<Command>,
    pub events: mpsc::UnboundedSender<QueryEvent>,
    pub depth: Arc<AtomicUsize>,
}

/// Worker thread body.
pub(crate) fn run(ctx: WorkerContext) {
    let WorkerContext {
        name,
        driver,
        spec,
        options,
        identity,
        generation,
        mut inbox,
        events,
        depth,
    } = ctx;

    info!(
        worker = %name,
        driver = driver.name(),
        database = %spec.database,
        "query worker starting"
    );

    let connection = match driver.connect(&spec) {
        Ok(conn) => Ok(conn),
        Err(err) => {
            warn!(worker = %name, error = %err, "connection failed, every command will fail");
            metrics::record_failure(err.kind());
            let _ = events.send(QueryEvent::Failed {
                identity,
                error: err.clone(),
            });
            Err(err)
        }
    };
    let mut session = Session::new(connection, options, generation);

    while let Some(command) = inbox.blocking_recv() {
        let remaining = depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::set_queue_depth(&name, remaining);

        let label = command.kind.label();
        debug!(
            worker = %name,
            command = label,
            identity = %command.identity,
            generation = %command.generation,
            "executing command"
        );

        let started = Instant::now();
        let produced = session.handle(command);
        metrics::record_command(label, started.elapsed().as_secs_f64());

        for event in produced {
            if let QueryEvent::Failed { error, .. } = &event {
                warn!(worker = %name, command = label, error = %error, "command failed");
                metrics::record_failure(error.kind());
            }
            if events.send(event).is_err() {
                debug!(worker = %name, "relay gone, dropping event");
            }
        }
    }

    // Driver resources are released here, on the worker's own thread.
    drop(session);
    info!(worker = %name, "query worker stopped");
}

/// The worker's private copy of the query state plus the live connection.
pub(crate) struct Session {
    connection: Result<Box<dyn Connection>, QueryError>,
    options: QueryOptions,
    generation: QueryIdentity,
    prepared: Option<String>,
    bindings: Bindings,
    cursor: Option<Cursor>,
}

impl Session {
    pub(crate) fn new(
        connection: Result<Box<dyn Connection>, QueryError>,
        options: QueryOptions,
        generation: QueryIdentity,
    ) -> Self {
        Self {
            connection,
            options,
            generation,
            prepared: None,
            bindings: Bindings::new(),
            cursor: None,
        }
    }

    /// Executes one command and returns the events it produced, in order.
    pub(crate) fn handle(&mut self, command: Command) -> Vec<QueryEvent> {
        let Command {
            identity,
            generation,
            kind,
        } = command;

        if generation != self.generation {
            debug!(from = %self.generation, to = %generation, "worker generation advanced");
            self.generation = generation;
            self.cursor = None;
        }

        let mut out = Vec::new();
        if let Err(error) = self.apply(identity, kind, &mut out) {
            out.push(QueryEvent::Failed { identity, error });
        }
        out
    }

    fn apply(
        &mut self,
        identity: QueryIdentity,
        kind: CommandKind,
        out: &mut Vec<QueryEvent>,
    ) -> Result<(), QueryError> {
        if let Err(err) = &self.connection {
            return Err(err.clone());
        }
        match kind {
            CommandKind::Prepare { text } => {
                self.cursor = None;
                self.bindings.clear();
                self.prepared = None;
                self.connection()?.prepare(&text)?;
                self.prepared = Some(text);
                out.push(QueryEvent::Prepared { identity });
            }
            CommandKind::Execute { text } => {
                let (text, bindings) = match text {
                    Some(text) => (text, Bindings::new()),
                    None => (self.prepared_text()?, self.bindings.clone()),
                };
                self.run_statement(identity, &text, &bindings, out)?;
            }
            CommandKind::ExecuteBatch { mode } => self.run_batch(identity, mode, out)?,
            CommandKind::BindValue {
                placeholder,
                value,
                direction,
            } => {
                self.bindings
                    .insert(placeholder, BoundValue { value, direction });
            }
            CommandKind::SetForwardOnly(forward_only) => self.options.forward_only = forward_only,
            CommandKind::SetPrecisionPolicy(precision) => self.options.precision = precision,
            CommandKind::Navigate(nav) => {
                let cursor = self.cursor_mut()?;
                let position = cursor.navigate(nav)?;
                out.push(QueryEvent::PositionChanged { identity, position });
                if let Some(row) = cursor.current() {
                    out.push(QueryEvent::RowReady {
                        identity,
                        row: row.clone(),
                    });
                }
            }
            CommandKind::FetchAll => {
                let cursor = self.cursor_mut()?;
                let rows = cursor.fetch_all();
                let position = cursor.position();
                out.push(QueryEvent::RowsReady { identity, rows });
                out.push(QueryEvent::PositionChanged { identity, position });
            }
            CommandKind::FetchSome { count } => {
                let cursor = self.cursor_mut()?;
                let rows = cursor.fetch_some(count);
                let position = cursor.position();
                out.push(QueryEvent::RowsReady { identity, rows });
                out.push(QueryEvent::PositionChanged { identity, position });
            }
            CommandKind::FetchOne => {
                let cursor = self.cursor_mut()?;
                let position = cursor.navigate(Navigation::Next)?;
                match cursor.current() {
                    Some(row) => out.push(QueryEvent::RowReady {
                        identity,
                        row: row.clone(),
                    }),
                    None => out.push(QueryEvent::PositionChanged { identity, position }),
                }
            }
            CommandKind::Finish => self.cursor = None,
            CommandKind::Clear => {
                self.cursor = None;
                self.prepared = None;
                self.bindings.clear();
            }
            CommandKind::Transaction => self.connection()?.begin_transaction()?,
            CommandKind::Commit => self.connection()?.commit()?,
            CommandKind::Rollback => self.connection()?.rollback()?,
        }
        Ok(())
    }

    fn connection(&mut self) -> Result<&mut dyn Connection, QueryError> {
        match &mut self.connection {
            Ok(conn) => Ok(conn.as_mut()),
            Err(err) => Err(err.clone()),
        }
    }

    fn cursor_mut(&mut self) -> Result<&mut Cursor, QueryError> {
        self.cursor
            .as_mut()
            .ok_or_else(|| QueryError::driver("no active result set"))
    }

    fn prepared_text(&self) -> Result<String, QueryError> {
        self.prepared
            .clone()
            .ok_or_else(|| QueryError::driver("no prepared statement to execute"))
    }

    fn run_statement(
        &mut self,
        identity: QueryIdentity,
        text: &str,
        bindings: &Bindings,
        out: &mut Vec<QueryEvent>,
    ) -> Result<(), QueryError> {
        self.cursor = None;
        let options = self.options;
        let set = self.connection()?.execute(text, bindings, &options)?;
        let rows_affected = set.rows_affected;
        let has_rows = set.has_rows;
        self.cursor = Some(Cursor::new(set, options.forward_only));
        out.push(QueryEvent::Executed {
            identity,
            rows_affected,
            has_rows,
        });
        Ok(())
    }

    fn run_batch(
        &mut self,
        identity: QueryIdentity,
        mode: BatchMode,
        out: &mut Vec<QueryEvent>,
    ) -> Result<(), QueryError> {
        let text = self.prepared_text()?;
        let rows = batch_rows(&self.bindings)?;
        debug!(?mode, rows = rows.len(), "executing batch");

        self.cursor = None;
        let options = self.options;
        let conn = self.connection()?;
        let mut rows_affected = 0;
        for bindings in &rows {
            rows_affected += conn.execute(&text, bindings, &options)?.rows_affected;
        }
        out.push(QueryEvent::Executed {
            identity,
            rows_affected,
            has_rows: false,
        });
        Ok(())
    }
}

/// Expands list bindings into one binding set per batch row.
///
/// Every list must have the same length; scalar bindings repeat on each row.
fn batch_rows(bindings: &Bindings) -> Result<Vec<Bindings>, QueryError> {
    let mut len = None;
    for (name, bound) in bindings {
        if let Value::List(items) = &bound.value {
            match len {
                None => len = Some(items.len()),
                Some(n) if n != items.len() => {
                    return Err(QueryError::driver(format!(
                        "batch parameter {name} has {} values, expected {n}",
                        items.len()
                    )));
                }
                Some(_) => {}
            }
        }
    }

    let len = len.unwrap_or(1);
    let rows = (0..len)
        .map(|i| {
            bindings
                .iter()
                .map(|(name, bound)| {
                    let value = match &bound.value {
                        Value::List(items) => items[i].clone(),
                        other => other.clone(),
                    };
                    (
                        name.clone(),
                        BoundValue {
                            value,
                            direction: bound.direction,
                        },
                    )
                })
                .collect()
        })
        .collect();
    Ok(rows)
}
