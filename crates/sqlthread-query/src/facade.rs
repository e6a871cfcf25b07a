// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The caller-facing [`ThreadQuery`] and its [`QueryBuilder`].
//!
//! Every method takes the scope lock, updates the mirrored state so getters
//! see the change at once, and enqueues one command for the worker while the
//! lock is still held. Results arrive later through observers or
//! [`ThreadQuery::subscribe`].

use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use sqlthread_config::model::SqlthreadConfig;
use sqlthread_core::{
    BatchMode, CommandKind, ConnectionSpec, Driver, Navigation, ParamDirection, PrecisionPolicy,
    QueryError, QueryEvent, QueryIdentity, QueryObserver, QueryOptions, Value,
};

use crate::dispatcher::Dispatcher;
use crate::lock::{ScopeGuard, ScopeLock};
use crate::registry::DriverRegistry;
use crate::relay::{self, ErrorMirror, Observers};
use crate::state::SharedState;
use crate::worker::{self, WorkerContext};

pub const DEFAULT_WORKER_NAME: &str = "sqlthread-worker";
pub const DEFAULT_RELAY_NAME: &str = "sqlthread-relay";

/// Construction parameters for a [`ThreadQuery`].
pub struct QueryBuilder {
    driver: Arc<dyn Driver>,
    spec: ConnectionSpec,
    initial_query: Option<String>,
    options: QueryOptions,
    worker_name: String,
    relay_name: String,
    observers: Vec<Arc<dyn QueryObserver>>,
}

impl QueryBuilder {
    pub fn new(driver: Arc<dyn Driver>, spec: ConnectionSpec) -> Self {
        Self {
            driver,
            spec,
            initial_query: None,
            options: QueryOptions::default(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            relay_name: DEFAULT_RELAY_NAME.to_string(),
            observers: Vec::new(),
        }
    }

    /// Builds from loaded configuration, resolving the driver by name.
    pub fn from_config(
        registry: &DriverRegistry,
        config: &SqlthreadConfig,
    ) -> Result<Self, QueryError> {
        let driver = registry.get(&config.connection.driver)?;
        let mut builder = Self::new(driver, config.connection.to_spec())
            .forward_only(config.query.forward_only)
            .precision(config.query.precision_policy)
            .worker_name(config.worker.thread_name.clone())
            .relay_name(config.worker.relay_thread_name.clone());
        if let Some(text) = &config.query.initial_query {
            builder = builder.initial_query(text.clone());
        }
        Ok(builder)
    }

    /// Statement executed and fully fetched right after connecting.
    pub fn initial_query(mut self, text: impl Into<String>) -> Self {
        self.initial_query = Some(text.into());
        self
    }

    pub fn forward_only(mut self, forward_only: bool) -> Self {
        self.options.forward_only = forward_only;
        self
    }

    pub fn precision(mut self, precision: PrecisionPolicy) -> Self {
        self.options.precision = precision;
        self
    }

    pub fn worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    pub fn relay_name(mut self, name: impl Into<String>) -> Self {
        self.relay_name = name.into();
        self
    }

    /// Registers an observer before any event can be produced.
    pub fn observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Starts the worker and relay threads.
    pub fn build(self) -> Result<ThreadQuery, QueryError> {
        self.start(false).map(|(query, _)| query)
    }

    /// Like [`build`](Self::build), also returning a receiver subscribed
    /// before the threads start, so no event is missed.
    pub fn build_with_events(
        self,
    ) -> Result<(ThreadQuery, mpsc::UnboundedReceiver<QueryEvent>), QueryError> {
        let (query, events) = self.start(true)?;
        let events = events.ok_or(QueryError::WorkerStopped)?;
        Ok((query, events))
    }

    fn start(
        self,
        subscribe: bool,
    ) -> Result<(ThreadQuery, Option<mpsc::UnboundedReceiver<QueryEvent>>), QueryError> {
        let QueryBuilder {
            driver,
            spec,
            initial_query,
            options,
            worker_name,
            relay_name,
            observers: initial_observers,
        } = self;

        let observers = Observers::default();
        for observer in initial_observers {
            observers.add(observer);
        }
        let events_rx = subscribe.then(|| observers.subscribe());

        let state = SharedState::new(initial_query.clone().unwrap_or_default(), options);
        let identity = state.identity;
        let generation = state.generation;

        let last_error = ErrorMirror::default();
        let depth = Arc::new(AtomicUsize::new(0));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let relay = {
            let observers = observers.clone();
            let last_error = Arc::clone(&last_error);
            let name = relay_name.clone();
            thread::Builder::new()
                .name(relay_name.clone())
                .spawn(move || relay::run(name, event_rx, observers, last_error))
                .map_err(|e| QueryError::connection_with("failed to spawn relay thread", e))?
        };

        let ctx = WorkerContext {
            name: worker_name.clone(),
            driver,
            spec: spec.clone(),
            options,
            identity,
            generation,
            inbox: command_rx,
            events: event_tx,
            depth: Arc::clone(&depth),
        };
        let worker = match thread::Builder::new()
            .name(worker_name.clone())
            .spawn(move || worker::run(ctx))
        {
            Ok(handle) => handle,
            Err(e) => {
                // The event sender went down with the closure, so the relay exits.
                let _ = relay.join();
                return Err(QueryError::connection_with("failed to spawn worker thread", e));
            }
        };

        let dispatcher = Dispatcher::new(
            command_tx,
            depth,
            worker_name.clone(),
            Arc::clone(&last_error),
        );
        let query = ThreadQuery {
            state: ScopeLock::new(state),
            dispatcher,
            observers,
            last_error,
            spec,
            worker: Mutex::new(Some(worker)),
            relay: Mutex::new(Some(relay)),
            worker_name,
        };

        if let Some(text) = initial_query {
            let state = query.state.lock();
            query.dispatcher.send(
                identity,
                generation,
                CommandKind::Execute { text: Some(text) },
            );
            query
                .dispatcher
                .send(identity, generation, CommandKind::FetchAll);
            drop(state);
        }

        info!(worker = %query.worker_name, %identity, "thread query started");
        Ok((query, events_rx))
    }
}

/// Asynchronous, thread-safe handle on one database query.
///
/// Cheap to share behind an `Arc`. Calls never wait for the database; they
/// wait only for the scope lock, and only while another thread holds a
/// [`begin`](Self::begin)/[`end`](Self::end) section.
pub struct ThreadQuery {
    state: ScopeLock<SharedState>,
    dispatcher: Dispatcher,
    observers: Observers,
    last_error: ErrorMirror,
    spec: ConnectionSpec,
    worker: Mutex<Option<JoinHandle<()>>>,
    relay: Mutex<Option<JoinHandle<()>>>,
    worker_name: String,
}

impl ThreadQuery {
    pub fn builder(driver: Arc<dyn Driver>, spec: ConnectionSpec) -> QueryBuilder {
        QueryBuilder::new(driver, spec)
    }

    // --- options ---

    pub fn set_numerical_precision_policy(&self, precision: PrecisionPolicy) {
        let mut state = self.state.lock();
        state.options.precision = precision;
        self.dispatcher.send(
            state.identity,
            state.generation,
            CommandKind::SetPrecisionPolicy(precision),
        );
    }

    pub fn numerical_precision_policy(&self) -> PrecisionPolicy {
        self.state.lock().options.precision
    }

    pub fn set_forward_only(&self, forward_only: bool) {
        let mut state = self.state.lock();
        state.options.forward_only = forward_only;
        self.dispatcher.send(
            state.identity,
            state.generation,
            CommandKind::SetForwardOnly(forward_only),
        );
    }

    pub fn is_forward_only(&self) -> bool {
        self.state.lock().options.forward_only
    }

    // --- bindings ---

    /// Binds an input value for the current query.
    pub fn bind_value(&self, placeholder: impl Into<String>, value: impl Into<Value>) -> bool {
        self.bind_param(None, placeholder, value, ParamDirection::In)
    }

    /// Binds a value with an explicit direction. Returns `false` without
    /// touching the bindings when `identity` is stale.
    pub fn bind_param(
        &self,
        identity: Option<QueryIdentity>,
        placeholder: impl Into<String>,
        value: impl Into<Value>,
        direction: ParamDirection,
    ) -> bool {
        let placeholder = placeholder.into();
        let value = value.into();
        let mut state = self.state.lock();
        if state.identity.is_stale(identity) {
            trace!(%placeholder, current = %state.identity, "stale bind suppressed");
            return false;
        }
        state.bind(placeholder.clone(), value.clone(), direction);
        self.dispatcher.send(
            state.identity,
            state.generation,
            CommandKind::BindValue {
                placeholder,
                value,
                direction,
            },
        )
    }

    pub fn bound_value(&self, placeholder: &str) -> Option<Value> {
        self.state
            .lock()
            .bindings
            .get(placeholder)
            .map(|bound| bound.value.clone())
    }

    pub fn bound_values(&self) -> BTreeMap<String, Value> {
        self.state.lock().bound_values()
    }

    pub fn bound_direction(&self, placeholder: &str) -> Option<ParamDirection> {
        self.state
            .lock()
            .bindings
            .get(placeholder)
            .map(|bound| bound.direction)
    }

    // --- statements ---

    /// Prepares `text`, adopting `identity` or minting a fresh one. Clears
    /// the bindings and starts a new worker generation.
    pub fn prepare(
        &self,
        text: impl Into<String>,
        identity: Option<QueryIdentity>,
    ) -> QueryIdentity {
        let text = text.into();
        let mut state = self.state.lock();
        state.identity = identity.unwrap_or_default();
        state.query_text = text.clone();
        state.bindings.clear();
        state.advance_generation();
        self.dispatcher.send(
            state.identity,
            state.generation,
            CommandKind::Prepare { text },
        );
        state.identity
    }

    /// Executes the prepared statement with the bound values. Keeps the
    /// current identity unless one is supplied.
    pub fn execute(&self, identity: Option<QueryIdentity>) -> QueryIdentity {
        let mut state = self.state.lock();
        if let Some(identity) = identity {
            state.identity = identity;
        }
        self.dispatcher.send(
            state.identity,
            state.generation,
            CommandKind::Execute { text: None },
        );
        state.identity
    }

    /// Executes `text` directly, without bindings.
    pub fn execute_sql(
        &self,
        text: impl Into<String>,
        identity: Option<QueryIdentity>,
    ) -> QueryIdentity {
        let text = text.into();
        let mut state = self.state.lock();
        state.identity = identity.unwrap_or_default();
        state.query_text = text.clone();
        self.dispatcher.send(
            state.identity,
            state.generation,
            CommandKind::Execute { text: Some(text) },
        );
        state.identity
    }

    /// Runs the prepared statement once per row of the list bindings.
    pub fn execute_batch(
        &self,
        mode: BatchMode,
        identity: Option<QueryIdentity>,
    ) -> QueryIdentity {
        let mut state = self.state.lock();
        if let Some(identity) = identity {
            state.identity = identity;
        }
        self.dispatcher.send(
            state.identity,
            state.generation,
            CommandKind::ExecuteBatch { mode },
        );
        state.identity
    }

    /// Text of the most recently prepared or executed statement.
    pub fn last_query(&self) -> String {
        self.state.lock().query_text.clone()
    }

    /// Most recent failure reported by the worker, stale or not.
    pub fn last_error(&self) -> Option<QueryError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // --- scoped exclusive access ---

    /// Starts a section in which only the current thread may use this query.
    pub fn begin(&self) {
        self.state.begin();
    }

    /// Ends the current thread's section. Ignored, returning `false`, when
    /// called from a thread that holds none.
    pub fn end(&self) -> bool {
        self.state.end()
    }

    /// [`begin`](Self::begin) with an automatic [`end`](Self::end) on drop.
    pub fn scoped(&self) -> ScopeGuard<'_, SharedState> {
        ScopeGuard::new(&self.state)
    }

    // --- navigation and fetching ---

    pub fn first(&self, identity: Option<QueryIdentity>) -> bool {
        self.navigate(identity, Navigation::First)
    }

    pub fn next(&self, identity: Option<QueryIdentity>) -> bool {
        self.navigate(identity, Navigation::Next)
    }

    pub fn previous(&self, identity: Option<QueryIdentity>) -> bool {
        self.navigate(identity, Navigation::Previous)
    }

    pub fn last(&self, identity: Option<QueryIdentity>) -> bool {
        self.navigate(identity, Navigation::Last)
    }

    /// Moves to `index`, or by `index` rows when `relative`.
    pub fn seek(&self, identity: Option<QueryIdentity>, index: i64, relative: bool) -> bool {
        self.navigate(identity, Navigation::Seek { index, relative })
    }

    pub fn fetch_all(&self, identity: Option<QueryIdentity>) -> bool {
        self.dispatch_current(identity, CommandKind::FetchAll)
    }

    pub fn fetch_some(&self, count: usize, identity: Option<QueryIdentity>) -> bool {
        self.dispatch_current(identity, CommandKind::FetchSome { count })
    }

    pub fn fetch_one(&self, identity: Option<QueryIdentity>) -> bool {
        self.dispatch_current(identity, CommandKind::FetchOne)
    }

    fn navigate(&self, identity: Option<QueryIdentity>, nav: Navigation) -> bool {
        self.dispatch_current(identity, CommandKind::Navigate(nav))
    }

    /// Enqueues `kind` unless `identity` names a query that is no longer current.
    fn dispatch_current(&self, identity: Option<QueryIdentity>, kind: CommandKind) -> bool {
        let state = self.state.lock();
        if state.identity.is_stale(identity) {
            trace!(
                command = kind.label(),
                current = %state.identity,
                "stale call suppressed"
            );
            return false;
        }
        self.dispatcher.send(state.identity, state.generation, kind)
    }

    // --- lifecycle ---

    /// Releases the result set of the current query. A no-op returning
    /// `false` when no query is active.
    pub fn finish(&self) -> bool {
        let mut state = self.state.lock();
        if state.identity.is_finished() {
            trace!("finish on an already finished query ignored");
            return false;
        }
        let previous = state.finish();
        debug!(%previous, generation = %state.generation, "query finished");
        self.dispatcher
            .send(state.identity, state.generation, CommandKind::Finish)
    }

    /// Drops the result set, prepared statement and bindings.
    /// [`last_query`](Self::last_query) still reports the cleared text.
    pub fn clear(&self) -> bool {
        let mut state = self.state.lock();
        state.bindings.clear();
        let previous = state.finish();
        debug!(%previous, generation = %state.generation, "query cleared");
        self.dispatcher
            .send(state.identity, state.generation, CommandKind::Clear)
    }

    pub fn transaction(&self) -> bool {
        self.dispatch_current(None, CommandKind::Transaction)
    }

    pub fn commit(&self) -> bool {
        self.dispatch_current(None, CommandKind::Commit)
    }

    pub fn rollback(&self) -> bool {
        self.dispatch_current(None, CommandKind::Rollback)
    }

    // --- introspection ---

    /// Identity of the current logical query, or [`QueryIdentity::FINISHED`].
    pub fn identity(&self) -> QueryIdentity {
        self.state.lock().identity
    }

    /// Worker bookkeeping identity.
    pub fn generation(&self) -> QueryIdentity {
        self.state.lock().generation
    }

    pub fn connection_spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    pub fn add_observer(&self, observer: Arc<dyn QueryObserver>) {
        self.observers.add(observer);
    }

    /// Receiver of every event produced from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<QueryEvent> {
        self.observers.subscribe()
    }

    /// Commands enqueued and not yet picked up by the worker.
    pub fn pending_commands(&self) -> usize {
        self.dispatcher.pending()
    }

    /// Stops intake, waits for the worker to drain its queue and for the
    /// relay to deliver every event. Idempotent.
    pub fn close(&self) {
        if self.dispatcher.close() {
            debug!(worker = %self.worker_name, "closing thread query");
        }
        join(&self.worker);
        join(&self.relay);
    }
}

fn join(slot: &Mutex<Option<JoinHandle<()>>>) {
    let handle = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    let Some(handle) = handle else {
        return;
    };
    if handle.thread().id() == thread::current().id() {
        // Dropped from an observer callback; the thread exits on its own.
        return;
    }
    let name = handle.thread().name().unwrap_or("unnamed").to_string();
    if handle.join().is_err() {
        warn!(thread = %name, "thread panicked before shutdown");
    }
}

impl Drop for ThreadQuery {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ThreadQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadQuery")
            .field("worker", &self.worker_name)
            .field("spec", &self.spec)
            .field("pending", &self.dispatcher.pending())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
