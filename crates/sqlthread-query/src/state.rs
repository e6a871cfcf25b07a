// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-side mirror of the query state.
//!
//! Getters on the façade read these fields instead of asking the worker, so
//! they reflect every dispatched mutation immediately, whether or not the
//! worker has applied it yet.

use std::collections::BTreeMap;

use sqlthread_core::{Bindings, BoundValue, ParamDirection, QueryIdentity, QueryOptions, Value};

/// Mutable fields guarded by the façade's [`ScopeLock`](crate::lock::ScopeLock).
#[derive(Debug, Clone)]
pub struct SharedState {
    pub query_text: String,
    pub bindings: Bindings,
    pub options: QueryOptions,
    /// Caller-visible identity of the current logical query.
    pub identity: QueryIdentity,
    /// Worker bookkeeping identity; re-minted on prepare, finish and clear.
    pub generation: QueryIdentity,
}

impl SharedState {
    pub fn new(query_text: String, options: QueryOptions) -> Self {
        Self {
            query_text,
            bindings: Bindings::new(),
            options,
            identity: QueryIdentity::new(),
            generation: QueryIdentity::new(),
        }
    }

    pub fn bind(&mut self, placeholder: String, value: Value, direction: ParamDirection) {
        self.bindings
            .insert(placeholder, BoundValue { value, direction });
    }

    pub fn bound_values(&self) -> BTreeMap<String, Value> {
        self.bindings
            .iter()
            .map(|(name, bound)| (name.clone(), bound.value.clone()))
            .collect()
    }

    /// Mints a new generation and returns it.
    pub fn advance_generation(&mut self) -> QueryIdentity {
        self.generation = QueryIdentity::new();
        self.generation
    }

    /// Marks the current query finished and returns the identity it replaced.
    pub fn finish(&mut self) -> QueryIdentity {
        let previous = self.identity;
        self.identity = QueryIdentity::FINISHED;
        self.advance_generation();
        previous
    }
}
