// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages exchanged between the façade and its worker.
//!
//! The façade sends [`Command`]s on the worker's inbound queue; the worker
//! answers with [`QueryEvent`]s on the outbound queue.

use std::fmt;

use crate::error::QueryError;
use crate::identity::QueryIdentity;
use crate::types::{BatchMode, ParamDirection, Position, PrecisionPolicy, Row, Value};

/// Cursor movement requested by a navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    First,
    Next,
    Previous,
    Last,
    Seek { index: i64, relative: bool },
}

/// One operation for the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Prepare {
        text: String,
    },
    /// `None` runs the prepared statement with the worker's bindings.
    Execute {
        text: Option<String>,
    },
    ExecuteBatch {
        mode: BatchMode,
    },
    BindValue {
        placeholder: String,
        value: Value,
        direction: ParamDirection,
    },
    SetForwardOnly(bool),
    SetPrecisionPolicy(PrecisionPolicy),
    Navigate(Navigation),
    FetchAll,
    FetchSome {
        count: usize,
    },
    FetchOne,
    Finish,
    Clear,
    Transaction,
    Commit,
    Rollback,
}

impl CommandKind {
    /// Stable label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            CommandKind::Prepare { .. } => "prepare",
            CommandKind::Execute { .. } => "execute",
            CommandKind::ExecuteBatch { .. } => "execute_batch",
            CommandKind::BindValue { .. } => "bind_value",
            CommandKind::SetForwardOnly(_) => "set_forward_only",
            CommandKind::SetPrecisionPolicy(_) => "set_precision_policy",
            CommandKind::Navigate(Navigation::First) => "first",
            CommandKind::Navigate(Navigation::Next) => "next",
            CommandKind::Navigate(Navigation::Previous) => "previous",
            CommandKind::Navigate(Navigation::Last) => "last",
            CommandKind::Navigate(Navigation::Seek { .. }) => "seek",
            CommandKind::FetchAll => "fetch_all",
            CommandKind::FetchSome { .. } => "fetch_some",
            CommandKind::FetchOne => "fetch_one",
            CommandKind::Finish => "finish",
            CommandKind::Clear => "clear",
            CommandKind::Transaction => "transaction",
            CommandKind::Commit => "commit",
            CommandKind::Rollback => "rollback",
        }
    }
}

/// A command stamped with the identities that were current when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Caller-visible identity the resulting events are tagged with.
    pub identity: QueryIdentity,
    /// Worker bookkeeping identity, re-minted on prepare, finish and clear.
    pub generation: QueryIdentity,
    pub kind: CommandKind,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.kind.label(), self.identity)
    }
}

/// Asynchronous outcome of one executed command.
#[derive(Debug, Clone)]
pub enum QueryEvent {
    Prepared {
        identity: QueryIdentity,
    },
    Executed {
        identity: QueryIdentity,
        rows_affected: u64,
        has_rows: bool,
    },
    PositionChanged {
        identity: QueryIdentity,
        position: Position,
    },
    RowsReady {
        identity: QueryIdentity,
        rows: Vec<Row>,
    },
    RowReady {
        identity: QueryIdentity,
        row: Row,
    },
    Failed {
        identity: QueryIdentity,
        error: QueryError,
    },
}

impl QueryEvent {
    /// Identity of the query the producing command was issued for.
    pub fn identity(&self) -> QueryIdentity {
        match self {
            QueryEvent::Prepared { identity }
            | QueryEvent::Executed { identity, .. }
            | QueryEvent::PositionChanged { identity, .. }
            | QueryEvent::RowsReady { identity, .. }
            | QueryEvent::RowReady { identity, .. }
            | QueryEvent::Failed { identity, .. } => *identity,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, QueryEvent::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueryEvent::Prepared { .. } => "prepared",
            QueryEvent::Executed { .. } => "executed",
            QueryEvent::PositionChanged { .. } => "position_changed",
            QueryEvent::RowsReady { .. } => "rows_ready",
            QueryEvent::RowReady { .. } => "row_ready",
            QueryEvent::Failed { .. } => "failed",
        }
    }
}
