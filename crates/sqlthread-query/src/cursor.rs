// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker-side cursor over a materialized result set.

use sqlthread_core::{Navigation, Position, QueryError, Row, RowSet};

/// Position bookkeeping for one executed statement. Owned by the worker.
#[derive(Debug)]
pub(crate) struct Cursor {
    rows: Vec<Row>,
    position: Position,
    forward_only: bool,
}

impl Cursor {
    pub(crate) fn new(set: RowSet, forward_only: bool) -> Self {
        Self {
            rows: set.rows,
            position: Position::BeforeFirst,
            forward_only,
        }
    }

    pub(crate) fn position(&self) -> Position {
        self.position
    }

    /// Row under the cursor, if it sits on one.
    pub(crate) fn current(&self) -> Option<&Row> {
        match self.position {
            Position::At(idx) => self.rows.get(idx),
            _ => None,
        }
    }

    /// Moves the cursor. Positions past either end park it at
    /// `BeforeFirst` / `AfterLast`.
    pub(crate) fn navigate(&mut self, nav: Navigation) -> Result<Position, QueryError> {
        let len = self.rows.len() as i64;
        let target = match nav {
            Navigation::First => 0,
            Navigation::Next => self.index() + 1,
            Navigation::Previous => self.index() - 1,
            Navigation::Last => len - 1,
            Navigation::Seek { index, relative } => {
                if relative {
                    self.index().saturating_add(index)
                } else {
                    index
                }
            }
        };
        self.move_to(target)
    }

    /// Next `count` rows after the current position. A zero count leaves
    /// the cursor where it is.
    pub(crate) fn fetch_some(&mut self, count: usize) -> Vec<Row> {
        if count == 0 {
            return Vec::new();
        }
        let start = (self.index() + 1).max(0) as usize;
        if start >= self.rows.len() {
            self.position = Position::AfterLast;
            return Vec::new();
        }
        let end = start.saturating_add(count).min(self.rows.len());
        self.position = Position::At(end - 1);
        self.rows[start..end].to_vec()
    }

    /// Every row after the current position; leaves the cursor after the last row.
    pub(crate) fn fetch_all(&mut self) -> Vec<Row> {
        let start = (self.index() + 1).max(0) as usize;
        let rows = self.rows.get(start..).unwrap_or_default().to_vec();
        self.position = Position::AfterLast;
        rows
    }

    /// Numeric index: -1 before the first row, `len` after the last.
    fn index(&self) -> i64 {
        match self.position {
            Position::BeforeFirst => -1,
            Position::At(idx) => idx as i64,
            Position::AfterLast => self.rows.len() as i64,
        }
    }

    fn move_to(&mut self, target: i64) -> Result<Position, QueryError> {
        if self.forward_only && target < self.index() {
            return Err(QueryError::driver(format!(
                "cursor is forward-only: cannot move from {} back to {target}",
                self.position
            )));
        }
        let len = self.rows.len() as i64;
        self.position = if target < 0 {
            Position::BeforeFirst
        } else if target >= len {
            Position::AfterLast
        } else {
            Position::At(target as usize)
        };
        Ok(self.position)
    }
}
