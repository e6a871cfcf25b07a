// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversions between sqlthread values and SQLite storage classes.

use rusqlite::Statement;
use rusqlite::types::{Value as SqlValue, ValueRef};

use sqlthread_core::{QueryError, Value};

/// Prefixes SQLite accepts for named parameters.
const NAMED_PREFIXES: [char; 3] = [':', '@', '$'];

/// Converts a bound value into an owned SQLite value.
///
/// Booleans are stored as 0/1. Lists are only meaningful for batch
/// execution, where they are split before reaching the driver.
pub fn to_sql(value: &Value) -> Result<SqlValue, QueryError> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
        Value::List(_) => {
            return Err(QueryError::driver(
                "list values can only be bound for batch execution",
            ));
        }
    })
}

/// Reads one column of a result row.
pub fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Resolves a placeholder name to its 1-based parameter index.
///
/// Accepts `:name`, `@name`, `$name`, positional `?N` and bare `N`. A bare
/// `name` is looked up under each named prefix in turn.
pub fn parameter_index(
    stmt: &Statement<'_>,
    placeholder: &str,
) -> Result<Option<usize>, QueryError> {
    let positional = placeholder.strip_prefix('?').unwrap_or(placeholder);
    if let Ok(position) = positional.parse::<usize>() {
        let in_range = position >= 1 && position <= stmt.parameter_count();
        return Ok(in_range.then_some(position));
    }

    if placeholder.starts_with(NAMED_PREFIXES) {
        return lookup(stmt, placeholder);
    }

    for prefix in NAMED_PREFIXES {
        if let Some(idx) = lookup(stmt, &format!("{prefix}{placeholder}"))? {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

fn lookup(stmt: &Statement<'_>, name: &str) -> Result<Option<usize>, QueryError> {
    stmt.parameter_index(name)
        .map_err(|e| QueryError::driver_with(format!("invalid placeholder {name}"), e))
}
