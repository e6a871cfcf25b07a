// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! rusqlite-backed [`Driver`] and [`Connection`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::OpenFlags;
use tracing::{debug, info};

use sqlthread_core::{
    Bindings, Connection, ConnectionSpec, Driver, ParamDirection, QueryError, QueryOptions, Row,
    RowSet,
};

use crate::convert;

const BUSY_TIMEOUT_MS: u64 = 5_000;
const STATEMENT_CACHE_CAPACITY: usize = 32;
pub const MEMORY_DATABASE: &str = ":memory:";

/// Opens SQLite databases by file path, or in memory for `:memory:`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn connect(&self, spec: &ConnectionSpec) -> Result<Box<dyn Connection>, QueryError> {
        Ok(Box::new(SqliteConnection::open(spec)?))
    }
}

/// One open SQLite connection. Lives on the worker thread.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn open(spec: &ConnectionSpec) -> Result<Self, QueryError> {
        if spec.host.is_some() || spec.port.is_some() || spec.user.is_some() {
            debug!("sqlite ignores host, port and user settings");
        }

        let conn = if spec.database == MEMORY_DATABASE {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open_with_flags(
                Path::new(&spec.database),
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )
        }
        .map_err(|e| {
            QueryError::connection_with(format!("failed to open {}", spec.database), e)
        })?;

        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
            .map_err(|e| QueryError::connection_with("failed to set busy timeout", e))?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        info!(database = %spec.database, "sqlite connection opened");
        Ok(Self { conn })
    }

    fn run(
        &mut self,
        text: &str,
        bindings: &Bindings,
        options: &QueryOptions,
    ) -> Result<RowSet, QueryError> {
        let mut stmt = self.conn.prepare_cached(text).map_err(driver_error)?;

        for (placeholder, bound) in bindings {
            if bound.direction == ParamDirection::Out {
                debug!(%placeholder, "sqlite has no output parameters, binding skipped");
                continue;
            }
            let Some(idx) = convert::parameter_index(&stmt, placeholder)? else {
                return Err(QueryError::driver(format!(
                    "statement has no placeholder {placeholder}"
                )));
            };
            let value = convert::to_sql(&bound.value)?;
            stmt.raw_bind_parameter(idx, value).map_err(driver_error)?;
        }

        let column_count = stmt.column_count();
        if column_count == 0 {
            let changed = stmt.raw_execute().map_err(driver_error)?;
            return Ok(RowSet::affected(changed as u64));
        }

        let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = Vec::new();
        let mut cursor = stmt.raw_query();
        while let Some(row) = cursor.next().map_err(driver_error)? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get_ref(i).map_err(driver_error)?;
                values.push(options.precision.apply(convert::from_sql(value)));
            }
            rows.push(Row::new(Arc::clone(&columns), values));
        }

        Ok(RowSet {
            columns,
            rows,
            rows_affected: 0,
            has_rows: true,
        })
    }
}

impl Connection for SqliteConnection {
    fn prepare(&mut self, text: &str) -> Result<(), QueryError> {
        self.conn.prepare_cached(text).map_err(driver_error)?;
        Ok(())
    }

    fn execute(
        &mut self,
        text: &str,
        bindings: &Bindings,
        options: &QueryOptions,
    ) -> Result<RowSet, QueryError> {
        self.run(text, bindings, options)
    }

    fn begin_transaction(&mut self) -> Result<(), QueryError> {
        self.conn.execute_batch("BEGIN").map_err(driver_error)
    }

    fn commit(&mut self) -> Result<(), QueryError> {
        self.conn.execute_batch("COMMIT").map_err(driver_error)
    }

    fn rollback(&mut self) -> Result<(), QueryError> {
        self.conn.execute_batch("ROLLBACK").map_err(driver_error)
    }
}

fn driver_error(e: rusqlite::Error) -> QueryError {
    QueryError::driver_with(e.to_string(), e)
}

#[cfg(test)]
mod tests {
    use sqlthread_core::{BoundValue, PrecisionPolicy, Value};
    use tempfile::tempdir;

    use super::*;

    fn memory() -> SqliteConnection {
        SqliteConnection::open(&ConnectionSpec::new("sqlite", MEMORY_DATABASE)).unwrap()
    }

    fn exec(conn: &mut dyn Connection, sql: &str) -> RowSet {
        conn.execute(sql, &Bindings::new(), &QueryOptions::default())
            .unwrap()
    }

    fn bind(pairs: &[(&str, Value)]) -> Bindings {
        pairs
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    BoundValue {
                        value: value.clone(),
                        direction: ParamDirection::In,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn select_one() {
        let mut conn = memory();
        let set = exec(&mut conn, "SELECT 1 AS one");
        assert!(set.has_rows);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.rows[0].get_by_name("one"), Some(&Value::Integer(1)));
    }

    #[test]
    fn named_bindings_and_rows_affected() {
        let mut conn = memory();
        let opts = QueryOptions::default();
        exec(&mut conn, "CREATE TABLE t (id INTEGER, name TEXT)");

        let insert = "INSERT INTO t VALUES (:id, :name)";
        conn.prepare(insert).unwrap();
        for (id, name) in [(1, "a"), (2, "b")] {
            let bindings = bind(&[(":id", id.into()), ("name", name.into())]);
            let set = conn.execute(insert, &bindings, &opts).unwrap();
            assert_eq!(set.rows_affected, 1);
            assert!(!set.has_rows);
        }

        let select = "SELECT name FROM t WHERE id = ?1";
        let bindings = bind(&[("?1", 2.into())]);
        let set = conn.execute(select, &bindings, &opts).unwrap();
        assert_eq!(set.rows[0].get(0), Some(&Value::from("b")));
    }

    #[test]
    fn unknown_placeholder_is_a_driver_error() {
        let mut conn = memory();
        let bindings = bind(&[(":b", 1.into())]);
        let err = conn
            .execute("SELECT :a", &bindings, &QueryOptions::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::Driver { .. }));
        assert!(err.to_string().contains(":b"));
    }

    #[test]
    fn output_parameters_are_skipped() {
        let mut conn = memory();
        let mut bindings = bind(&[(":a", 1.into())]);
        bindings.insert(
            ":out".into(),
            BoundValue {
                value: Value::Null,
                direction: ParamDirection::Out,
            },
        );
        let set = conn
            .execute("SELECT :a", &bindings, &QueryOptions::default())
            .unwrap();
        assert_eq!(set.rows[0].get(0), Some(&Value::Integer(1)));
    }

    #[test]
    fn precision_policy_applies_to_numbers() {
        let mut conn = memory();
        let opts = QueryOptions {
            precision: PrecisionPolicy::ExactString,
            ..QueryOptions::default()
        };
        let set = conn
            .execute("SELECT 42, 1.5, 'x'", &Bindings::new(), &opts)
            .unwrap();
        let row = &set.rows[0];
        assert_eq!(row.get(0), Some(&Value::from("42")));
        assert_eq!(row.get(1), Some(&Value::from("1.5")));
        assert_eq!(row.get(2), Some(&Value::from("x")));
    }

    #[test]
    fn syntax_errors_fail_prepare() {
        let mut conn = memory();
        assert!(conn.prepare("SELEC 1").is_err());
    }

    #[test]
    fn rollback_discards_changes() {
        let mut conn = memory();
        exec(&mut conn, "CREATE TABLE t (id INTEGER)");

        conn.begin_transaction().unwrap();
        exec(&mut conn, "INSERT INTO t VALUES (1)");
        conn.rollback().unwrap();

        let set = exec(&mut conn, "SELECT COUNT(*) FROM t");
        assert_eq!(set.rows[0].get(0), Some(&Value::Integer(0)));
        assert!(conn.commit().is_err(), "no transaction is open");
    }

    #[test]
    fn file_database_persists_between_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("persist.db");
        let spec = ConnectionSpec::new("sqlite", path.to_str().unwrap());

        let mut first = SqliteDriver.connect(&spec).unwrap();
        exec(first.as_mut(), "CREATE TABLE t (v TEXT)");
        exec(first.as_mut(), "INSERT INTO t VALUES ('kept')");
        drop(first);

        let mut second = SqliteDriver.connect(&spec).unwrap();
        let set = exec(second.as_mut(), "SELECT v FROM t");
        assert_eq!(set.rows[0].get(0), Some(&Value::from("kept")));
    }

    #[test]
    fn unopenable_path_is_a_connection_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("nested.db");
        let spec = ConnectionSpec::new("sqlite", path.to_str().unwrap());
        let err = SqliteDriver.connect(&spec).err().unwrap();
        assert!(err.is_connection());
    }
}
