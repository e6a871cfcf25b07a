// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sqlthread run`: execute one statement and stream its rows as JSON lines.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use thiserror::Error;
use tracing::{debug, error, info};

use sqlthread_config::SqlthreadConfig;
use sqlthread_core::{PrecisionPolicy, QueryError, QueryEvent, Row};
use sqlthread_query::{DriverRegistry, QueryBuilder};
use sqlthread_sqlite::SqliteDriver;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// SQL statement to execute.
    pub sql: String,

    /// Database to open, overriding `connection.database`.
    #[arg(long, value_name = "PATH")]
    pub database: Option<String>,

    /// Restrict the cursor to forward movement.
    #[arg(long)]
    pub forward_only: bool,

    /// Numeric precision policy: low_precision_double, exact_string or exact_int64.
    #[arg(long, value_name = "POLICY")]
    pub precision: Option<PrecisionPolicy>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Drivers compiled into the binary.
pub fn default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(SqliteDriver::new()));
    registry
}

pub async fn run(config: SqlthreadConfig, args: RunArgs) -> ExitCode {
    let stdout = io::stdout();
    match execute(config, args, &mut stdout.lock()).await {
        Ok(rows) => {
            info!(rows, "statement finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "statement failed");
            eprintln!("sqlthread: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs `args.sql` as the initial query and writes every returned row to
/// `out`. Returns the number of rows written.
pub async fn execute<W: Write>(
    mut config: SqlthreadConfig,
    args: RunArgs,
    out: &mut W,
) -> Result<usize, RunError> {
    if let Some(database) = args.database {
        config.connection.database = database;
    }
    if args.forward_only {
        config.query.forward_only = true;
    }
    if let Some(precision) = args.precision {
        config.query.precision_policy = precision;
    }
    config.query.initial_query = Some(args.sql);

    let registry = default_registry();
    let (query, mut events) = QueryBuilder::from_config(&registry, &config)?
        .build_with_events()?;
    let identity = query.identity();
    debug!(%identity, database = %config.connection.database, "running statement");

    let mut written = 0;
    let outcome = loop {
        let Some(event) = events.recv().await else {
            break Err(QueryError::WorkerStopped.into());
        };
        match event {
            QueryEvent::Failed { error, .. } => break Err(error.into()),
            QueryEvent::Executed {
                rows_affected,
                has_rows: false,
                ..
            } => {
                debug!(rows_affected, "statement returned no result set");
            }
            QueryEvent::RowsReady { identity: id, rows } if id == identity => {
                written += write_rows(out, &rows)?;
                break Ok(written);
            }
            other => debug!(event = other.label(), "ignoring event"),
        }
    };

    query.close();
    outcome
}

fn write_rows<W: Write>(out: &mut W, rows: &[Row]) -> Result<usize, RunError> {
    for row in rows {
        serde_json::to_writer(&mut *out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use sqlthread_core::Value;

    use super::*;

    fn args(sql: &str) -> RunArgs {
        RunArgs {
            sql: sql.to_string(),
            database: None,
            forward_only: false,
            precision: None,
        }
    }

    async fn run_default(run_args: RunArgs) -> (Result<usize, RunError>, Vec<u8>) {
        let mut out = Vec::new();
        let result = execute(SqlthreadConfig::default(), run_args, &mut out).await;
        (result, out)
    }

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn select_one_prints_one_line() {
        let (rows, out) = run_default(args("SELECT 1 AS one")).await;

        assert_eq!(rows.unwrap(), 1);
        assert_eq!(lines(&out), vec![serde_json::json!({ "one": 1 })]);
    }

    #[tokio::test]
    async fn precision_flag_reaches_the_driver() {
        let mut run_args = args("SELECT 2.5 AS x");
        run_args.precision = Some(PrecisionPolicy::ExactString);
        let (rows, out) = run_default(run_args).await;

        rows.unwrap();
        assert_eq!(lines(&out), vec![serde_json::json!({ "x": "2.5" })]);
    }

    #[tokio::test]
    async fn statements_without_rows_print_nothing() {
        let (rows, out) = run_default(args("CREATE TABLE t (id INTEGER)")).await;
        assert_eq!(rows.unwrap(), 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn driver_failure_is_returned() {
        let (result, _) = run_default(args("SELECT * FROM missing")).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RunError::Query(QueryError::Driver { .. })));
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn unknown_driver_fails_before_starting() {
        let mut config = SqlthreadConfig::default();
        config.connection.driver = "oracle".into();
        let err = execute(config, args("SELECT 1"), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Query(QueryError::Config(_))));
    }

    #[test]
    fn rows_serialize_as_objects() {
        let set = sqlthread_core::RowSet::from_rows(
            vec!["id".into(), "name".into()],
            vec![vec![Value::Integer(1), Value::from("a")]],
        );
        let mut out = Vec::new();
        write_rows(&mut out, &set.rows).unwrap();
        let expected = serde_json::json!({ "id": 1, "name": "a" });
        assert_eq!(lines(&out), vec![expected]);
    }
}
