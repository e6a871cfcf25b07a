// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! sqlthread - run SQL through a thread-backed query worker.
//!
//! This is the binary entry point.

mod check;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use sqlthread_config::{ConfigError, SqlthreadConfig};

/// sqlthread - run SQL through a thread-backed query worker.
#[derive(Parser, Debug)]
#[command(name = "sqlthread", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one statement and print each row as a JSON line.
    Run(run::RunArgs),
    /// Load and validate the configuration.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            sqlthread_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging.level);
    sqlthread_query::metrics::register_metrics();

    match cli.command {
        Commands::Run(args) => run::run(config, args).await,
        Commands::Check => check::check(&config, cli.config.as_deref()),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<SqlthreadConfig, Vec<ConfigError>> {
    match path {
        Some(path) => sqlthread_config::load_and_validate_path(path),
        None => sqlthread_config::load_and_validate(),
    }
}

/// Logs go to stderr so stdout carries only result rows.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sqlthread={log_level},sqlthread_query={log_level},sqlthread_sqlite={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_flags() {
        let cli = Cli::try_parse_from([
            "sqlthread",
            "run",
            "SELECT 1",
            "--database",
            "x.db",
            "--forward-only",
            "--precision",
            "exact_string",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.sql, "SELECT 1");
                assert_eq!(args.database.as_deref(), Some("x.db"));
                assert!(args.forward_only);
                assert_eq!(
                    args.precision,
                    Some(sqlthread_core::PrecisionPolicy::ExactString)
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_precision_is_rejected() {
        let args = ["sqlthread", "run", "SELECT 1", "--precision", "huge"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
