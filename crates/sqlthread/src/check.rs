// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sqlthread check`: report the effective configuration.
//!
//! Loading and validation already happened in `main`; diagnostics for an
//! invalid file are rendered there. This reports what was loaded and whether
//! the configured driver is compiled in.

use std::path::Path;
use std::process::ExitCode;

use sqlthread_config::SqlthreadConfig;

use crate::run::default_registry;

pub fn check(config: &SqlthreadConfig, path: Option<&Path>) -> ExitCode {
    let registry = default_registry();
    let report = summary(config, path);
    print!("{report}");

    match registry.get(&config.connection.driver) {
        Ok(_) => {
            println!("configuration ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("sqlthread: {err}");
            ExitCode::FAILURE
        }
    }
}

fn summary(config: &SqlthreadConfig, path: Option<&Path>) -> String {
    let source = path.map_or_else(
        || "XDG hierarchy and SQLTHREAD_* environment".to_string(),
        |p| p.display().to_string(),
    );
    let connection = &config.connection;
    format!(
        "source:          {source}\n\
         driver:          {}\n\
         database:        {}\n\
         forward_only:    {}\n\
         precision:       {}\n\
         worker thread:   {}\n\
         relay thread:    {}\n\
         log level:       {}\n",
        connection.driver,
        connection.database,
        config.query.forward_only,
        config.query.precision_policy,
        config.worker.thread_name,
        config.worker.relay_thread_name,
        config.logging.level,
    )
}
