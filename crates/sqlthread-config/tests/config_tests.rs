// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the sqlthread configuration system.

use std::io::Write;

use serial_test::serial;

use sqlthread_config::diagnostic::{ConfigError, figment_to_config_errors};
use sqlthread_config::model::SqlthreadConfig;
use sqlthread_config::{
    load_and_validate_path, load_and_validate_str, load_config_from_path, load_config_from_str,
};
use sqlthread_core::PrecisionPolicy;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_sqlthread_config() {
    let toml = r#"
[connection]
driver = "sqlite"
database = "/tmp/orders.db"
host = "localhost"
port = 5432
user = "app"
password = "secret"

[query]
forward_only = true
precision_policy = "exact_string"
initial_query = "SELECT 1"

[worker]
thread_name = "orders-worker"
relay_thread_name = "orders-relay"

[logging]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.connection.database, "/tmp/orders.db");
    assert_eq!(config.connection.port, Some(5432));
    assert_eq!(config.connection.password.as_deref(), Some("secret"));
    assert!(config.query.forward_only);
    assert_eq!(config.query.precision_policy, PrecisionPolicy::ExactString);
    assert_eq!(config.query.initial_query.as_deref(), Some("SELECT 1"));
    assert_eq!(config.worker.thread_name, "orders-worker");
    assert_eq!(config.worker.relay_thread_name, "orders-relay");
    assert_eq!(config.logging.level, "debug");
}

/// Sections that are left out fall back to their defaults.
#[test]
fn missing_sections_use_defaults() {
    let toml = r#"
[connection]
database = "data.db"
"#;

    let config = load_config_from_str(toml).expect("partial config should parse");
    assert_eq!(config.connection.driver, "sqlite");
    assert_eq!(config.connection.database, "data.db");
    assert!(config.connection.host.is_none());
    assert_eq!(config.worker.thread_name, "sqlthread-worker");
    assert_eq!(config.logging.level, "info");
}

/// Unknown keys are rejected with a suggestion for the closest valid key.
#[test]
fn unknown_key_suggests_correction() {
    let toml = r#"
[connection]
databse = "x.db"
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key,
                suggestion,
                valid,
                span,
                ..
            } => Some((key, suggestion, valid, span)),
            _ => None,
        })
        .expect("should report an unknown key");

    assert_eq!(unknown.0, "databse");
    assert_eq!(unknown.1.as_deref(), Some("database"));
    assert!(unknown.2.contains("driver"));
    assert!(unknown.3.is_some(), "inline source should yield a span");
}

/// Unknown top-level sections are rejected by deny_unknown_fields.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[storage]
path = "x"
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    assert!(format!("{err}").contains("storage"));
}

/// A misspelled precision policy names the valid choices.
#[test]
fn unknown_precision_policy_lists_values() {
    let toml = r#"
[query]
precision_policy = "exact_strng"
"#;

    let errors = load_and_validate_str(toml).expect_err("bad policy should be rejected");
    match &errors[..] {
        [
            ConfigError::UnknownValue {
                value,
                suggestion,
                valid,
                ..
            },
        ] => {
            assert_eq!(value, "exact_strng");
            assert_eq!(suggestion.as_deref(), Some("exact_string"));
            assert!(valid.contains("low_precision_double"));
        }
        other => panic!("expected one unknown value error, got {other:?}"),
    }
}

/// A value of the wrong type is reported with its dotted key.
#[test]
fn invalid_type_names_the_key() {
    let toml = r#"
[query]
forward_only = "yes"
"#;

    let err = load_config_from_str(toml).expect_err("string for bool should fail");
    let errors = figment_to_config_errors(err, &[("<inline>".into(), toml.into())]);
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidType { key, span: Some(_), .. } if key == "query.forward_only"
        )),
        "got {errors:?}"
    );
}

/// Validation collects every semantic error rather than failing fast.
#[test]
fn validation_collects_all_errors() {
    let toml = r#"
[connection]
database = ""
port = 0

[logging]
level = "verbose"
"#;

    let errors = load_and_validate_str(toml).expect_err("invalid values should fail");
    let messages: Vec<String> = errors
        .iter()
        .filter_map(|e| match e {
            ConfigError::Validation { message } => Some(message.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(messages.len(), 3, "got {messages:?}");
    assert!(messages.iter().any(|m| m.contains("connection.database")));
    assert!(messages.iter().any(|m| m.contains("connection.port")));
    assert!(messages.iter().any(|m| m.contains("logging.level")));
}

/// Diagnostics render through miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "forwrd_only".to_string(),
        suggestion: Some("forward_only".to_string()),
        valid: "forward_only, precision_policy, initial_query".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("should have help").to_string();
    assert!(help.contains("did you mean `forward_only`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("forwrd_only"));
}

/// Missing config files are silently skipped.
#[test]
#[serial]
fn missing_config_file_yields_defaults() {
    let config = load_config_from_path(std::path::Path::new("/nonexistent/sqlthread.toml"))
        .expect("missing file should be skipped");
    assert_eq!(config.connection.database, SqlthreadConfig::default().connection.database);
}

/// `SQLTHREAD_*` variables override file values, splitting only at the section.
#[test]
#[serial]
fn env_vars_override_file_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[connection]\ndatabase = \"from-file.db\"\n\n[worker]\nrelay_thread_name = \"file-relay\""
    )
    .unwrap();

    // SAFETY: tests touching the environment run serially.
    unsafe {
        std::env::set_var("SQLTHREAD_CONNECTION_DATABASE", "from-env.db");
        std::env::set_var("SQLTHREAD_WORKER_RELAY_THREAD_NAME", "env-relay");
    }
    let config = load_and_validate_path(file.path());
    unsafe {
        std::env::remove_var("SQLTHREAD_CONNECTION_DATABASE");
        std::env::remove_var("SQLTHREAD_WORKER_RELAY_THREAD_NAME");
    }

    let config = config.expect("env overrides should validate");
    assert_eq!(config.connection.database, "from-env.db");
    assert_eq!(config.worker.relay_thread_name, "env-relay");
}

/// Errors in an explicit file point into that file.
#[test]
#[serial]
fn file_errors_carry_source_spans() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[worker]\nthread_nme = \"w\"").unwrap();

    let errors = load_and_validate_path(file.path()).expect_err("typo should be rejected");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { span: Some(_), src: Some(_), suggestion: Some(s), .. }
            if s == "thread_name"
    )));
}
