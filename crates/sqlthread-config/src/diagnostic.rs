// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Turns figment extraction errors into miette diagnostics that point at the
//! offending line of the TOML file and suggest the closest valid key or value
//! (Jaro-Winkler similarity).

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use sqlthread_core::QueryError;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
/// Catches typos like `databse` -> `database` and `forwrd_only` -> `forward_only`.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with enough context for an annotated report.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(sqlthread::config::unknown_key),
        help("{}", did_you_mean(suggestion.as_deref(), "keys", valid))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys valid in the same section.
        valid: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A string that must name one of a fixed set, like `precision_policy`.
    #[error("unknown value `{value}` for `{key}`")]
    #[diagnostic(
        code(sqlthread::config::unknown_value),
        help("{}", did_you_mean(suggestion.as_deref(), "values", valid))
    )]
    UnknownValue {
        key: String,
        value: String,
        suggestion: Option<String>,
        valid: String,
        #[label("not a valid value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: found {found}")]
    #[diagnostic(code(sqlthread::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(sqlthread::config::missing_key),
        help("add `{key} = <value>` to your sqlthread.toml")
    )]
    MissingKey { key: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(sqlthread::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(sqlthread::config::other))]
    Other(String),
}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::Config(err.to_string())
    }
}

fn did_you_mean(suggestion: Option<&str>, what: &str, valid: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid {what}: {valid}"),
        None => format!("valid {what}: {valid}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into
/// diagnostics, one per error.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    let dotted = section.join(".");

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, &section, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                valid: expected.join(", "),
                span,
                src,
            }
        }
        Kind::UnknownVariant(value, expected) => {
            // The path ends at the field holding the bad value.
            let (parent, field) = split_last(&section);
            let (span, src) = locate(error, parent, field, toml_sources);
            ConfigError::UnknownValue {
                key: dotted,
                value: value.clone(),
                suggestion: suggest_key(value, expected),
                valid: expected.join(", "),
                span,
                src,
            }
        }
        Kind::InvalidType(found, expected) => {
            let (parent, field) = split_last(&section);
            let (span, src) = locate(error, parent, field, toml_sources);
            ConfigError::InvalidType {
                key: dotted,
                found: found.to_string(),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: if dotted.is_empty() {
                field.to_string()
            } else {
                format!("{dotted}.{field}")
            },
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn split_last(path: &[String]) -> (&[String], &str) {
    match path.split_last() {
        Some((last, parent)) => (parent, last.as_str()),
        None => (path, ""),
    }
}

/// Finds the span of `field` under `section` in the file the error came from.
fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if field.is_empty() {
        return (None, None);
    }
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings have no file source; fall back to the only source given.
    let source = origin
        .and_then(|path| toml_sources.iter().find(|(p, _)| *p == path))
        .or_else(|| match toml_sources {
            [only] => Some(only),
            _ => None,
        });

    let Some((path, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Find the byte offset of a key in TOML content, relative to a section path.
///
/// For `path = ["worker"]` and `field = "thread_nme"`, finds the `[worker]`
/// header then searches for `thread_nme` after it, stopping at the next
/// section header. Top-level fields are searched from the start.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if !path.is_empty() && trimmed.starts_with('[') {
            break;
        }
        if let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Suggest a similar key name using Jaro-Winkler string similarity.
///
/// Returns the best match above the similarity threshold, or `None` if
/// no candidate is close enough.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|&candidate| (strsim::jaro_winkler(unknown, candidate), candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_section_keys() {
        let valid = &["driver", "database", "host", "port", "user", "password"];
        assert_eq!(suggest_key("databse", valid), Some("database".to_string()));
        assert_eq!(suggest_key("pasword", valid), Some("password".to_string()));
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["forward_only", "precision_policy", "initial_query"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn find_key_offset_in_section() {
        let content = "[query]\nforward_only = true\n\n[worker]\nthread_nme = \"w\"\n";
        let path = vec!["worker".to_string()];
        let o = find_key_offset(content, &path, "thread_nme").unwrap();
        assert_eq!(&content[o..o + 10], "thread_nme");
    }

    #[test]
    fn find_key_offset_stays_inside_section() {
        let content = "[query]\nforward_only = true\n\n[worker]\nlevel = \"x\"\n";
        let path = vec!["query".to_string()];
        assert_eq!(find_key_offset(content, &path, "level"), None);
    }

    #[test]
    fn converts_into_query_error() {
        let err: QueryError = ConfigError::Validation {
            message: "connection.database must not be empty".into(),
        }
        .into();
        assert!(matches!(err, QueryError::Config(_)));
        assert!(err.to_string().contains("connection.database"));
    }
}
