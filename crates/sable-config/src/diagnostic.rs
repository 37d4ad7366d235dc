// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Converts Figment deserialization errors into miette diagnostics with
//! source spans, the list of valid keys for the section, and a
//! Jaro-Winkler "did you mean?" suggestion.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity to offer a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(sable::config::unknown_key),
        help("{}", format_unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is similar enough.
        suggestion: Option<String>,
        /// Comma-separated valid keys for the section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(sable::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value is not one of the accepted variants (e.g. `search_type`).
    #[error("invalid value for key `{key}`: {detail}")]
    #[diagnostic(code(sable::config::invalid_value))]
    InvalidValue { key: String, detail: String },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(sable::config::missing_key),
        help("add `{key} = <value>` to your sable.toml")
    )]
    MissingKey { key: String },

    /// A semantic validation failure.
    #[error("validation error: {message}")]
    #[diagnostic(code(sable::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(sable::config::other))]
    Other(String),
}

fn format_unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();

    for error in err {
        let dotted_path = error
            .path
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");

        let config_error = match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let suggestion = suggest_key(field, &valid_keys);
                let (span, src) = find_source_span(&error, field, toml_sources);

                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion,
                    valid_keys: valid_keys.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: if dotted_path.is_empty() {
                    field.to_string()
                } else {
                    format!("{dotted_path}.{field}")
                },
            },
            Kind::InvalidType(actual, expected) => {
                let field = error.path.last().cloned().unwrap_or_default();
                let parent: Vec<String> = error
                    .path
                    .iter()
                    .take(error.path.len().saturating_sub(1))
                    .cloned()
                    .collect();
                let (span, src) = source_for(&error, toml_sources)
                    .and_then(|(path, content)| {
                        find_key_offset(content, &parent, &field).map(|offset| {
                            (
                                Some(SourceSpan::new(offset.into(), field.len())),
                                Some(NamedSource::new(path, content.to_string())),
                            )
                        })
                    })
                    .unwrap_or((None, None));

                ConfigError::InvalidType {
                    key: dotted_path,
                    detail: format!("found {actual}, expected {expected}"),
                    expected: expected.to_string(),
                    span,
                    src,
                }
            }
            Kind::UnknownVariant(actual, expected) => ConfigError::InvalidValue {
                key: dotted_path,
                detail: format!("`{actual}` is not one of: {}", expected.join(", ")),
            },
            _ => ConfigError::Other(format!("{error}")),
        };

        errors.push(config_error);
    }

    errors
}

/// The TOML file (path, content) an error originated from, if it was a file.
fn source_for<'a>(
    error: &figment::error::Error,
    toml_sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let source_path = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    match source_path {
        Some(path) => toml_sources
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(p, content)| (p.as_str(), content.as_str())),
        // Inline strings carry no file metadata; use the single inline source.
        None => match toml_sources {
            [(p, content)] if p == "<inline>" => Some((p.as_str(), content.as_str())),
            _ => None,
        },
    }
}

fn find_source_span(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if let Some((path, content)) = source_for(error, toml_sources) {
        // The path ends with the unknown field itself; its table is the rest.
        let mut section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
        if section.last().is_some_and(|last| last == field) {
            section.pop();
        }
        if let Some(offset) = find_key_offset(content, &section, field) {
            let span = SourceSpan::new(offset.into(), field.len());
            return (Some(span), Some(NamedSource::new(path, content.to_string())));
        }
    }
    (None, None)
}

/// Find the byte offset of `field` in TOML content, below the table header for `path`.
///
/// `path = ["knowledge", "vector_db"]` looks for `[knowledge.vector_db]`;
/// array-of-table headers (`[[team.members]]`) and numeric path segments are
/// handled by matching on the non-numeric segments. Top-level fields search
/// from the start of the file.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let table: Vec<&str> = path
        .iter()
        .map(String::as_str)
        .filter(|s| s.parse::<usize>().is_err())
        .collect();

    let search_start = if table.is_empty() {
        0
    } else {
        let name = table.join(".");
        let header = format!("[{name}]");
        let array_header = format!("[[{name}]]");
        content
            .find(&array_header)
            .map(|pos| pos + array_header.len())
            .or_else(|| content.find(&header).map(|pos| pos + header.len()))?
    };

    let remaining = &content[search_start..];
    let mut byte_offset = 0;
    for line in remaining.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(field)
            && (after.starts_with(' ') || after.starts_with('=') || after.starts_with('\t'))
        {
            let field_start_in_line = line.len() - trimmed.len();
            return Some(search_start + byte_offset + field_start_in_line);
        }
        byte_offset += line.len();
    }

    None
}

/// Suggest the most similar valid key above the similarity threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let mut best_score = SUGGESTION_THRESHOLD;
    let mut best_match = None;

    for &key in valid_keys {
        let score = strsim::jaro_winkler(unknown, key);
        if score > best_score {
            best_score = score;
            best_match = Some(key.to_string());
        }
    }

    best_match
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
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
    fn suggests_close_key() {
        let valid = &["table_name", "search_type", "uri", "embedder", "reranker"];
        assert_eq!(
            suggest_key("serch_type", valid),
            Some("search_type".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["name", "instructions", "markdown"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn offset_in_nested_table() {
        let content = "[knowledge]\nurls = []\n\n[knowledge.vector_db]\ntabel_name = \"docs\"\n";
        let path = vec!["knowledge".to_string(), "vector_db".to_string()];
        let o = find_key_offset(content, &path, "tabel_name").unwrap();
        assert_eq!(&content[o..o + 10], "tabel_name");
    }

    #[test]
    fn offset_in_array_of_tables() {
        let content = "[team]\nname = \"t\"\n\n[[team.members]]\nname = \"web\"\nrol = \"x\"\n";
        let path = vec!["team".to_string(), "members".to_string(), "0".to_string()];
        let o = find_key_offset(content, &path, "rol").unwrap();
        assert_eq!(&content[o..o + 3], "rol");
    }

    #[test]
    fn offset_handles_crlf_line_endings() {
        let content = "[agent]\r\nnaem = \"x\"\r\n";
        let path = vec!["agent".to_string()];
        let o = find_key_offset(content, &path, "naem").unwrap();
        assert_eq!(&content[o..o + 4], "naem");
    }
}
