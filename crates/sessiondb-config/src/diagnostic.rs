// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config diagnostics.
//!
//! Every section is `deny_unknown_fields` and every field has a default, so
//! loading can only fail on an unrecognized key, a value of the wrong type,
//! or unparsable TOML. Unknown keys are matched against the fields of their
//! section (`storage`, `storage.pool`, `logging`, `report`) and the closest
//! one is offered as a fix.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a field name must beat to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A problem found while loading or validating configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {section}")]
    #[diagnostic(
        code(sessiondb::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), fields))
    )]
    UnknownKey {
        /// Dotted section path, or `the top level`.
        section: String,
        key: String,
        suggestion: Option<String>,
        fields: String,
        #[label("not a field of this section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` expects {expected}, found {found}")]
    #[diagnostic(code(sessiondb::config::invalid_value))]
    InvalidValue {
        key: String,
        found: String,
        expected: String,
    },

    /// A value that parsed but breaks a constraint (see `validation`).
    #[error("{message}")]
    #[diagnostic(code(sessiondb::config::validation))]
    Validation { message: String },

    /// Malformed TOML or an environment override that could not be read.
    #[error("could not read configuration: {0}")]
    #[diagnostic(code(sessiondb::config::unreadable))]
    Unreadable(String),
}

fn unknown_key_help(suggestion: Option<&str>, fields: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? (fields: {fields})"),
        None => format!("fields: {fields}"),
    }
}

/// Turn a figment failure into diagnostics.
///
/// `sources` pairs a file name with its contents; when the failing key can be
/// found in one of them, the diagnostic points at it.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(key, expected) => {
                let (span, src) = locate(&error, key, sources);
                ConfigError::UnknownKey {
                    section: if error.path.is_empty() {
                        "the top level".to_string()
                    } else {
                        format!("[{}]", error.path.join("."))
                    },
                    key: key.clone(),
                    suggestion: suggest_key(key, expected),
                    fields: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::InvalidType(found, expected) => ConfigError::InvalidValue {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.clone(),
            },
            _ => ConfigError::Unreadable(error.to_string()),
        })
        .collect()
}

/// The closest field name, if any is close enough.
pub fn suggest_key(unknown: &str, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .map(|f| (strsim::jaro_winkler(unknown, f), *f))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, f)| f.to_string())
}

fn locate(
    error: &figment::error::Error,
    key: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let source = match file {
        Some(file) => sources.iter().find(|(name, _)| *name == file),
        // Inline strings carry no file name.
        None if sources.len() == 1 => sources.first(),
        None => None,
    };
    source
        .and_then(|(name, content)| {
            let offset = key_offset(content, &error.path.join("."), key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key = ...` inside the `[section]` table (`""` for the top level).
fn key_offset(content: &str, section: &str, key: &str) -> Option<usize> {
    let mut current = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = header.trim().to_string();
        } else if current == section
            && let Some((name, _)) = trimmed.split_once('=')
            && name.trim() == key
        {
            return Some(offset + (line.len() - line.trim_start().len()));
        }
        offset += line.len();
    }
    None
}

/// Print diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("config error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_closest_pool_field() {
        let fields = &["max_connections", "min_connections", "idle_timeout_secs"];
        assert_eq!(
            suggest_key("max_conections", fields),
            Some("max_connections".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", &["connection_uri", "collection"]), None);
    }

    #[test]
    fn key_offset_respects_sections() {
        let content = "[storage]\ncollection = \"s\"\n\n[storage.pool]\n  max_conections = 4\n";
        let o = key_offset(content, "storage.pool", "max_conections").unwrap();
        assert_eq!(&content[o..o + 14], "max_conections");
        assert_eq!(key_offset(content, "storage", "max_conections"), None);
        assert_eq!(key_offset("levl = 1\n[logging]\n", "", "levl"), Some(0));
    }

    #[test]
    fn unknown_key_points_into_the_source() {
        use figment::Figment;
        use figment::providers::{Format, Serialized, Toml};

        use crate::model::SessionDbConfig;

        let content = "[report]\npage_sise = 5\n";
        let err = Figment::from(Serialized::defaults(SessionDbConfig::default()))
            .merge(Toml::string(content))
            .extract::<SessionDbConfig>()
            .unwrap_err();
        let errors = figment_to_config_errors(err, &[("<inline>".into(), content.into())]);
        match &errors[..] {
            [ConfigError::UnknownKey { section, suggestion, span, .. }] => {
                assert_eq!(section, "[report]");
                assert_eq!(suggestion.as_deref(), Some("page_size"));
                assert_eq!(span.map(|s| s.offset()), Some(9));
            }
            other => panic!("unexpected diagnostics: {other:?}"),
        }
    }
}
