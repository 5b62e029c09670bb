// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Compiled defaults are overlaid by each file from [`config_files`] that
//! exists, lowest priority first, and finally by `SESSIONDB_*` variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};

use crate::model::SessionDbConfig;

/// Candidate config files, lowest priority first: `/etc/sessiondb/sessiondb.toml`,
/// the user config dir, then `./sessiondb.toml`. Missing files are skipped.
pub fn config_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from("/etc/sessiondb/sessiondb.toml")];
    files.extend(dirs::config_dir().map(|d| d.join("sessiondb").join("sessiondb.toml")));
    files.push(PathBuf::from("sessiondb.toml"));
    files
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(SessionDbConfig::default()))
}

/// Defaults, every file of [`config_files`], then the environment.
pub fn load_config() -> Result<SessionDbConfig, figment::Error> {
    config_files()
        .iter()
        .fold(defaults(), |figment, file| figment.merge(Toml::file(file)))
        .merge(env_provider())
        .extract()
}

/// Defaults plus one explicit file, then the environment.
pub fn load_config_from_path(path: &Path) -> Result<SessionDbConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    defaults()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Defaults plus an inline TOML document. The environment is ignored.
pub fn load_config_from_str(toml_content: &str) -> Result<SessionDbConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

/// The effective configuration as TOML.
pub fn to_toml_string(config: &SessionDbConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `SESSIONDB_STORAGE_CONNECTION_URI` must map to
/// `storage.connection_uri`, not `storage.connection.uri`. Pool keys get a
/// short `POOL_` prefix that lands under `storage.pool`.
fn env_provider() -> Env {
    Env::prefixed("SESSIONDB_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    if let Some(rest) = key.strip_prefix("pool_") {
        return format!("storage.pool.{rest}");
    }
    for section in ["storage", "logging", "report"] {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(
            map_env_key("storage_connection_uri"),
            "storage.connection_uri"
        );
        assert_eq!(map_env_key("pool_max_connections"), "storage.pool.max_connections");
        assert_eq!(map_env_key("logging_level"), "logging.level");
        assert_eq!(map_env_key("report_enum_value_cap"), "report.enum_value_cap");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn rendered_toml_loads_back_unchanged() {
        let mut config = SessionDbConfig::default();
        config.storage.collection = "archive".to_string();
        config.report.indexed_fields = vec!["tier".to_string()];
        let rendered = to_toml_string(&config).unwrap();
        assert!(rendered.contains("[storage.pool]"));
        assert_eq!(load_config_from_str(&rendered).unwrap(), config);
    }
}
