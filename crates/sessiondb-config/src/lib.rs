// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SessionDB configuration.
//!
//! A [`SessionDbConfig`] comes from compiled defaults, optional TOML files and
//! `SESSIONDB_*` environment variables. Loading is strict: a misspelled key is
//! an error, reported through miette with the closest valid key.
//!
//! ```no_run
//! match sessiondb_config::load_and_validate() {
//!     Ok(config) => println!("store: {}", config.storage.connection_uri),
//!     Err(errors) => sessiondb_config::render_errors(&errors),
//! }
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str, to_toml_string};
pub use model::{LoggingConfig, PoolConfig, ReportConfig, SessionDbConfig, StorageConfig};

/// Load from the default file locations and the environment, then validate.
pub fn load_and_validate() -> Result<SessionDbConfig, Vec<ConfigError>> {
    checked(loader::load_config(), || {
        loader::config_files().iter().filter_map(|p| read_source(p)).collect()
    })
}

/// Load one explicit file plus the environment, then validate.
pub fn load_and_validate_path(path: &Path) -> Result<SessionDbConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load an inline TOML document, then validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<SessionDbConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validate a loaded config, or turn the load failure into diagnostics. The
/// file contents are only read when there is something to point into.
fn checked(
    loaded: Result<SessionDbConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<SessionDbConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// `(name, contents)` of a readable file, named the way figment reports it.
fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Some((absolute.display().to_string(), content))
}
