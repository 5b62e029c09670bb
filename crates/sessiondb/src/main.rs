// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SessionDB - inspect session stores from the command line.
//!
//! Every command is read-only.

mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sessiondb_core::MetadataValue;
use sessiondb_storage::ConnectionPool;

/// SessionDB - inspect persisted agent sessions.
#[derive(Parser, Debug)]
#[command(name = "sessiondb", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Without it the XDG lookup chain is used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Check connectivity and show pool statistics.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// List sessions, most recently updated first.
    Sessions {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        /// Metadata equality filter as `key=value`. May be repeated.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, MetadataValue)>,
        #[arg(long)]
        json: bool,
    },
    /// Show one session with its merged timeline.
    Show {
        session_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Describe the metadata fields in use.
    Fields {
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// Parse `key=value`. Booleans and numbers keep their type; anything else
/// is text.
fn parse_filter(raw: &str) -> Result<(String, MetadataValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("filter key must not be empty".to_string());
    }
    let value = match value {
        "true" => MetadataValue::Bool(true),
        "false" => MetadataValue::Bool(false),
        _ => {
            if let Ok(n) = value.parse::<i64>() {
                MetadataValue::Integer(n)
            } else if let Some(n) = value.parse::<f64>().ok().filter(|n| n.is_finite()) {
                MetadataValue::Float(n)
            } else {
                MetadataValue::Text(value.to_string())
            }
        }
    };
    Ok((key.to_string(), value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => sessiondb_config::load_and_validate_path(path),
        None => sessiondb_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            sessiondb_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging.level);

    let use_color = !cli.plain && std::io::stdout().is_terminal();
    let pool = ConnectionPool::new();
    let result = commands::run(cli.command, &config, &pool, use_color);
    pool.close();

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("sessiondb: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber. Logs go to stderr so JSON output on
/// stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sessiondb={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
