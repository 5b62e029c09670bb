// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations.
//!
//! Each command prints either human-readable output or, with `--json`,
//! pretty-printed JSON for scripting.

use std::process::ExitCode;

use serde::Serialize;
use sessiondb_config::SessionDbConfig;
use sessiondb_core::{SessionDbError, SessionDbResult};
use sessiondb_report::ReportService;
use sessiondb_storage::{ConnectionPool, MetadataFilter, PoolStats, SessionRepository};
use tracing::debug;

use crate::Commands;
use crate::render;

/// Structured output of `sessiondb status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connection_uri: String,
    pub collection: String,
    pub server_version: String,
    pub sessions: u64,
    pub pool: PoolStats,
}

pub(crate) fn run(
    command: Commands,
    config: &SessionDbConfig,
    pool: &ConnectionPool,
    use_color: bool,
) -> SessionDbResult<ExitCode> {
    match command {
        Commands::Config => {
            let rendered = sessiondb_config::to_toml_string(config)
                .map_err(|e| SessionDbError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
        }
        Commands::Status { json } => run_status(config, pool, json, use_color)?,
        Commands::Sessions {
            page,
            page_size,
            filters,
            json,
        } => {
            let filter = filters
                .into_iter()
                .fold(MetadataFilter::new(), |filter, (key, value)| {
                    filter.equals(key, value)
                });
            let report = report_service(config, pool)?;
            let page = report.list_sessions(page, page_size, &filter)?;
            if json {
                print_json(&page)?;
            } else {
                render::print_sessions(&page, use_color);
            }
        }
        Commands::Show { session_id, json } => {
            let report = report_service(config, pool)?;
            let Some(detail) = report.session_detail(&session_id)? else {
                eprintln!("sessiondb: no session with id `{session_id}`");
                return Ok(ExitCode::FAILURE);
            };
            if json {
                print_json(&detail)?;
            } else {
                render::print_detail(&detail, use_color);
            }
        }
        Commands::Fields { json } => {
            let fields = report_service(config, pool)?.discover_fields()?;
            if json {
                print_json(&fields)?;
            } else {
                render::print_fields(&fields, use_color);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_status(
    config: &SessionDbConfig,
    pool: &ConnectionPool,
    json: bool,
    use_color: bool,
) -> SessionDbResult<()> {
    let report = report_service(config, pool)?;
    report.repository().client().ping()?;
    let sessions = report.repository().count_sessions(&MetadataFilter::new())?;
    let status = StatusResponse {
        connection_uri: config.storage.connection_uri.clone(),
        collection: config.storage.collection.clone(),
        server_version: report.repository().client().server_version().to_string(),
        sessions,
        pool: pool.stats()?,
    };
    if json {
        print_json(&status)
    } else {
        render::print_status(&status, use_color);
        Ok(())
    }
}

fn report_service(config: &SessionDbConfig, pool: &ConnectionPool) -> SessionDbResult<ReportService> {
    let client = pool.initialize(&config.storage.connection_uri, &config.storage.pool)?;
    let repository = SessionRepository::with_client(client, config.storage.collection.clone())?
        .with_indexed_fields(config.report.indexed_fields.clone());
    debug!(collection = %config.storage.collection, "report service ready");
    Ok(ReportService::new(repository, config.report.clone()))
}

fn print_json<T: Serialize>(value: &T) -> SessionDbResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
