// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output.

use chrono::{DateTime, Utc};
use colored::Colorize;
use sessiondb_core::{Message, Metadata, MetadataValue};
use sessiondb_report::{FieldInfo, Page, SessionDetail, TimelineEntry};
use sessiondb_storage::SessionSummary;

use crate::commands::StatusResponse;

const PREVIEW_WIDTH: usize = 60;

pub fn print_status(status: &StatusResponse, use_color: bool) {
    println!();
    println!("  sessiondb status");
    println!("  {}", "-".repeat(35));
    if use_color {
        println!("    Store:    {} {}", "✓".green(), status.connection_uri.green());
    } else {
        println!("    Store:    [OK] {}", status.connection_uri);
    }
    println!("    SQLite:   {}", status.server_version);
    println!("    Table:    {}", status.collection);
    println!("    Sessions: {}", status.sessions);
    println!(
        "    Pool:     {} active, {} idle, {} max",
        status.pool.active, status.pool.available, status.pool.options.max_connections
    );
    println!();
}

pub fn print_sessions(page: &Page<SessionSummary>, use_color: bool) {
    if page.items.is_empty() {
        println!("no sessions (page {} of {})", page.page, page.pages);
        return;
    }
    println!(
        "{:<36}  {:<19}  {:>6}  {:>8}  {:>8}  METADATA",
        "SESSION", "UPDATED", "AGENTS", "MESSAGES", "FEEDBACK"
    );
    for s in &page.items {
        let id = truncate(&s.session_id, 36);
        let id = if use_color {
            format!("{:<36}", id).bold().to_string()
        } else {
            format!("{id:<36}")
        };
        println!(
            "{id}  {:<19}  {:>6}  {:>8}  {:>8}  {}",
            format_time(&s.updated_at),
            s.agents_count,
            s.messages_count,
            s.feedbacks_count,
            truncate(&format_metadata(&s.metadata), PREVIEW_WIDTH),
        );
    }
    println!(
        "page {} of {} ({} sessions)",
        page.page, page.pages, page.total
    );
}

pub fn print_detail(detail: &SessionDetail, use_color: bool) {
    let session = &detail.session;
    println!();
    if use_color {
        println!("  {} {}", "session".bold(), session.session_id.bold());
    } else {
        println!("  session {}", session.session_id);
    }
    println!("    type:     {}", session.session_type);
    println!("    created:  {}", format_time(&session.created_at));
    println!("    updated:  {}", format_time(&session.updated_at));
    if !session.metadata.is_empty() {
        println!("    metadata: {}", format_metadata(&session.metadata));
    }
    for (agent_id, agent) in &session.agents {
        let model = agent.agent_data.model.as_deref().unwrap_or("-");
        println!(
            "    agent {agent_id}: model {model}, {} messages",
            agent.messages.len()
        );
    }
    println!();
    for entry in &detail.timeline {
        let when = format_time(&entry.timestamp());
        match entry {
            TimelineEntry::Message { agent_id, message } => {
                let who = format!("{agent_id}/{}", message.role);
                let who = if use_color {
                    who.cyan().to_string()
                } else {
                    who
                };
                println!(
                    "  {when}  #{:<4} {who}  {}",
                    message.message_id,
                    message_preview(message)
                );
            }
            TimelineEntry::Feedback { feedback, .. } => {
                let rating = feedback
                    .rating
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "none".to_string());
                let label = if use_color {
                    "feedback".yellow().to_string()
                } else {
                    "feedback".to_string()
                };
                println!(
                    "  {when}  {label} {rating}  {}",
                    feedback.comment.as_deref().unwrap_or("")
                );
            }
        }
    }
    println!();
}

pub fn print_fields(fields: &[FieldInfo], use_color: bool) {
    if fields.is_empty() {
        println!("no metadata fields found");
        return;
    }
    println!("{:<24}  {:<8}  {:<7}  VALUES", "FIELD", "TYPE", "INDEXED");
    for f in fields {
        let indexed = if f.indexed { "yes" } else { "no" };
        let indexed = if use_color && f.indexed {
            format!("{indexed:<7}").green().to_string()
        } else {
            format!("{indexed:<7}")
        };
        println!(
            "{:<24}  {:<8}  {indexed}  {}",
            truncate(&f.name, 24),
            f.field_type,
            truncate(&f.values.join(", "), PREVIEW_WIDTH)
        );
    }
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `k=v` pairs in key order.
fn format_metadata(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(k, v)| format!("{k}={}", format_value(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_value(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Text(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// First text block, or the kind of the first non-text block.
fn message_preview(message: &Message) -> String {
    if message.redacted {
        return "[redacted]".to_string();
    }
    let Some(block) = message.content.first() else {
        return String::new();
    };
    if let Some(text) = block.as_text() {
        return truncate(&text.replace('\n', " "), PREVIEW_WIDTH);
    }
    match block.0.as_object().and_then(|o| o.keys().next()) {
        Some(kind) => format!("[{kind}]"),
        None => "[content]".to_string(),
    }
}

/// Shorten to `width` characters, marking the cut with `...`.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use sessiondb_core::metadata::metadata;
    use sessiondb_core::{ContentBlock, Role};

    use super::*;

    fn message(content: Vec<ContentBlock>, redacted: bool) -> Message {
        let now = sessiondb_core::timestamp::now();
        Message {
            message_id: 0,
            role: Role::User,
            content,
            event_loop_metrics: None,
            redacted,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn metadata_renders_in_key_order() {
        let m = metadata([
            ("tier", MetadataValue::from("gold")),
            ("turns", MetadataValue::from(3)),
            ("vip", MetadataValue::from(true)),
        ]);
        assert_eq!(format_metadata(&m), "tier=gold, turns=3, vip=true");
    }

    #[test]
    fn previews_describe_content() {
        assert_eq!(
            message_preview(&message(vec![ContentBlock::text("line one\nline two")], false)),
            "line one line two"
        );
        assert_eq!(
            message_preview(&message(
                vec![ContentBlock::tool_use("t1", "search", serde_json::json!({}))],
                false
            )),
            "[toolUse]"
        );
        assert_eq!(
            message_preview(&message(vec![ContentBlock::text("secret")], true)),
            "[redacted]"
        );
        assert_eq!(message_preview(&message(vec![], false)), "");
    }
}
