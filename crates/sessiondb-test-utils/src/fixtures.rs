// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture builders.

use sessiondb_core::{AgentSnapshot, EventLoopMetrics};

/// A unique session id.
pub fn session_id() -> String {
    format!("sess-{}", uuid::Uuid::new_v4())
}

/// Metrics for one response cycle, split evenly between input and output.
pub fn metrics(latency_ms: u64, total_tokens: u64) -> EventLoopMetrics {
    EventLoopMetrics {
        latency_ms,
        input_tokens: total_tokens / 2,
        output_tokens: total_tokens - total_tokens / 2,
        total_tokens,
    }
}

/// An agent snapshot with a model, a system prompt and the given latency.
///
/// A latency of zero models a runtime that has not completed a response
/// cycle since the last sync.
pub fn snapshot(agent_id: &str, latency_ms: u64) -> AgentSnapshot {
    AgentSnapshot::new(agent_id)
        .with_model("test-model")
        .with_system_prompt("You are a test assistant.")
        .with_metrics(metrics(latency_ms, 42))
}
