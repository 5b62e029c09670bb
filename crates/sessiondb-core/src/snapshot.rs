// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The narrow interface between the engine and an agent runtime.
//!
//! The runtime populates an [`AgentSnapshot`] each time it wants its state
//! persisted; the engine never reaches into runtime-specific agent objects.

use serde::{Deserialize, Serialize};

use crate::types::{AgentData, EventLoopMetrics, Message, SessionAgent};

/// Everything the engine needs from an agent runtime for one sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub agent_data: AgentData,
    /// Accumulated telemetry since the last sync. `None` or a zero latency
    /// means no response cycle has completed.
    pub metrics: Option<EventLoopMetrics>,
}

impl AgentSnapshot {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.agent_data.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.agent_data.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_state(mut self, state: serde_json::Value) -> Self {
        self.agent_data.state = state;
        self
    }

    pub fn with_conversation_manager_state(mut self, state: serde_json::Value) -> Self {
        self.agent_data.conversation_manager_state = state;
        self
    }

    pub fn with_metrics(mut self, metrics: EventLoopMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Metrics worth persisting: present and with a non-zero latency.
    pub fn completed_metrics(&self) -> Option<EventLoopMetrics> {
        self.metrics.filter(|m| m.latency_ms > 0)
    }
}

/// Aggregate telemetry for one agent, derived from its message history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_tokens: u64,
    pub average_latency_ms: f64,
    pub total_messages: usize,
}

impl MetricsSummary {
    /// Fold per-message metrics into a summary in a single pass.
    ///
    /// Every message counts towards `total_messages`; only messages carrying
    /// metrics contribute tokens and latency.
    pub fn from_messages<'a, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a EventLoopMetrics>>,
    {
        let mut total_messages = 0usize;
        let mut total_tokens = 0u64;
        let mut latency_sum = 0u64;
        let mut measured = 0u64;
        for m in metrics {
            total_messages += 1;
            if let Some(m) = m {
                total_tokens += m.total_tokens;
                latency_sum += m.latency_ms;
                measured += 1;
            }
        }
        let average_latency_ms = if measured == 0 {
            0.0
        } else {
            latency_sum as f64 / measured as f64
        };
        Self {
            total_tokens,
            average_latency_ms,
            total_messages,
        }
    }
}

/// Agent state and conversation history handed back on session resume.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredAgent {
    pub agent: SessionAgent,
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(latency_ms: u64, total_tokens: u64) -> EventLoopMetrics {
        EventLoopMetrics {
            latency_ms,
            input_tokens: total_tokens / 2,
            output_tokens: total_tokens - total_tokens / 2,
            total_tokens,
        }
    }

    #[test]
    fn zero_latency_is_not_a_completed_cycle() {
        let idle = AgentSnapshot::new("a").with_metrics(metrics(0, 0));
        assert_eq!(idle.completed_metrics(), None);
        assert_eq!(AgentSnapshot::new("a").completed_metrics(), None);

        let done = AgentSnapshot::new("a").with_metrics(metrics(250, 40));
        assert_eq!(done.completed_metrics(), Some(metrics(250, 40)));
    }

    #[test]
    fn summary_averages_only_measured_messages() {
        let a = metrics(100, 10);
        let b = metrics(300, 30);
        let summary = MetricsSummary::from_messages([None, Some(&a), None, Some(&b)]);
        assert_eq!(summary.total_messages, 4);
        assert_eq!(summary.total_tokens, 40);
        assert!((summary.average_latency_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_of_empty_history_is_zero() {
        let summary = MetricsSummary::from_messages(std::iter::empty());
        assert_eq!(summary, MetricsSummary::default());
    }

    #[test]
    fn builder_fills_agent_data() {
        let snap = AgentSnapshot::new("planner")
            .with_model("claude-sonnet")
            .with_system_prompt("plan things")
            .with_state(serde_json::json!({"k": 1}));
        assert_eq!(snap.agent_id, "planner");
        assert_eq!(snap.agent_data.model.as_deref(), Some("claude-sonnet"));
        assert_eq!(snap.agent_data.system_prompt.as_deref(), Some("plan things"));
        assert_eq!(snap.agent_data.state["k"], 1);
    }
}
