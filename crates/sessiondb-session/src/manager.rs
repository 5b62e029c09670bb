// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-conversation session façade.

use std::sync::atomic::{AtomicBool, Ordering};

use sessiondb_core::{
    AgentSnapshot, ContentBlock, Feedback, Message, MessagePatch, Metadata, MetricsSummary,
    NewMessage, Rating, RestoredAgent, Session, SessionDbError, SessionDbResult,
};
use sessiondb_storage::SessionRepository;
use tracing::debug;

use crate::hooks::{
    FeedbackCall, FeedbackOutcome, HookAction, Hooks, MetadataCall, MetadataOutcome, dispatch,
};

/// What [`SessionManager::sync_agent`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Whether the agent document was written (false if the session is gone).
    pub agent_written: bool,
    /// The message the metrics snapshot was attached to, if any.
    pub metrics_attached_to: Option<u64>,
}

/// Binds one `session_id` to a repository and the hooks installed for it.
#[derive(Debug)]
pub struct SessionManager {
    session_id: String,
    repository: SessionRepository,
    hooks: Hooks,
    closed: AtomicBool,
}

impl SessionManager {
    /// Create the session if it does not exist yet, or join it if it does.
    pub fn open(
        session_id: impl Into<String>,
        session_type: &str,
        repository: SessionRepository,
        hooks: Hooks,
    ) -> SessionDbResult<Self> {
        let session_id = session_id.into();
        repository.create_session(&session_id, session_type, Metadata::new())?;
        Ok(Self::new(session_id, repository, hooks))
    }

    /// Bind to `session_id` without touching the store.
    pub fn new(session_id: impl Into<String>, repository: SessionRepository, hooks: Hooks) -> Self {
        Self {
            session_id: session_id.into(),
            repository,
            hooks,
            closed: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn read_session(&self) -> SessionDbResult<Option<Session>> {
        self.repository.read_session(&self.session_id)
    }

    /// Append a message; metrics are attached later by [`sync_agent`](Self::sync_agent).
    pub fn append_message(
        &self,
        agent_id: &str,
        message: &NewMessage,
    ) -> SessionDbResult<Option<Message>> {
        self.repository
            .append_message(&self.session_id, agent_id, message)
    }

    /// Persist the agent's state, then attach completed-cycle metrics to its
    /// most recent message.
    ///
    /// Metrics with zero or absent latency are skipped without a write.
    pub fn sync_agent(&self, snapshot: &AgentSnapshot) -> SessionDbResult<SyncOutcome> {
        let agent_id = snapshot.agent_id.as_str();
        let agent_written = self.repository.create_or_update_agent(
            &self.session_id,
            agent_id,
            &snapshot.agent_data,
        )?;
        let mut outcome = SyncOutcome {
            agent_written,
            metrics_attached_to: None,
        };

        let Some(metrics) = snapshot.completed_metrics() else {
            debug!(session_id = %self.session_id, agent_id, "no completed response cycle, metrics skipped");
            return Ok(outcome);
        };
        let Some(message_id) = self
            .repository
            .last_message_id(&self.session_id, agent_id)?
        else {
            debug!(session_id = %self.session_id, agent_id, "agent has no messages, metrics skipped");
            return Ok(outcome);
        };

        if self.repository.update_message(
            &self.session_id,
            agent_id,
            message_id,
            &MessagePatch::metrics(metrics),
        )? {
            debug!(
                session_id = %self.session_id,
                agent_id,
                message_id,
                latency_ms = metrics.latency_ms,
                total_tokens = metrics.total_tokens,
                "metrics attached"
            );
            outcome.metrics_attached_to = Some(message_id);
        }
        Ok(outcome)
    }

    /// Token and latency totals over the agent's message history.
    pub fn get_metrics_summary(&self, agent_id: &str) -> SessionDbResult<MetricsSummary> {
        let metrics = self
            .repository
            .message_metrics(&self.session_id, agent_id)?;
        Ok(MetricsSummary::from_messages(
            metrics.iter().map(|(_, m)| m.as_ref()),
        ))
    }

    /// Agent state and its conversation history, for resuming a session.
    pub fn restore_agent(&self, agent_id: &str) -> SessionDbResult<Option<RestoredAgent>> {
        let Some(agent) = self.repository.read_agent(&self.session_id, agent_id)? else {
            return Ok(None);
        };
        let messages = self
            .repository
            .list_messages(&self.session_id, agent_id, None, 0)?;
        Ok(Some(RestoredAgent { agent, messages }))
    }

    pub fn redact_message(
        &self,
        agent_id: &str,
        message_id: u64,
        replacement: Vec<ContentBlock>,
    ) -> SessionDbResult<bool> {
        self.repository
            .redact_message(&self.session_id, agent_id, message_id, replacement)
    }

    // --- hooked: metadata ---

    pub fn update_metadata(&self, patch: &Metadata) -> SessionDbResult<bool> {
        match self.metadata(MetadataCall::Update(patch.clone()))? {
            MetadataOutcome::Updated(updated) => Ok(updated),
            other => Err(mismatch(HookAction::UpdateMetadata, &other)),
        }
    }

    pub fn get_metadata(&self) -> SessionDbResult<Option<Metadata>> {
        match self.metadata(MetadataCall::Get)? {
            MetadataOutcome::Metadata(metadata) => Ok(metadata),
            other => Err(mismatch(HookAction::GetMetadata, &other)),
        }
    }

    pub fn delete_metadata(&self, keys: &[String]) -> SessionDbResult<bool> {
        match self.metadata(MetadataCall::Delete(keys.to_vec()))? {
            MetadataOutcome::Deleted(deleted) => Ok(deleted),
            other => Err(mismatch(HookAction::DeleteMetadata, &other)),
        }
    }

    // --- hooked: feedback ---

    pub fn add_feedback(
        &self,
        rating: Option<Rating>,
        comment: Option<String>,
    ) -> SessionDbResult<Option<Feedback>> {
        match self.feedback(FeedbackCall::Add { rating, comment })? {
            FeedbackOutcome::Added(feedback) => Ok(feedback),
            other => Err(mismatch(HookAction::AddFeedback, &other)),
        }
    }

    pub fn get_feedbacks(&self) -> SessionDbResult<Vec<Feedback>> {
        match self.feedback(FeedbackCall::List)? {
            FeedbackOutcome::Feedbacks(feedbacks) => Ok(feedbacks),
            other => Err(mismatch(HookAction::GetFeedbacks, &other)),
        }
    }

    /// Release the repository. Closes the client only when the repository
    /// owns it; a pooled client stays open for other managers.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(session_id = %self.session_id, "closing session manager");
        self.repository.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn metadata(&self, call: MetadataCall) -> SessionDbResult<MetadataOutcome> {
        let repository = &self.repository;
        let session_id = self.session_id.as_str();
        dispatch(
            self.hooks.metadata.as_ref(),
            call.action(),
            session_id,
            call,
            |call| match call {
                MetadataCall::Update(patch) => repository
                    .update_metadata(session_id, &patch)
                    .map(MetadataOutcome::Updated),
                MetadataCall::Get => repository
                    .get_metadata(session_id)
                    .map(MetadataOutcome::Metadata),
                MetadataCall::Delete(keys) => repository
                    .delete_metadata(session_id, &keys)
                    .map(MetadataOutcome::Deleted),
            },
        )
    }

    fn feedback(&self, call: FeedbackCall) -> SessionDbResult<FeedbackOutcome> {
        let repository = &self.repository;
        let session_id = self.session_id.as_str();
        dispatch(
            self.hooks.feedback.as_ref(),
            call.action(),
            session_id,
            call,
            |call| match call {
                FeedbackCall::Add { rating, comment } => repository
                    .add_feedback(session_id, rating, comment)
                    .map(FeedbackOutcome::Added),
                FeedbackCall::List => repository
                    .get_feedbacks(session_id)
                    .map(FeedbackOutcome::Feedbacks),
            },
        )
    }
}

fn mismatch(action: HookAction, outcome: &impl std::fmt::Debug) -> SessionDbError {
    SessionDbError::hook(
        action.to_string(),
        format!("hook returned a result of the wrong kind: {outcome:?}"),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sessiondb_config::PoolConfig;
    use sessiondb_core::metadata::metadata;
    use sessiondb_core::{EventLoopMetrics, MetadataValue, Role};
    use sessiondb_storage::DocumentClient;

    use super::*;

    fn manager(hooks: Hooks) -> SessionManager {
        let client = DocumentClient::connect("sqlite::memory:", &PoolConfig::default()).unwrap();
        let repository = SessionRepository::with_client(Arc::new(client), "sessions").unwrap();
        SessionManager::open("s1", "agent", repository, hooks).unwrap()
    }

    fn metrics(latency_ms: u64) -> EventLoopMetrics {
        EventLoopMetrics {
            latency_ms,
            input_tokens: 10,
            output_tokens: 20,
            total_tokens: 30,
        }
    }

    #[test]
    fn open_joins_an_existing_session() {
        let first = manager(Hooks::new());
        first
            .update_metadata(&metadata([("k", MetadataValue::from(1))]))
            .unwrap();
        let client = Arc::clone(first.repository().client());
        let repository = SessionRepository::with_client(client, "sessions").unwrap();
        let second = SessionManager::open("s1", "agent", repository, Hooks::new()).unwrap();
        assert_eq!(
            second.get_metadata().unwrap().unwrap()["k"],
            MetadataValue::from(1)
        );
    }

    #[test]
    fn sync_without_messages_skips_metrics() {
        let manager = manager(Hooks::new());
        let outcome = manager
            .sync_agent(&AgentSnapshot::new("a").with_metrics(metrics(100)))
            .unwrap();
        assert!(outcome.agent_written);
        assert_eq!(outcome.metrics_attached_to, None);
    }

    #[test]
    fn summary_counts_every_message() {
        let manager = manager(Hooks::new());
        for (text, latency) in [("q1", 0), ("a1", 200), ("q2", 0), ("a2", 200)] {
            manager
                .append_message("a", &NewMessage::text(Role::User, text))
                .unwrap();
            manager
                .sync_agent(&AgentSnapshot::new("a").with_metrics(metrics(latency)))
                .unwrap();
        }
        let summary = manager.get_metrics_summary("a").unwrap();
        assert_eq!(summary.total_messages, 4);
        assert_eq!(summary.total_tokens, 60);
        assert!((summary.average_latency_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wrong_outcome_kind_is_a_hook_error() {
        let manager = manager(Hooks::new().with_metadata_fn(|_| Ok(MetadataOutcome::Deleted(true))));
        let err = manager.get_metadata().unwrap_err();
        assert!(matches!(err, SessionDbError::Hook { ref action, .. } if action == "get_metadata"));
    }

    #[test]
    fn restore_returns_state_and_history() {
        let manager = manager(Hooks::new());
        manager
            .append_message("a", &NewMessage::text(Role::User, "hi"))
            .unwrap();
        manager
            .sync_agent(
                &AgentSnapshot::new("a")
                    .with_model("claude-sonnet")
                    .with_metrics(metrics(120)),
            )
            .unwrap();
        let restored = manager.restore_agent("a").unwrap().unwrap();
        assert_eq!(restored.agent.agent_data.model.as_deref(), Some("claude-sonnet"));
        assert_eq!(restored.messages.len(), 1);
        assert_eq!(restored.messages[0].event_loop_metrics, None);
        assert!(manager.restore_agent("ghost").unwrap().is_none());
    }

    #[test]
    fn close_is_idempotent_and_fences_operations() {
        let manager = manager(Hooks::new());
        manager.close();
        manager.close();
        assert!(manager.is_closed());
        assert!(matches!(
            manager.read_session().unwrap_err(),
            SessionDbError::ClientClosed
        ));
    }
}
