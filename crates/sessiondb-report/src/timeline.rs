// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A session's messages and feedback merged into one chronological list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sessiondb_core::{Feedback, Message, Session};

/// One entry of a merged timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    Message { agent_id: String, message: Message },
    Feedback { index: usize, feedback: Feedback },
}

impl TimelineEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TimelineEntry::Message { message, .. } => message.created_at,
            TimelineEntry::Feedback { feedback, .. } => feedback.created_at,
        }
    }
}

/// Merge every agent's messages with the feedback log, oldest first.
///
/// Entries with equal timestamps keep insertion order: agents by
/// `agent_id`, each agent's messages by `message_id`, then feedback in
/// append order.
pub fn merge_timeline(session: &Session) -> Vec<TimelineEntry> {
    let mut entries = Vec::with_capacity(session.message_count() + session.feedbacks.len());
    for (agent_id, agent) in &session.agents {
        let mut messages: Vec<&Message> = agent.messages.iter().collect();
        messages.sort_by_key(|m| m.message_id);
        entries.extend(messages.into_iter().map(|message| TimelineEntry::Message {
            agent_id: agent_id.clone(),
            message: message.clone(),
        }));
    }
    entries.extend(
        session
            .feedbacks
            .iter()
            .enumerate()
            .map(|(index, feedback)| TimelineEntry::Feedback {
                index,
                feedback: feedback.clone(),
            }),
    );
    // sort_by_key is stable
    entries.sort_by_key(TimelineEntry::timestamp);
    entries
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use sessiondb_core::{
        AgentData, ContentBlock, Metadata, Rating, Role, SessionAgent, DEFAULT_SESSION_TYPE,
    };

    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_767_225_600_000 + millis).unwrap()
    }

    fn message(id: u64, text: &str, ts: DateTime<Utc>) -> Message {
        Message {
            message_id: id,
            role: Role::User,
            content: vec![ContentBlock::text(text)],
            event_loop_metrics: None,
            redacted: false,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn agent(id: &str, messages: Vec<Message>) -> SessionAgent {
        SessionAgent {
            agent_id: id.to_string(),
            agent_data: AgentData::default(),
            messages,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn feedback(ts: DateTime<Utc>) -> Feedback {
        Feedback {
            rating: Some(Rating::Up),
            comment: None,
            created_at: ts,
        }
    }

    fn session(agents: Vec<SessionAgent>, feedbacks: Vec<Feedback>) -> Session {
        let mut session = Session::new("s1", DEFAULT_SESSION_TYPE, Metadata::new());
        session.agents = agents
            .into_iter()
            .map(|a| (a.agent_id.clone(), a))
            .collect::<BTreeMap<_, _>>();
        session.feedbacks = feedbacks;
        session
    }

    fn labels(entries: &[TimelineEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                TimelineEntry::Message { agent_id, message } => {
                    format!("{agent_id}:{}", message.content[0].as_text().unwrap_or_default())
                }
                TimelineEntry::Feedback { index, .. } => format!("feedback:{index}"),
            })
            .collect()
    }

    #[test]
    fn interleaves_agents_and_feedback_by_time() {
        let s = session(
            vec![
                agent("A", vec![message(0, "t1", at(1000)), message(1, "t3", at(3000))]),
                agent("B", vec![message(0, "t2", at(2000))]),
            ],
            vec![feedback(at(2500))],
        );
        assert_eq!(
            labels(&merge_timeline(&s)),
            vec!["A:t1", "B:t2", "feedback:0", "A:t3"]
        );
    }

    #[test]
    fn ties_keep_insertion_order() {
        let s = session(
            vec![
                agent("b", vec![message(1, "b1", at(5)), message(0, "b0", at(5))]),
                agent("a", vec![message(0, "a0", at(5))]),
            ],
            vec![feedback(at(5)), feedback(at(5))],
        );
        assert_eq!(
            labels(&merge_timeline(&s)),
            vec!["a:a0", "b:b0", "b:b1", "feedback:0", "feedback:1"]
        );
    }

    #[test]
    fn entries_are_tagged_by_kind() {
        let s = session(vec![], vec![feedback(at(1))]);
        let json = serde_json::to_value(merge_timeline(&s)).unwrap();
        assert_eq!(json[0]["kind"], "feedback");
        assert_eq!(json[0]["feedback"]["rating"], "up");
    }
}
