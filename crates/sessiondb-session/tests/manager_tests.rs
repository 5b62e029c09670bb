// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session manager behavior against a file-backed store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sessiondb_core::metadata::metadata;
use sessiondb_core::{ContentBlock, MetadataValue, NewMessage, Rating, Role, SessionDbError};
use sessiondb_session::{
    HookAction, Hooks, MetadataCall, MetadataOutcome, NotificationHook,
};
use sessiondb_test_utils::{RecordingNotifier, TestHarness, metrics, session_id, snapshot};
use tracing_test::traced_test;

#[test]
fn zero_latency_sync_leaves_metrics_absent() {
    let harness = TestHarness::new().unwrap();
    let manager = harness.manager(&session_id()).unwrap();
    manager
        .append_message("a", &NewMessage::text(Role::User, "hello"))
        .unwrap();
    manager
        .append_message("a", &NewMessage::text(Role::Assistant, "hi there"))
        .unwrap();

    let outcome = manager.sync_agent(&snapshot("a", 0)).unwrap();
    assert!(outcome.agent_written);
    assert_eq!(outcome.metrics_attached_to, None);

    let repo = harness.repository().unwrap();
    let stored = repo.message_metrics(manager.session_id(), "a").unwrap();
    assert_eq!(stored, vec![(0, None), (1, None)]);
}

#[test]
fn completed_cycle_attaches_metrics_to_last_message_only() {
    let harness = TestHarness::new().unwrap();
    let manager = harness.manager(&session_id()).unwrap();
    for (role, text) in [(Role::User, "q"), (Role::Assistant, "a")] {
        manager
            .append_message("a", &NewMessage::text(role, text))
            .unwrap();
    }

    let outcome = manager.sync_agent(&snapshot("a", 250)).unwrap();
    assert_eq!(outcome.metrics_attached_to, Some(1));

    let repo = harness.repository().unwrap();
    assert_eq!(
        repo.message_metrics(manager.session_id(), "a").unwrap(),
        vec![(0, None), (1, Some(metrics(250, 42)))]
    );

    let session = manager.read_session().unwrap().unwrap();
    let agent = &session.agents["a"];
    assert_eq!(agent.agent_data.model.as_deref(), Some("test-model"));
    assert_eq!(
        agent.agent_data.system_prompt.as_deref(),
        Some("You are a test assistant.")
    );
}

#[test]
fn metrics_summary_reflects_synced_cycles() {
    let harness = TestHarness::new().unwrap();
    let manager = harness.manager(&session_id()).unwrap();
    for latency in [100, 300] {
        manager
            .append_message("a", &NewMessage::text(Role::User, "q"))
            .unwrap();
        manager
            .append_message("a", &NewMessage::text(Role::Assistant, "a"))
            .unwrap();
        manager.sync_agent(&snapshot("a", latency)).unwrap();
    }
    let summary = manager.get_metrics_summary("a").unwrap();
    assert_eq!(summary.total_messages, 4);
    assert_eq!(summary.total_tokens, 84);
    assert!((summary.average_latency_ms - 200.0).abs() < f64::EPSILON);
}

#[test]
#[traced_test]
fn post_operation_hook_failure_keeps_the_write() {
    let hooks = Hooks::new().with_metadata_fn(|inv| {
        inv.proceed()?;
        Err(SessionDbError::hook(inv.action().to_string(), "downstream unavailable"))
    });
    let harness = TestHarness::new().unwrap();
    let manager = harness.manager_with_hooks(&session_id(), hooks).unwrap();

    let updated = manager
        .update_metadata(&metadata([("status", MetadataValue::from("open"))]))
        .unwrap();
    assert!(updated);

    let repo = harness.repository().unwrap();
    let stored = repo.get_metadata(manager.session_id()).unwrap().unwrap();
    assert_eq!(stored["status"], MetadataValue::from("open"));
    assert!(logs_contain("downstream unavailable"));
}

#[test]
fn pre_operation_hook_failure_blocks_the_write() {
    let hooks = Hooks::new().with_metadata_fn(|inv| {
        if matches!(inv.args(), MetadataCall::Update(patch) if patch.contains_key("forbidden")) {
            return Err(SessionDbError::hook(inv.action().to_string(), "key not allowed"));
        }
        inv.proceed()
    });
    let harness = TestHarness::new().unwrap();
    let id = session_id();
    let manager = harness.manager_with_hooks(&id, hooks).unwrap();

    let err = manager
        .update_metadata(&metadata([("forbidden", MetadataValue::from(1))]))
        .unwrap_err();
    assert!(matches!(err, SessionDbError::Hook { .. }));

    let repo = harness.repository().unwrap();
    assert!(!repo.get_metadata(&id).unwrap().unwrap().contains_key("forbidden"));

    manager
        .update_metadata(&metadata([("allowed", MetadataValue::from(1))]))
        .unwrap();
    assert!(repo.get_metadata(&id).unwrap().unwrap().contains_key("allowed"));
}

#[test]
fn short_circuit_hook_skips_the_store() {
    let reads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reads);
    let hooks = Hooks::new().with_metadata_fn(move |inv| match inv.action() {
        HookAction::GetMetadata => Ok(MetadataOutcome::Metadata(Some(metadata([(
            "cached",
            MetadataValue::from(true),
        )])))),
        _ => {
            counter.fetch_add(1, Ordering::SeqCst);
            inv.proceed()
        }
    });
    let harness = TestHarness::new().unwrap();
    let manager = harness.manager_with_hooks(&session_id(), hooks).unwrap();

    let cached = manager.get_metadata().unwrap().unwrap();
    assert_eq!(cached["cached"], MetadataValue::from(true));
    assert_eq!(reads.load(Ordering::SeqCst), 0);

    manager
        .delete_metadata(&["missing".to_string()])
        .unwrap();
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

#[test]
fn notifications_follow_successful_mutations() {
    let notifier = Arc::new(RecordingNotifier::new());
    let hook = Arc::new(NotificationHook::new(notifier.clone()));
    let hooks = Hooks::new()
        .with_metadata(hook.clone())
        .with_feedback(hook);
    let harness = TestHarness::builder().with_hooks(hooks).build().unwrap();
    let id = session_id();
    let manager = harness.manager(&id).unwrap();

    manager
        .update_metadata(&metadata([("tier", MetadataValue::from("gold"))]))
        .unwrap();
    manager.get_metadata().unwrap();
    manager
        .add_feedback(Some(Rating::Up), Some("great".into()))
        .unwrap();
    manager.get_feedbacks().unwrap();

    let seen = notifier.notifications();
    let actions: Vec<_> = seen.iter().map(|n| n.action).collect();
    assert_eq!(actions, vec![HookAction::UpdateMetadata, HookAction::AddFeedback]);
    assert!(seen.iter().all(|n| n.session_id == id));
    assert_eq!(seen[1].payload["result"]["rating"], "up");
    assert_eq!(seen[1].payload["result"]["comment"], "great");
}

#[test]
#[traced_test]
fn failing_notifier_does_not_lose_feedback() {
    let notifier = Arc::new(RecordingNotifier::failing());
    let hooks = Hooks::new().with_feedback(Arc::new(NotificationHook::new(notifier.clone())));
    let harness = TestHarness::new().unwrap();
    let manager = harness.manager_with_hooks(&session_id(), hooks).unwrap();

    let added = manager.add_feedback(Some(Rating::Down), None).unwrap();
    assert!(added.is_some());
    assert_eq!(manager.get_feedbacks().unwrap().len(), 1);
    assert_eq!(notifier.count(), 0);
    assert!(logs_contain("notification delivery failed"));
}

#[test]
fn redaction_preserves_position() {
    let harness = TestHarness::new().unwrap();
    let manager = harness.manager(&session_id()).unwrap();
    for text in ["keep", "secret", "keep too"] {
        manager
            .append_message("a", &NewMessage::text(Role::User, text))
            .unwrap();
    }
    assert!(manager
        .redact_message("a", 1, vec![ContentBlock::text("[redacted]")])
        .unwrap());
    assert!(!manager
        .redact_message("a", 7, vec![ContentBlock::text("[redacted]")])
        .unwrap());

    let restored = manager.restore_agent("a").unwrap().unwrap();
    let ids: Vec<u64> = restored.messages.iter().map(|m| m.message_id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert!(restored.messages[1].redacted);
    assert_eq!(restored.messages[1].content[0].as_text(), Some("[redacted]"));
    assert!(!restored.messages[0].redacted);
}

#[test]
fn managers_for_different_sessions_run_concurrently() {
    let harness = TestHarness::builder().with_max_connections(4).build().unwrap();
    let ids: Vec<String> = (0..6).map(|_| session_id()).collect();

    std::thread::scope(|s| {
        for id in &ids {
            let harness = &harness;
            s.spawn(move || {
                let manager = harness.manager(id).unwrap();
                for i in 0..5 {
                    manager
                        .append_message("a", &NewMessage::text(Role::User, format!("m{i}")))
                        .unwrap();
                }
                manager.sync_agent(&snapshot("a", 50)).unwrap();
                manager.close();
            });
        }
    });

    let repo = harness.repository().unwrap();
    for id in &ids {
        assert_eq!(repo.list_messages(id, "a", None, 0).unwrap().len(), 5);
    }
    assert!(!harness.factory.client().is_closed());
    assert_eq!(harness.pool.stats().unwrap().active, 0);
}
