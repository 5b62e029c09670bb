// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operation interception for the metadata and feedback families.
//!
//! A [`Hooks`] value carries at most one [`SessionHook`] per family. When a
//! hook is installed, the manager builds an [`Invocation`] wrapping the real
//! repository call and hands it to the hook, which decides whether and how to
//! run it via [`Invocation::proceed`]. Hooks are never chained.
//!
//! Failure isolation:
//! - an error returned after the original succeeded is logged and the
//!   original result is returned to the caller;
//! - an error returned before (or without) a successful original propagates,
//!   so a hook can act as a gatekeeper.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

use serde::Serialize;
use sessiondb_core::{Feedback, Metadata, Rating, SessionDbError, SessionDbResult};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{info, warn};

/// The intercepted operations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    UpdateMetadata,
    GetMetadata,
    DeleteMetadata,
    AddFeedback,
    GetFeedbacks,
}

impl HookAction {
    /// Whether the action changes persisted state.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            HookAction::UpdateMetadata | HookAction::DeleteMetadata | HookAction::AddFeedback
        )
    }
}

/// Arguments of a metadata-family call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataCall {
    Update(Metadata),
    Get,
    Delete(Vec<String>),
}

impl MetadataCall {
    pub fn action(&self) -> HookAction {
        match self {
            MetadataCall::Update(_) => HookAction::UpdateMetadata,
            MetadataCall::Get => HookAction::GetMetadata,
            MetadataCall::Delete(_) => HookAction::DeleteMetadata,
        }
    }
}

/// Result of a metadata-family call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataOutcome {
    Updated(bool),
    Metadata(Option<Metadata>),
    Deleted(bool),
}

/// Arguments of a feedback-family call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedbackCall {
    Add {
        rating: Option<Rating>,
        comment: Option<String>,
    },
    List,
}

impl FeedbackCall {
    pub fn action(&self) -> HookAction {
        match self {
            FeedbackCall::Add { .. } => HookAction::AddFeedback,
            FeedbackCall::List => HookAction::GetFeedbacks,
        }
    }
}

/// Result of a feedback-family call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedbackOutcome {
    Added(Option<Feedback>),
    Feedbacks(Vec<Feedback>),
}

/// One intercepted call, handed to a [`SessionHook`].
pub struct Invocation<'a, C, O> {
    action: HookAction,
    session_id: &'a str,
    args: C,
    original: &'a mut (dyn FnMut(C) -> SessionDbResult<O> + 'a),
    succeeded: Option<O>,
}

impl<'a, C: Clone, O: Clone> Invocation<'a, C, O> {
    pub fn action(&self) -> HookAction {
        self.action
    }

    pub fn session_id(&self) -> &str {
        self.session_id
    }

    /// The arguments the caller supplied.
    pub fn args(&self) -> &C {
        &self.args
    }

    /// Run the original operation with the caller's arguments.
    pub fn proceed(&mut self) -> SessionDbResult<O> {
        let args = self.args.clone();
        self.run(args)
    }

    /// Run the original operation with replacement arguments.
    pub fn proceed_with(&mut self, args: C) -> SessionDbResult<O> {
        self.run(args)
    }

    /// Whether the original operation has run and succeeded.
    pub fn has_succeeded(&self) -> bool {
        self.succeeded.is_some()
    }

    fn run(&mut self, args: C) -> SessionDbResult<O> {
        let result = (self.original)(args);
        if let Ok(value) = &result {
            self.succeeded = Some(value.clone());
        }
        result
    }
}

/// Interception function for one operation family.
pub trait SessionHook<C, O>: Send + Sync {
    /// Returns the value surfaced to the caller. A hook that never calls
    /// [`Invocation::proceed`] turns a mutation into a no-op.
    fn call(&self, invocation: &mut Invocation<'_, C, O>) -> SessionDbResult<O>;
}

struct FnHook<F>(F);

impl<C, O, F> SessionHook<C, O> for FnHook<F>
where
    F: Fn(&mut Invocation<'_, C, O>) -> SessionDbResult<O> + Send + Sync,
{
    fn call(&self, invocation: &mut Invocation<'_, C, O>) -> SessionDbResult<O> {
        (self.0)(invocation)
    }
}

pub type MetadataHook = Arc<dyn SessionHook<MetadataCall, MetadataOutcome>>;
pub type FeedbackHook = Arc<dyn SessionHook<FeedbackCall, FeedbackOutcome>>;

/// The hooks installed on a manager, one optional hook per family.
#[derive(Clone, Default)]
pub struct Hooks {
    pub metadata: Option<MetadataHook>,
    pub feedback: Option<FeedbackHook>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("metadata", &self.metadata.is_some())
            .field("feedback", &self.feedback.is_some())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, hook: MetadataHook) -> Self {
        self.metadata = Some(hook);
        self
    }

    pub fn with_feedback(mut self, hook: FeedbackHook) -> Self {
        self.feedback = Some(hook);
        self
    }

    /// Install a closure as the metadata hook.
    pub fn with_metadata_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut Invocation<'_, MetadataCall, MetadataOutcome>) -> SessionDbResult<MetadataOutcome>
            + Send
            + Sync
            + 'static,
    {
        self.with_metadata(Arc::new(FnHook(f)))
    }

    /// Install a closure as the feedback hook.
    pub fn with_feedback_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut Invocation<'_, FeedbackCall, FeedbackOutcome>) -> SessionDbResult<FeedbackOutcome>
            + Send
            + Sync
            + 'static,
    {
        self.with_feedback(Arc::new(FnHook(f)))
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.feedback.is_none()
    }
}

/// Route `args` through `hook` (if any) to `original`.
pub(crate) fn dispatch<C, O, F>(
    hook: Option<&Arc<dyn SessionHook<C, O>>>,
    action: HookAction,
    session_id: &str,
    args: C,
    mut original: F,
) -> SessionDbResult<O>
where
    C: Clone,
    O: Clone,
    F: FnMut(C) -> SessionDbResult<O>,
{
    let Some(hook) = hook else {
        return original(args);
    };
    let mut invocation = Invocation {
        action,
        session_id,
        args,
        original: &mut original,
        succeeded: None,
    };
    match hook.call(&mut invocation) {
        Ok(value) => Ok(value),
        Err(err) => match invocation.succeeded.take() {
            Some(value) => {
                warn!(
                    %action,
                    session_id,
                    error = %err,
                    "hook failed after the operation succeeded; returning the operation's result"
                );
                Ok(value)
            }
            None => Err(err),
        },
    }
}

/// What a notification consumer receives after a successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub action: HookAction,
    pub session_id: String,
    /// `{"args": ..., "result": ...}` of the completed operation.
    pub payload: serde_json::Value,
}

/// Delivery target for [`NotificationHook`].
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> SessionDbResult<()>;
}

/// Runs the original operation, then publishes mutations to a [`Notifier`].
///
/// Delivery failures surface as hook errors after a successful original, so
/// they are logged and never undo the mutation.
pub struct NotificationHook {
    notifier: Arc<dyn Notifier>,
}

impl NotificationHook {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl<C, O> SessionHook<C, O> for NotificationHook
where
    C: Clone + Serialize,
    O: Clone + Serialize,
{
    fn call(&self, invocation: &mut Invocation<'_, C, O>) -> SessionDbResult<O> {
        let outcome = invocation.proceed()?;
        if invocation.action().is_mutation() {
            let mut payload = serde_json::Map::new();
            payload.insert("args".into(), serde_json::to_value(invocation.args())?);
            payload.insert("result".into(), serde_json::to_value(&outcome)?);
            self.notifier.notify(Notification {
                action: invocation.action(),
                session_id: invocation.session_id().to_string(),
                payload: serde_json::Value::Object(payload),
            })?;
        }
        Ok(outcome)
    }
}

/// A [`Notifier`] that forwards onto a channel drained by another thread.
pub struct ChannelNotifier {
    sender: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) -> SessionDbResult<()> {
        let action = notification.action;
        self.sender
            .send(notification)
            .map_err(|_| SessionDbError::hook(action.to_string(), "notification receiver dropped"))
    }
}

/// Logs every intercepted operation with its outcome and duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditHook;

impl<C: Clone, O: Clone> SessionHook<C, O> for AuditHook {
    fn call(&self, invocation: &mut Invocation<'_, C, O>) -> SessionDbResult<O> {
        let started = Instant::now();
        let result = invocation.proceed();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let action = invocation.action();
        let session_id = invocation.session_id();
        match &result {
            Ok(_) => info!(%action, session_id, elapsed_ms, "session operation completed"),
            Err(err) => warn!(%action, session_id, elapsed_ms, error = %err, "session operation failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use sessiondb_core::MetadataValue;
    use sessiondb_core::metadata::metadata;
    use tracing_test::traced_test;

    use super::*;

    fn patch() -> MetadataCall {
        MetadataCall::Update(metadata([("tier", MetadataValue::from("gold"))]))
    }

    #[derive(Default)]
    struct Capture {
        seen: Mutex<Vec<Notification>>,
        fail: bool,
    }

    impl Notifier for Capture {
        fn notify(&self, notification: Notification) -> SessionDbResult<()> {
            if self.fail {
                return Err(SessionDbError::hook(notification.action.to_string(), "queue offline"));
            }
            self.seen.lock().push(notification);
            Ok(())
        }
    }

    #[test]
    fn action_names_are_snake_case() {
        assert_eq!(HookAction::UpdateMetadata.to_string(), "update_metadata");
        assert_eq!(HookAction::from_str("get_feedbacks").unwrap(), HookAction::GetFeedbacks);
        assert!(HookAction::AddFeedback.is_mutation());
        assert!(!HookAction::GetMetadata.is_mutation());
    }

    #[test]
    fn without_a_hook_the_original_runs() {
        let calls = AtomicUsize::new(0);
        let result = dispatch::<MetadataCall, MetadataOutcome, _>(
            None,
            HookAction::UpdateMetadata,
            "s1",
            patch(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(MetadataOutcome::Updated(true))
            },
        );
        assert_eq!(result.unwrap(), MetadataOutcome::Updated(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn failure_after_original_returns_original_result() {
        let hooks = Hooks::new().with_metadata_fn(|inv| {
            inv.proceed()?;
            Err(SessionDbError::hook(inv.action().to_string(), "webhook down"))
        });
        let result = dispatch(
            hooks.metadata.as_ref(),
            HookAction::UpdateMetadata,
            "s1",
            patch(),
            |_| Ok(MetadataOutcome::Updated(true)),
        );
        assert_eq!(result.unwrap(), MetadataOutcome::Updated(true));
        assert!(logs_contain("hook failed after the operation succeeded"));
        assert!(logs_contain("webhook down"));
    }

    #[test]
    fn failure_before_original_propagates() {
        let calls = AtomicUsize::new(0);
        let hooks = Hooks::new().with_metadata_fn(|inv| {
            Err(SessionDbError::hook(inv.action().to_string(), "rejected"))
        });
        let err = dispatch(
            hooks.metadata.as_ref(),
            HookAction::UpdateMetadata,
            "s1",
            patch(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(MetadataOutcome::Updated(true))
            },
        )
        .unwrap_err();
        assert!(matches!(err, SessionDbError::Hook { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_original_is_not_masked() {
        let hooks = Hooks::new().with_metadata_fn(|inv| inv.proceed());
        let err = dispatch(
            hooks.metadata.as_ref(),
            HookAction::GetMetadata,
            "s1",
            MetadataCall::Get,
            |_| Err(SessionDbError::ClientClosed),
        )
        .unwrap_err();
        assert!(matches!(err, SessionDbError::ClientClosed));
    }

    #[test]
    fn proceed_with_replaces_arguments() {
        let hooks = Hooks::new().with_metadata_fn(|inv| {
            let mut call = inv.args().clone();
            if let MetadataCall::Update(patch) = &mut call {
                patch.insert("audited".into(), MetadataValue::from(true));
            }
            inv.proceed_with(call)
        });
        let seen = Mutex::new(None);
        dispatch(
            hooks.metadata.as_ref(),
            HookAction::UpdateMetadata,
            "s1",
            patch(),
            |call| {
                *seen.lock() = Some(call);
                Ok(MetadataOutcome::Updated(true))
            },
        )
        .unwrap();
        let Some(MetadataCall::Update(applied)) = seen.lock().take() else {
            panic!("original did not receive an update");
        };
        assert_eq!(applied["audited"], MetadataValue::from(true));
        assert_eq!(applied["tier"], MetadataValue::from("gold"));
    }

    #[test]
    fn notification_hook_publishes_mutations_only() {
        let capture = Arc::new(Capture::default());
        let hooks = Hooks::new().with_metadata(Arc::new(NotificationHook::new(capture.clone())));

        dispatch(
            hooks.metadata.as_ref(),
            HookAction::GetMetadata,
            "s1",
            MetadataCall::Get,
            |_| Ok(MetadataOutcome::Metadata(None)),
        )
        .unwrap();
        assert!(capture.seen.lock().is_empty());

        dispatch(
            hooks.metadata.as_ref(),
            HookAction::UpdateMetadata,
            "s1",
            patch(),
            |_| Ok(MetadataOutcome::Updated(true)),
        )
        .unwrap();
        let seen = capture.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].action, HookAction::UpdateMetadata);
        assert_eq!(seen[0].session_id, "s1");
        assert_eq!(seen[0].payload["args"]["tier"], "gold");
        assert_eq!(seen[0].payload["result"], true);
    }

    #[test]
    #[traced_test]
    fn notifier_failure_does_not_undo_the_mutation() {
        let capture = Arc::new(Capture {
            fail: true,
            ..Capture::default()
        });
        let hooks = Hooks::new().with_feedback(Arc::new(NotificationHook::new(capture)));
        let result = dispatch(
            hooks.feedback.as_ref(),
            HookAction::AddFeedback,
            "s1",
            FeedbackCall::Add {
                rating: Some(Rating::Up),
                comment: None,
            },
            |_| Ok(FeedbackOutcome::Added(None)),
        );
        assert_eq!(result.unwrap(), FeedbackOutcome::Added(None));
        assert!(logs_contain("queue offline"));
    }

    #[test]
    fn channel_notifier_delivers_to_receiver() {
        let (notifier, receiver) = ChannelNotifier::new();
        let hook = NotificationHook::new(Arc::new(notifier));
        let hooks = Hooks::new().with_feedback(Arc::new(hook));
        dispatch(
            hooks.feedback.as_ref(),
            HookAction::AddFeedback,
            "s9",
            FeedbackCall::Add {
                rating: Some(Rating::Down),
                comment: Some("slow".into()),
            },
            |_| Ok(FeedbackOutcome::Added(None)),
        )
        .unwrap();
        let received = std::thread::spawn(move || receiver.recv().unwrap())
            .join()
            .unwrap();
        assert_eq!(received.session_id, "s9");
        assert_eq!(received.payload["args"]["rating"], "down");
        assert_eq!(received.payload["args"]["comment"], "slow");
    }

    #[test]
    #[traced_test]
    fn audit_hook_logs_and_passes_through() {
        let hooks = Hooks::new().with_metadata(Arc::new(AuditHook));
        let result = dispatch(
            hooks.metadata.as_ref(),
            HookAction::DeleteMetadata,
            "s1",
            MetadataCall::Delete(vec!["tier".into()]),
            |_| Ok(MetadataOutcome::Deleted(true)),
        );
        assert_eq!(result.unwrap(), MetadataOutcome::Deleted(true));
        assert!(logs_contain("session operation completed"));
        assert!(logs_contain("delete_metadata"));
    }

    #[test]
    fn debug_shows_installed_families() {
        let hooks = Hooks::new().with_metadata(Arc::new(AuditHook));
        assert_eq!(format!("{hooks:?}"), "Hooks { metadata: true, feedback: false }");
        assert!(Hooks::default().is_empty());
    }
}
