// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A notifier that records what it is given.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sessiondb_core::{SessionDbError, SessionDbResult};
use sessiondb_session::{Notification, Notifier};

/// Captures notifications for assertions. When set to fail, it records
/// nothing and returns a hook error, like an unreachable downstream queue.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that fails every delivery.
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().len()
    }

    pub fn clear(&self) {
        self.received.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> SessionDbResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionDbError::hook(
                notification.action.to_string(),
                "notification delivery failed",
            ));
        }
        self.received.lock().push(notification);
        Ok(())
    }
}
