//! In-memory [`ModerationClient`] that records every call.

use crate::ModerationClient;
use async_trait::async_trait;
use bulwark_error::{ModerationError, ModerationErrorKind, ModerationResult};
use parking_lot::Mutex;
use std::collections::HashSet;

/// A call observed by [`RecordingModerationClient`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModerationCall {
    /// `send_notice(channel, text)`
    Notice {
        /// Destination channel
        channel: String,
        /// Notice body
        text: String,
    },
    /// `redact_message(room_id, message_id)`
    Redact {
        /// Room of the message
        room_id: String,
        /// Redacted message
        message_id: String,
    },
    /// `ban_user(room_id, user_id, reason)`
    Ban {
        /// Room the user was removed from
        room_id: String,
        /// Banned user
        user_id: String,
        /// Ban reason, if any
        reason: Option<String>,
    },
    /// `lock_account(user_id)`
    Lock(String),
    /// `suspend_account(user_id)`
    Suspend(String),
}

/// Operation names accepted by [`RecordingModerationClient::fail_on`].
const OPERATIONS: &[&str] = &["notice", "redact", "ban", "lock", "suspend"];

/// Records calls and optionally fails chosen operations.
///
/// Failing calls are still recorded, so tests can assert that an action was
/// attempted.
#[derive(Debug)]
pub struct RecordingModerationClient {
    calls: Mutex<Vec<ModerationCall>>,
    failing: Mutex<HashSet<&'static str>>,
    administrator: bool,
}

impl RecordingModerationClient {
    /// Client that succeeds at everything and reports admin rights.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            administrator: true,
        }
    }

    /// Client without server admin rights.
    pub fn without_admin() -> Self {
        Self {
            administrator: false,
            ..Self::new()
        }
    }

    /// Make `operation` ("notice", "redact", "ban", "lock", "suspend") fail.
    pub fn fail_on(&self, operation: &str) {
        if let Some(op) = OPERATIONS.iter().copied().find(|op| *op == operation) {
            self.failing.lock().insert(op);
        }
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<ModerationCall> {
        self.calls.lock().clone()
    }

    /// Notice bodies sent so far.
    pub fn notices(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ModerationCall::Notice { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, operation: &str, call: ModerationCall) -> ModerationResult<()> {
        self.calls.lock().push(call);
        if self.failing.lock().contains(operation) {
            return Err(ModerationError::new(ModerationErrorKind::PermissionDenied(
                format!("{} refused", operation),
            )));
        }
        Ok(())
    }
}

impl Default for RecordingModerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModerationClient for RecordingModerationClient {
    async fn send_notice(&self, channel: &str, text: &str) -> ModerationResult<()> {
        self.record(
            "notice",
            ModerationCall::Notice {
                channel: channel.to_string(),
                text: text.to_string(),
            },
        )
    }

    async fn redact_message(&self, room_id: &str, message_id: &str) -> ModerationResult<()> {
        self.record(
            "redact",
            ModerationCall::Redact {
                room_id: room_id.to_string(),
                message_id: message_id.to_string(),
            },
        )
    }

    async fn ban_user(
        &self,
        room_id: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> ModerationResult<()> {
        self.record(
            "ban",
            ModerationCall::Ban {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                reason: reason.map(str::to_string),
            },
        )
    }

    async fn is_administrator(&self) -> ModerationResult<bool> {
        Ok(self.administrator)
    }

    async fn lock_account(&self, user_id: &str) -> ModerationResult<()> {
        self.record("lock", ModerationCall::Lock(user_id.to_string()))
    }

    async fn suspend_account(&self, user_id: &str) -> ModerationResult<()> {
        self.record("suspend", ModerationCall::Suspend(user_id.to_string()))
    }
}
