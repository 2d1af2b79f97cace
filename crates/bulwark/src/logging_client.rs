//! Moderation client that only logs.

use async_trait::async_trait;
use bulwark_error::ModerationResult;
use bulwark_interface::ModerationClient;
use tracing::{info, instrument};

/// [`ModerationClient`] that records every side effect as a tracing event.
///
/// Used by the `bulwark run` binary, which has no chat transport attached.
#[derive(Debug, Clone)]
pub struct LoggingModerationClient {
    administrator: bool,
}

impl LoggingModerationClient {
    /// Client that reports server admin rights as `administrator`.
    pub fn new(administrator: bool) -> Self {
        Self { administrator }
    }
}

impl Default for LoggingModerationClient {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ModerationClient for LoggingModerationClient {
    #[instrument(skip(self, text))]
    async fn send_notice(&self, channel: &str, text: &str) -> ModerationResult<()> {
        info!(notice = text, "Notice sent");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn redact_message(&self, room_id: &str, message_id: &str) -> ModerationResult<()> {
        info!("Message redacted");
        Ok(())
    }

    #[instrument(skip(self, reason))]
    async fn ban_user(
        &self,
        room_id: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> ModerationResult<()> {
        info!(reason = ?reason, "User banned");
        Ok(())
    }

    async fn is_administrator(&self) -> ModerationResult<bool> {
        Ok(self.administrator)
    }

    #[instrument(skip(self))]
    async fn lock_account(&self, user_id: &str) -> ModerationResult<()> {
        info!("Account locked");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn suspend_account(&self, user_id: &str) -> ModerationResult<()> {
        info!("Account suspended");
        Ok(())
    }
}
