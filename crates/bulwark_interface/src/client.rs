//! Contract for the moderation primitives provided by the chat transport.

use async_trait::async_trait;
use bulwark_error::ModerationResult;

/// Side-effecting moderation API.
///
/// Implementations wrap the homeserver client. Every call may fail with a
/// permission or network error; callers treat failures as best-effort and
/// log them rather than rolling back their own state.
///
/// # Tracing
///
/// Implementations should instrument each method with the target ids as
/// span fields and emit `error!` with context on failure.
#[async_trait]
pub trait ModerationClient: Send + Sync {
    /// Deliver an operator-facing notice to `channel`.
    async fn send_notice(&self, channel: &str, text: &str) -> ModerationResult<()>;

    /// Remove a message's content from its room.
    async fn redact_message(&self, room_id: &str, message_id: &str) -> ModerationResult<()>;

    /// Remove a user from a room.
    async fn ban_user(
        &self,
        room_id: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> ModerationResult<()>;

    /// Whether the bot may use the server administration API.
    async fn is_administrator(&self) -> ModerationResult<bool>;

    /// Lock an account so it can no longer log in.
    async fn lock_account(&self, user_id: &str) -> ModerationResult<()>;

    /// Suspend an account, leaving it read-only.
    async fn suspend_account(&self, user_id: &str) -> ModerationResult<()>;
}
