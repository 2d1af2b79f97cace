//! Performs moderation actions and posts audit notices.

use crate::{ActionKind, ThresholdCrossing};
use bulwark_error::{ModerationError, ProtectionError, ProtectionErrorKind};
use bulwark_interface::ReportEvent;
use bulwark_protection::ProtectionContext;
use derive_getters::Getters;
use std::collections::BTreeSet;
use tracing::{error, info, instrument, warn};

/// Ban reason used when a report threshold triggers a ban.
const REPORT_BAN_REASON: &str = "reported by trusted users";

/// Who and what an action targets.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ActionRequest {
    /// Room the offence happened in
    room_id: String,
    /// Messages to redact
    message_ids: Vec<String>,
    /// User to ban
    user_id: String,
    /// Reason recorded with a ban
    reason: Option<String>,
}

impl ActionRequest {
    /// Target `user_id`'s `message_ids` in `room_id`.
    pub fn new(
        room_id: impl Into<String>,
        message_ids: Vec<String>,
        user_id: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            message_ids,
            user_id: user_id.into(),
            reason,
        }
    }
}

/// Result of one attempted action.
#[derive(Debug, Clone, Getters)]
pub struct ActionOutcome {
    /// Action attempted
    action: ActionKind,
    /// First failure, if the moderation API refused
    error: Option<ProtectionError>,
}

impl ActionOutcome {
    /// True if every call for this action succeeded.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    fn describe(&self) -> String {
        match &self.error {
            None => self.action.to_string(),
            Some(e) => match &e.kind {
                ProtectionErrorKind::ActionFailed { reason, .. } => {
                    format!("{} (failed: {})", self.action, reason)
                }
                other => format!("{} (failed: {})", self.action, other),
            },
        }
    }
}

/// Everything a dispatch attempted.
#[derive(Debug, Clone, Getters)]
pub struct DispatchReport {
    /// Per-action results, in the order they ran
    outcomes: Vec<ActionOutcome>,
    /// Audit notice text
    notice: String,
    /// Whether the notice reached the management room
    notice_sent: bool,
}

/// Performs actions through the context's moderation client.
///
/// Redact and ban are best-effort: a failure is logged with the action and
/// target, recorded in the [`DispatchReport`], and never suppresses the
/// audit notice, which lists what was attempted.
pub struct ActionDispatcher<'a> {
    context: &'a ProtectionContext,
}

impl<'a> ActionDispatcher<'a> {
    /// Dispatcher acting through `context`.
    pub fn new(context: &'a ProtectionContext) -> Self {
        Self { context }
    }

    /// Perform a single action.
    #[instrument(skip(self, request), fields(room_id = %request.room_id, user_id = %request.user_id))]
    pub async fn perform(&self, action: ActionKind, request: &ActionRequest) -> ActionOutcome {
        let client = self.context.client();
        let mut first_error = None;
        match action {
            ActionKind::Alert => {}
            ActionKind::Redact => {
                for message_id in &request.message_ids {
                    if let Err(e) = client.redact_message(&request.room_id, message_id).await {
                        let e = action_failed(action, message_id, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
            ActionKind::Ban => {
                if let Err(e) = client
                    .ban_user(&request.room_id, &request.user_id, request.reason.as_deref())
                    .await
                {
                    first_error = Some(action_failed(action, &request.user_id, e));
                }
            }
        }
        if first_error.is_none() {
            info!(action = %action, "Moderation action performed");
        }
        ActionOutcome {
            action,
            error: first_error,
        }
    }

    /// Post `text` to the management room; failures are logged, not returned.
    pub async fn notify(&self, text: &str) -> bool {
        let channel = self.context.management_room();
        match self.context.client().send_notice(channel, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Failed to send audit notice");
                false
            }
        }
    }

    /// Run `actions` in severity order, then post one notice
    /// `"<summary>. actions: <list>"`.
    pub async fn dispatch(
        &self,
        actions: &BTreeSet<ActionKind>,
        request: &ActionRequest,
        summary: &str,
    ) -> DispatchReport {
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            outcomes.push(self.perform(*action, request).await);
        }
        let described: Vec<String> = outcomes.iter().map(ActionOutcome::describe).collect();
        let notice = format!("{}. actions: {}", summary, described.join(", "));
        let notice_sent = self.notify(&notice).await;
        DispatchReport {
            outcomes,
            notice,
            notice_sent,
        }
    }

    /// Act on a report-threshold crossing for the message in `report`.
    #[instrument(skip(self, crossing, report), fields(message_id = %crossing.message_id()))]
    pub async fn dispatch_crossing(
        &self,
        crossing: &ThresholdCrossing,
        report: &ReportEvent,
    ) -> DispatchReport {
        let request = ActionRequest::new(
            report.room_id().clone(),
            vec![crossing.message_id().clone()],
            report.author_id().clone(),
            Some(REPORT_BAN_REASON.to_string()),
        );
        let summary = format!(
            "message {} in {} reported by {}",
            crossing.message_id(),
            report.room_id(),
            crossing.sorted_reporters().join(", ")
        );
        self.dispatch(crossing.actions(), &request, &summary).await
    }
}

fn action_failed(action: ActionKind, target: &str, source: ModerationError) -> ProtectionError {
    error!(action = %action, target_id = %target, error = %source, "Moderation action failed");
    ProtectionError::new(ProtectionErrorKind::ActionFailed {
        action: action.to_string(),
        target: target.to_string(),
        reason: source.kind.to_string(),
    })
}
