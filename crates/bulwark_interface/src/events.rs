//! Inbound events delivered to protections.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// A user flagged a message as abusive.
///
/// # Example
///
/// ```
/// use bulwark_interface::ReportEvent;
///
/// let report = ReportEvent::new("$m1", "@alice:example.org", "!room:example.org", "@spammer:example.org");
/// assert_eq!(report.reporter_id(), "@alice:example.org");
/// assert!(report.reason().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_new::new)]
pub struct ReportEvent {
    /// Reported message
    #[new(into)]
    message_id: String,
    /// User who filed the report
    #[new(into)]
    reporter_id: String,
    /// Room the message lives in
    #[new(into)]
    room_id: String,
    /// Sender of the reported message
    #[new(into)]
    author_id: String,
    /// Free-text reason supplied by the reporter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[new(default)]
    reason: Option<String>,
}

impl ReportEvent {
    /// Attach the reporter's stated reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A message observed in a protected room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_new::new)]
pub struct RoomEvent {
    /// Event identifier
    #[new(into)]
    event_id: String,
    /// Room the event was sent to
    #[new(into)]
    room_id: String,
    /// Sending user
    #[new(into)]
    sender: String,
}
