//! The protection capability model.

use crate::ProtectionSettings;
use async_trait::async_trait;
use bulwark_error::ProtectionResult;
use bulwark_interface::{ModerationClient, ReportEvent, RoomEvent};
use derive_getters::Getters;
use parking_lot::RwLock;
use std::sync::Arc;

/// Settings object shared between a running protection and the registry.
///
/// The registry replaces the whole value on a live patch, so handlers that
/// take a read guard always see one consistent snapshot.
pub type SharedSettings = Arc<RwLock<ProtectionSettings>>;

/// Wrap freshly declared settings for sharing.
pub fn shared_settings(settings: ProtectionSettings) -> SharedSettings {
    Arc::new(RwLock::new(settings))
}

/// What a handler needs to act on the outside world.
#[derive(Clone, Getters)]
pub struct ProtectionContext {
    /// Moderation API used for notices and actions
    client: Arc<dyn ModerationClient>,
    /// Operator-facing channel that receives audit notices
    management_room: String,
}

impl ProtectionContext {
    /// Create a context around `client` that audits to `management_room`.
    pub fn new(client: Arc<dyn ModerationClient>, management_room: impl Into<String>) -> Self {
        Self {
            client,
            management_room: management_room.into(),
        }
    }
}

/// Handles abuse reports.
#[async_trait]
pub trait ReportHandler: Send + Sync {
    /// React to one report.
    ///
    /// # Errors
    ///
    /// Returns an error only when the report could not be evaluated at all
    /// (for example unreadable settings). Failed moderation actions are
    /// best-effort and logged instead.
    async fn handle_report(
        &self,
        context: &ProtectionContext,
        report: &ReportEvent,
    ) -> ProtectionResult<()>;
}

/// Handles ordinary room events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// React to one room event.
    ///
    /// # Errors
    ///
    /// Same contract as [`ReportHandler::handle_report`].
    async fn handle_event(
        &self,
        context: &ProtectionContext,
        event: &RoomEvent,
    ) -> ProtectionResult<()>;
}

/// The set of event streams a protection consumes.
#[derive(Clone, Copy)]
pub enum Capability<'a> {
    /// Abuse reports only
    Reports(&'a dyn ReportHandler),
    /// Room events only
    Events(&'a dyn EventHandler),
    /// Both streams
    Both {
        /// Report handler
        reports: &'a dyn ReportHandler,
        /// Event handler
        events: &'a dyn EventHandler,
    },
}

impl<'a> Capability<'a> {
    /// The report handler, if reports are consumed.
    pub fn reports(self) -> Option<&'a dyn ReportHandler> {
        match self {
            Self::Reports(handler) | Self::Both { reports: handler, .. } => Some(handler),
            Self::Events(_) => None,
        }
    }

    /// The event handler, if room events are consumed.
    pub fn events(self) -> Option<&'a dyn EventHandler> {
        match self {
            Self::Events(handler) | Self::Both { events: handler, .. } => Some(handler),
            Self::Reports(_) => None,
        }
    }
}

/// A pluggable moderation-policy unit.
///
/// Whether a protection is enabled is tracked by the
/// [`ProtectionRegistry`](crate::ProtectionRegistry), not by the protection;
/// a disabled protection still exists and can be reconfigured.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use bulwark_error::ProtectionResult;
/// use bulwark_interface::ReportEvent;
/// use bulwark_protection::{
///     Capability, Protection, ProtectionContext, ProtectionSettings, ReportHandler,
///     SettingType, SharedSettings, shared_settings,
/// };
///
/// struct CountReports {
///     settings: SharedSettings,
/// }
///
/// #[async_trait]
/// impl ReportHandler for CountReports {
///     async fn handle_report(&self, _: &ProtectionContext, _: &ReportEvent) -> ProtectionResult<()> {
///         Ok(())
///     }
/// }
///
/// impl Protection for CountReports {
///     fn name(&self) -> &str { "CountReports" }
///     fn description(&self) -> &str { "Counts reports" }
///     fn settings(&self) -> &SharedSettings { &self.settings }
///     fn capability(&self) -> Capability<'_> { Capability::Reports(self) }
/// }
///
/// let p = CountReports {
///     settings: shared_settings(
///         ProtectionSettings::new("CountReports").with("limit", SettingType::number(1)),
///     ),
/// };
/// assert!(p.capability().reports().is_some());
/// assert!(p.capability().events().is_none());
/// ```
pub trait Protection: Send + Sync {
    /// Globally unique name.
    fn name(&self) -> &str;

    /// One-line human description.
    fn description(&self) -> &str;

    /// Live settings read by the handlers.
    fn settings(&self) -> &SharedSettings;

    /// Event streams this protection consumes.
    fn capability(&self) -> Capability<'_>;
}
