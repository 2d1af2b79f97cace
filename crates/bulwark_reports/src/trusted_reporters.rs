//! Report protection that counts reports from trusted users.

use crate::{ACTION_CHOICES, ActionDispatcher, ActionKind, ReportAggregator, ThresholdPlan};
use async_trait::async_trait;
use bulwark_error::{ProtectionError, ProtectionErrorKind, ProtectionResult};
use bulwark_interface::ReportEvent;
use bulwark_protection::{
    Capability, Protection, ProtectionContext, ProtectionSettings, ReportHandler, SettingType,
    SharedSettings, shared_settings,
};
use std::str::FromStr;
use tracing::{debug, instrument};

const MXIDS: &str = "mxids";
const THRESHOLD: &str = "threshold";
const ACTION: &str = "action";
const PER_KIND: [(&str, ActionKind); 3] = [
    ("alertThreshold", ActionKind::Alert),
    ("redactThreshold", ActionKind::Redact),
    ("banThreshold", ActionKind::Ban),
];

/// Counts reports from users listed in `mxids` and acts once a message has
/// been reported by enough of them.
pub struct TrustedReporters {
    settings: SharedSettings,
    aggregator: ReportAggregator,
}

impl TrustedReporters {
    /// Registry name.
    pub const NAME: &'static str = "TrustedReporters";

    /// Protection tracking at most `capacity` reported messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            settings: shared_settings(Self::declare_settings()),
            aggregator: ReportAggregator::new(capacity),
        }
    }

    /// Settings declared by this protection, at their defaults.
    pub fn declare_settings() -> ProtectionSettings {
        let mut settings = ProtectionSettings::new(Self::NAME)
            .with(MXIDS, SettingType::user_ids())
            .with(THRESHOLD, SettingType::number(3))
            .with(ACTION, SettingType::choice(ACTION_CHOICES, "alert"));
        for (name, _) in PER_KIND {
            settings = settings.with(name, SettingType::number(-1));
        }
        settings
    }

    /// Aggregator holding the per-message reporter sets.
    pub fn aggregator(&self) -> &ReportAggregator {
        &self.aggregator
    }

    /// Trust check and threshold plan from the current settings.
    fn snapshot(&self, reporter_id: &str) -> ProtectionResult<Option<ThresholdPlan>> {
        let settings = self.settings.read();
        if !settings.list(MXIDS)?.iter().any(|id| id == reporter_id) {
            return Ok(None);
        }
        let action = settings.text(ACTION)?;
        let action = ActionKind::from_str(action).map_err(|e| {
            ProtectionError::new(ProtectionErrorKind::InvalidValue {
                setting: ACTION.to_string(),
                value: action.to_string(),
                reason: e.to_string(),
            })
        })?;
        let mut plan = ThresholdPlan::new().with(action, settings.number(THRESHOLD)?);
        for (name, kind) in PER_KIND {
            plan = plan.with(kind, settings.number(name)?);
        }
        Ok(Some(plan))
    }
}

#[async_trait]
impl ReportHandler for TrustedReporters {
    #[instrument(
        skip(self, context, report),
        fields(message_id = %report.message_id(), reporter_id = %report.reporter_id())
    )]
    async fn handle_report(
        &self,
        context: &ProtectionContext,
        report: &ReportEvent,
    ) -> ProtectionResult<()> {
        let Some(plan) = self.snapshot(report.reporter_id())? else {
            debug!("Reporter is not trusted, ignoring report");
            return Ok(());
        };
        let Some(crossing) =
            self.aggregator
                .record_report(report.message_id(), report.reporter_id(), &plan)
        else {
            return Ok(());
        };
        ActionDispatcher::new(context)
            .dispatch_crossing(&crossing, report)
            .await;
        Ok(())
    }
}

impl Protection for TrustedReporters {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Count reports from trusted reporters and take a configured action"
    }

    fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    fn capability(&self) -> Capability<'_> {
        Capability::Reports(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(protection: &TrustedReporters, name: &str, text: &str) {
        let mut settings = protection.settings().write();
        let value = settings.parse(name, text).unwrap();
        settings.set(name, value).unwrap();
    }

    #[test]
    fn test_defaults() {
        let settings = TrustedReporters::declare_settings();
        assert_eq!(settings.number("threshold").unwrap(), 3);
        assert_eq!(settings.text("action").unwrap(), "alert");
        assert!(settings.list("mxids").unwrap().is_empty());
        assert_eq!(settings.number("banThreshold").unwrap(), -1);
    }

    #[test]
    fn test_untrusted_reporter_has_no_plan() {
        let protection = TrustedReporters::new(20);
        set(&protection, "mxids", "@a:example.org");
        assert!(protection.snapshot("@z:example.org").unwrap().is_none());
        assert!(protection.snapshot("@a:example.org").unwrap().is_some());
    }

    #[test]
    fn test_plan_combines_action_and_per_kind_thresholds() {
        let protection = TrustedReporters::new(20);
        set(&protection, "mxids", "@a:example.org");
        set(&protection, "action", "ban");
        set(&protection, "threshold", "4");
        set(&protection, "alertThreshold", "1");
        set(&protection, "banThreshold", "2");

        let plan = protection.snapshot("@a:example.org").unwrap().unwrap();
        assert_eq!(plan.threshold(ActionKind::Alert), Some(1));
        assert_eq!(plan.threshold(ActionKind::Redact), None);
        assert_eq!(plan.threshold(ActionKind::Ban), Some(2));
    }
}
