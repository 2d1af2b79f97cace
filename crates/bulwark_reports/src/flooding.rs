//! Event protection against users posting too fast.

use crate::{ACTION_CHOICES, ActionDispatcher, ActionKind, ActionRequest};
use async_trait::async_trait;
use bulwark_error::{ProtectionError, ProtectionErrorKind, ProtectionResult};
use bulwark_interface::RoomEvent;
use bulwark_protection::{
    Capability, EventHandler, Protection, ProtectionContext, ProtectionSettings, SettingType,
    SharedSettings, shared_settings,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

const MAX_PER_MINUTE: &str = "maxPerMinute";
const ACTION: &str = "action";
const REASON: &str = "reason";

const WINDOW: Duration = Duration::from_secs(60);

type SenderKey = (String, String);

#[derive(Debug, Default)]
struct FloodState {
    // Keys in insertion order; front is the oldest.
    order: VecDeque<SenderKey>,
    windows: HashMap<SenderKey, VecDeque<(Instant, String)>>,
}

/// Acts against a sender who posts more than `maxPerMinute` messages in a
/// room within a sliding minute.
///
/// The action fires once per flood: the sender's window is cleared when it
/// fires, so the next action needs another full burst.
pub struct BasicFlooding {
    settings: SharedSettings,
    capacity: usize,
    state: Mutex<FloodState>,
}

impl BasicFlooding {
    /// Registry name.
    pub const NAME: &'static str = "BasicFlooding";

    /// Protection tracking at most `capacity` (room, sender) pairs.
    pub fn new(capacity: usize) -> Self {
        Self {
            settings: shared_settings(Self::declare_settings()),
            capacity: capacity.max(1),
            state: Mutex::new(FloodState::default()),
        }
    }

    /// Settings declared by this protection, at their defaults.
    pub fn declare_settings() -> ProtectionSettings {
        ProtectionSettings::new(Self::NAME)
            .with(MAX_PER_MINUTE, SettingType::bounded_number(10, Some(1), None))
            .with(ACTION, SettingType::choice(ACTION_CHOICES, "ban"))
            .with(REASON, SettingType::text("spam"))
    }

    /// Number of (room, sender) pairs currently tracked.
    pub fn tracked(&self) -> usize {
        self.state.lock().windows.len()
    }

    /// Record a message at `now`; returns the window's event ids if the
    /// sender just exceeded `limit`.
    fn observe(&self, event: &RoomEvent, limit: usize, now: Instant) -> Option<Vec<String>> {
        let key = (event.room_id().clone(), event.sender().clone());
        let mut state = self.state.lock();

        if !state.windows.contains_key(&key) {
            state.order.push_back(key.clone());
            state.windows.insert(key.clone(), VecDeque::new());
            if state.order.len() > self.capacity
                && let Some(oldest) = state.order.pop_front()
            {
                state.windows.remove(&oldest);
            }
        }

        let window = state.windows.get_mut(&key)?;
        window.push_back((now, event.event_id().clone()));
        while window
            .front()
            .is_some_and(|(at, _)| now.saturating_duration_since(*at) >= WINDOW)
        {
            window.pop_front();
        }
        if window.len() <= limit {
            return None;
        }
        Some(window.drain(..).map(|(_, id)| id).collect())
    }
}

#[async_trait]
impl EventHandler for BasicFlooding {
    #[instrument(
        skip(self, context, event),
        fields(room_id = %event.room_id(), sender = %event.sender())
    )]
    async fn handle_event(
        &self,
        context: &ProtectionContext,
        event: &RoomEvent,
    ) -> ProtectionResult<()> {
        let (limit, action, reason) = {
            let settings = self.settings.read();
            let limit = usize::try_from(settings.number(MAX_PER_MINUTE)?).unwrap_or(usize::MAX);
            let action = settings.text(ACTION)?;
            let action = ActionKind::from_str(action).map_err(|e| {
                ProtectionError::new(ProtectionErrorKind::InvalidValue {
                    setting: ACTION.to_string(),
                    value: action.to_string(),
                    reason: e.to_string(),
                })
            })?;
            (limit, action, settings.text(REASON)?.to_string())
        };

        let Some(message_ids) = self.observe(event, limit, Instant::now()) else {
            debug!("Within flood limit");
            return Ok(());
        };
        info!(count = message_ids.len(), action = %action, "Flood detected");

        let summary = format!(
            "{} flooded {} with {} messages in under a minute",
            event.sender(),
            event.room_id(),
            message_ids.len()
        );
        let request = ActionRequest::new(
            event.room_id().clone(),
            message_ids,
            event.sender().clone(),
            Some(reason),
        );
        ActionDispatcher::new(context)
            .dispatch(&BTreeSet::from([action]), &request, &summary)
            .await;
        Ok(())
    }
}

impl Protection for BasicFlooding {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Take action against users who post more than a set number of messages per minute"
    }

    fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    fn capability(&self) -> Capability<'_> {
        Capability::Events(self)
    }
}
