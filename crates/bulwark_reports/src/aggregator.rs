//! Bounded per-message report aggregation.

use crate::ActionKind;
use derive_getters::Getters;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, instrument};

/// Messages tracked at once unless configured otherwise.
pub const DEFAULT_REPORT_CAPACITY: usize = 20;

/// Distinct reporters seen for one message, plus the actions already fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct ReportRecord {
    /// Reporter ids in first-report order, each at most once
    reporters: Vec<String>,
    /// Actions that have fired for this message
    fired: BTreeSet<ActionKind>,
}

impl ReportRecord {
    /// Number of distinct reporters.
    pub fn count(&self) -> usize {
        self.reporters.len()
    }

    fn add(&mut self, reporter: &str) -> bool {
        if self.reporters.iter().any(|r| r == reporter) {
            return false;
        }
        self.reporters.push(reporter.to_string());
        true
    }
}

/// Report count at which each action fires.
///
/// Thresholds of zero or below mean "disabled". When an action is given
/// twice, the lower threshold wins.
///
/// # Example
///
/// ```
/// use bulwark_reports::{ActionKind, ThresholdPlan};
///
/// let plan = ThresholdPlan::new()
///     .with(ActionKind::Alert, 3)
///     .with(ActionKind::Ban, -1)
///     .with(ActionKind::Alert, 2);
/// assert_eq!(plan.threshold(ActionKind::Alert), Some(2));
/// assert_eq!(plan.threshold(ActionKind::Ban), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdPlan {
    thresholds: BTreeMap<ActionKind, usize>,
}

impl ThresholdPlan {
    /// Plan with no actions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `action` at `threshold` reports.
    pub fn with(mut self, action: ActionKind, threshold: i64) -> Self {
        let Ok(threshold) = usize::try_from(threshold) else {
            return self;
        };
        if threshold == 0 {
            return self;
        }
        self.thresholds
            .entry(action)
            .and_modify(|existing| *existing = (*existing).min(threshold))
            .or_insert(threshold);
        self
    }

    /// Threshold for `action`, if enabled.
    pub fn threshold(&self, action: ActionKind) -> Option<usize> {
        self.thresholds.get(&action).copied()
    }

    /// True when no action is enabled.
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Enabled actions with their thresholds, in severity order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionKind, usize)> + '_ {
        self.thresholds.iter().map(|(action, n)| (*action, *n))
    }
}

/// A report that pushed a message across one or more thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ThresholdCrossing {
    /// Message that crossed
    message_id: String,
    /// Every distinct reporter so far, in first-report order
    reporters: Vec<String>,
    /// Actions crossed by this report and not fired before
    actions: BTreeSet<ActionKind>,
}

impl ThresholdCrossing {
    /// Reporters sorted for display.
    pub fn sorted_reporters(&self) -> Vec<String> {
        let mut sorted = self.reporters.clone();
        sorted.sort();
        sorted
    }
}

#[derive(Debug, Default)]
struct AggregatorState {
    // Message ids in insertion order; front is the oldest.
    order: VecDeque<String>,
    records: HashMap<String, ReportRecord>,
}

/// Maps message ids to the distinct reporters seen recently.
///
/// At most `capacity` messages are tracked. When a new message would exceed
/// the bound, the message that was *inserted* first is forgotten, regardless
/// of how recently it was reported again.
///
/// Each [`record_report`](Self::record_report) call runs its whole
/// insert/evict/add/compare sequence under one lock, so concurrent reports
/// cannot lose a reporter, evict twice, or fire an action twice. Nothing is
/// awaited while the lock is held; actions are performed by the caller.
#[derive(Debug)]
pub struct ReportAggregator {
    capacity: usize,
    state: Mutex<AggregatorState>,
}

impl ReportAggregator {
    /// Aggregator tracking at most `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(AggregatorState::default()),
        }
    }

    /// Maximum number of tracked messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tracked messages.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Whether `message_id` is currently tracked.
    pub fn is_tracked(&self, message_id: &str) -> bool {
        self.state.lock().records.contains_key(message_id)
    }

    /// Tracked message ids, oldest first.
    pub fn tracked(&self) -> Vec<String> {
        self.state.lock().order.iter().cloned().collect()
    }

    /// Snapshot of the record for `message_id`.
    pub fn record(&self, message_id: &str) -> Option<ReportRecord> {
        self.state.lock().records.get(message_id).cloned()
    }

    /// Count a report and return any thresholds it newly crossed.
    ///
    /// Repeat reports from the same reporter do not advance the count. An
    /// action fires the first time the distinct-reporter count is at or
    /// above its threshold, even if a burst skipped the exact value, and
    /// never again for the same message while it stays tracked.
    #[instrument(skip(self, plan), fields(capacity = self.capacity))]
    pub fn record_report(
        &self,
        message_id: &str,
        reporter_id: &str,
        plan: &ThresholdPlan,
    ) -> Option<ThresholdCrossing> {
        let mut state = self.state.lock();

        if !state.records.contains_key(message_id) {
            state.order.push_back(message_id.to_string());
            state
                .records
                .insert(message_id.to_string(), ReportRecord::default());
            if state.order.len() > self.capacity
                && let Some(oldest) = state.order.pop_front()
            {
                state.records.remove(&oldest);
                debug!(evicted = %oldest, "Report queue full, evicted oldest message");
            }
        }

        let record = state.records.get_mut(message_id)?;
        if !record.add(reporter_id) {
            debug!("Duplicate report ignored");
        }
        let count = record.count();

        let crossed: BTreeSet<ActionKind> = plan
            .iter()
            .filter(|(action, threshold)| count >= *threshold && !record.fired.contains(action))
            .map(|(action, _)| action)
            .collect();
        if crossed.is_empty() {
            debug!(count, "No new threshold crossed");
            return None;
        }
        record.fired.extend(crossed.iter().copied());

        debug!(count, actions = ?crossed, "Threshold crossed");
        Some(ThresholdCrossing {
            message_id: message_id.to_string(),
            reporters: record.reporters.clone(),
            actions: crossed,
        })
    }
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ban_at(n: i64) -> ThresholdPlan {
        ThresholdPlan::new().with(ActionKind::Ban, n)
    }

    #[test]
    fn test_concurrent_reports_fire_each_action_once() {
        let aggregator = ReportAggregator::new(20);
        let plan = ThresholdPlan::new()
            .with(ActionKind::Alert, 3)
            .with(ActionKind::Ban, 10);
        let crossings = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for thread in 0..32 {
                let (aggregator, plan, crossings) = (&aggregator, &plan, &crossings);
                scope.spawn(move || {
                    for i in 0..50 {
                        // Each thread repeats its reporters to exercise duplicates.
                        let reporter = format!("@r{}-{}:x.org", thread, i % 25);
                        if let Some(crossing) = aggregator.record_report("m1", &reporter, plan) {
                            crossings.lock().push(crossing);
                        }
                    }
                });
            }
        });

        let crossings = crossings.into_inner();
        let fired: Vec<ActionKind> = crossings
            .iter()
            .flat_map(|crossing| crossing.actions().iter().copied())
            .collect();
        assert_eq!(fired.len(), 2);
        assert!(fired.contains(&ActionKind::Alert));
        assert!(fired.contains(&ActionKind::Ban));

        let record = aggregator.record("m1").unwrap();
        assert_eq!(record.count(), 32 * 25);
        assert_eq!(
            record.fired(),
            &BTreeSet::from([ActionKind::Alert, ActionKind::Ban])
        );
    }

    #[test]
    fn test_concurrent_reports_stay_within_capacity() {
        let aggregator = ReportAggregator::new(5);
        let plan = ban_at(1);

        std::thread::scope(|scope| {
            for thread in 0..32 {
                let (aggregator, plan) = (&aggregator, &plan);
                scope.spawn(move || {
                    for i in 0..200 {
                        let message = format!("m{}", (thread * 7 + i) % 17);
                        aggregator.record_report(&message, "@a:x.org", plan);
                        assert!(aggregator.len() <= 5);
                    }
                });
            }
        });

        assert_eq!(aggregator.len(), 5);
        assert_eq!(aggregator.tracked().len(), 5);
    }

    #[test]
    fn test_count_ignores_duplicate_reporters() {
        let aggregator = ReportAggregator::default();
        let plan = ThresholdPlan::new();
        for reporter in ["a", "b", "a", "c", "b", "a"] {
            aggregator.record_report("m1", reporter, &plan);
        }
        let record = aggregator.record("m1").unwrap();
        assert_eq!(record.count(), 3);
        assert_eq!(record.reporters(), &["a", "b", "c"]);
    }

    #[test]
    fn test_ban_fires_once_at_threshold() {
        let aggregator = ReportAggregator::new(20);
        let plan = ban_at(3);
        assert!(aggregator.record_report("m1", "a", &plan).is_none());
        assert!(aggregator.record_report("m1", "b", &plan).is_none());
        let crossing = aggregator.record_report("m1", "c", &plan).unwrap();
        assert_eq!(crossing.message_id(), "m1");
        assert_eq!(crossing.reporters(), &["a", "b", "c"]);
        assert_eq!(crossing.actions(), &BTreeSet::from([ActionKind::Ban]));

        assert!(aggregator.record_report("m1", "d", &plan).is_none());
        assert!(aggregator.record_report("m1", "c", &plan).is_none());
    }

    #[test]
    fn test_crossing_fires_when_threshold_lowered_past_count() {
        let aggregator = ReportAggregator::default();
        aggregator.record_report("m1", "a", &ban_at(5));
        aggregator.record_report("m1", "b", &ban_at(5));
        aggregator.record_report("m1", "c", &ban_at(5));
        // Count jumps from below to above the new threshold in one step.
        let crossing = aggregator.record_report("m1", "d", &ban_at(2)).unwrap();
        assert_eq!(crossing.actions(), &BTreeSet::from([ActionKind::Ban]));
        assert!(aggregator.record_report("m1", "e", &ban_at(2)).is_none());
    }

    #[test]
    fn test_multiple_actions_cross_together() {
        let aggregator = ReportAggregator::default();
        let plan = ThresholdPlan::new()
            .with(ActionKind::Alert, 1)
            .with(ActionKind::Redact, 1)
            .with(ActionKind::Ban, 2);
        let first = aggregator.record_report("m1", "a", &plan).unwrap();
        assert_eq!(
            first.actions(),
            &BTreeSet::from([ActionKind::Alert, ActionKind::Redact])
        );
        let second = aggregator.record_report("m1", "b", &plan).unwrap();
        assert_eq!(second.actions(), &BTreeSet::from([ActionKind::Ban]));
    }

    #[test]
    fn test_evicts_first_inserted_not_first_updated() {
        let aggregator = ReportAggregator::new(20);
        let plan = ThresholdPlan::new();
        for i in 1..=20 {
            aggregator.record_report(&format!("m{}", i), "a", &plan);
        }
        // Updating m1 does not move it to the back of the queue.
        aggregator.record_report("m1", "b", &plan);
        aggregator.record_report("m21", "a", &plan);

        assert_eq!(aggregator.len(), 20);
        assert!(!aggregator.is_tracked("m1"));
        for i in 2..=21 {
            assert!(aggregator.is_tracked(&format!("m{}", i)));
        }
        assert_eq!(aggregator.tracked().first().map(String::as_str), Some("m2"));
    }

    #[test]
    fn test_evicted_message_starts_fresh() {
        let aggregator = ReportAggregator::new(1);
        let plan = ban_at(1);
        assert!(aggregator.record_report("m1", "a", &plan).is_some());
        aggregator.record_report("m2", "a", &plan);
        assert!(!aggregator.is_tracked("m1"));
        assert!(aggregator.record_report("m1", "a", &plan).is_some());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let aggregator = ReportAggregator::new(0);
        assert_eq!(aggregator.capacity(), 1);
        aggregator.record_report("m1", "a", &ThresholdPlan::new());
        assert!(aggregator.is_tracked("m1"));
    }
}
