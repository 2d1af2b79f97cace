//! Catalog of protections and the settings commit pipeline.

use crate::{Protection, ProtectionContext, ProtectionSettings, SettingValue, SettingsStore};
use bulwark_error::{ProtectionError, ProtectionErrorKind, ProtectionResult};
use bulwark_interface::{ReportEvent, RoomEvent};
use derive_getters::Getters;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, instrument, warn};

/// One row of [`ProtectionRegistry::list_available`].
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ProtectionSummary {
    /// Protection name
    name: String,
    /// Human description
    description: String,
    /// Whether events are currently delivered to it
    enabled: bool,
}

/// How a setting should change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingUpdate {
    /// Store an already-typed value
    Replace(SettingValue),
    /// Parse text with the setting's type and store the result
    Parse(String),
    /// Add an item to a list setting
    Add(String),
    /// Remove an item from a list setting
    Remove(String),
}

/// A committed setting change.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SettingChange {
    /// Protection that owns the setting
    protection: String,
    /// Setting that changed
    setting: String,
    /// Value before the change
    previous: SettingValue,
    /// Value after the change
    current: SettingValue,
    /// Whether the running instance was patched
    live: bool,
}

impl fmt::Display for SettingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Changed {}.{} to {} (was {})",
            self.protection, self.setting, self.current, self.previous
        )
    }
}

/// Outcome of delivering one event to the enabled protections.
#[derive(Debug, Default, Getters)]
pub struct Delivery {
    /// Protections whose handler completed
    handled: Vec<String>,
    /// Protections whose handler failed, with the error
    failed: Vec<(String, ProtectionError)>,
}

struct Entry {
    protection: Arc<dyn Protection>,
    enabled: AtomicBool,
    // Committed copy of the settings; also serialises configuration
    // commands for this protection.
    committed: tokio::sync::Mutex<ProtectionSettings>,
}

impl Entry {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// Process-wide catalog of protections.
///
/// Protections are registered once at startup, then the registry is shared
/// (typically behind an `Arc`) between the event stream and the command
/// layer. Events are delivered in registration order.
///
/// Settings changes follow validate → persist → live patch while holding the
/// protection's lock, so the committed copy and the running instance never
/// disagree and a failed save changes neither.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = ProtectionRegistry::new(Arc::new(MemoryStore::new()));
/// registry.register(Arc::new(TrustedReporters::new(20)))?;
/// registry.restore(&[]).await?;
/// registry.enable("TrustedReporters").await?;
/// registry
///     .apply_setting_change("TrustedReporters", "threshold", SettingUpdate::Parse("5".into()))
///     .await?;
/// ```
pub struct ProtectionRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    store: Arc<dyn SettingsStore>,
    // Serialises read-modify-write of the persisted enabled set.
    enabled_lock: tokio::sync::Mutex<()>,
}

impl ProtectionRegistry {
    /// Create an empty registry persisting through `store`.
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        debug!("Creating new ProtectionRegistry");
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            store,
            enabled_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Add a protection to the catalog, initially disabled.
    ///
    /// # Errors
    ///
    /// `DuplicateProtection` if the name is already registered.
    #[instrument(skip(self, protection), fields(protection = protection.name()))]
    pub fn register(&mut self, protection: Arc<dyn Protection>) -> ProtectionResult<()> {
        let name = protection.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ProtectionError::new(ProtectionErrorKind::DuplicateProtection(
                name,
            )));
        }
        let committed = protection.settings().read().clone();
        info!(settings = committed.len(), "Registering protection");
        self.index.insert(name, self.entries.len());
        self.entries.push(Entry {
            protection,
            enabled: AtomicBool::new(false),
            committed: tokio::sync::Mutex::new(committed),
        });
        Ok(())
    }

    /// Number of registered protections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The running instance registered as `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Protection>> {
        self.index
            .get(name)
            .map(|i| Arc::clone(&self.entries[*i].protection))
    }

    /// Whether `name` currently receives events.
    pub fn is_enabled(&self, name: &str) -> ProtectionResult<bool> {
        Ok(self.entry(name)?.is_enabled())
    }

    /// Load persisted settings and the enabled set.
    ///
    /// Stored values that no longer parse, or name settings that no longer
    /// exist, are skipped with a warning and the default is kept. When the
    /// store has never recorded an enabled set, `default_enabled` is used
    /// and saved.
    #[instrument(skip(self, default_enabled))]
    pub async fn restore(&self, default_enabled: &[String]) -> ProtectionResult<()> {
        for entry in &self.entries {
            let name = entry.protection.name();
            let stored = self.store.load_settings(name).await?;
            let mut committed = entry.committed.lock().await;
            for (setting, text) in &stored {
                let restored = committed
                    .parse(setting, text)
                    .and_then(|value| committed.set(setting, value));
                if let Err(e) = restored {
                    warn!(protection = name, setting = %setting, error = %e.kind, "Ignoring stored setting");
                }
            }
            *entry.protection.settings().write() = committed.clone();
            debug!(protection = name, restored = stored.len(), "Restored settings");
        }

        let _guard = self.enabled_lock.lock().await;
        let enabled = match self.store.load_enabled().await? {
            Some(names) => names,
            None => {
                let names: Vec<String> = default_enabled
                    .iter()
                    .filter(|name| self.index.contains_key(name.as_str()))
                    .cloned()
                    .collect();
                self.store.save_enabled(&names).await?;
                names
            }
        };
        for name in &enabled {
            match self.index.get(name) {
                Some(i) => self.entries[*i].enabled.store(true, Ordering::Release),
                None => warn!(protection = %name, "Stored enabled protection is not registered"),
            }
        }
        info!(enabled = ?enabled, "Protections restored");
        Ok(())
    }

    /// Start delivering events to `name`.
    ///
    /// Returns `false` if it was already enabled. The running instance is
    /// re-synchronised with the committed settings before events flow.
    ///
    /// # Errors
    ///
    /// `UnknownProtection`, or `Storage` if the enabled set cannot be saved
    /// (the protection then stays disabled).
    #[instrument(skip(self))]
    pub async fn enable(&self, name: &str) -> ProtectionResult<bool> {
        let entry = self.entry(name)?;
        let committed = entry.committed.lock().await;
        if entry.is_enabled() {
            debug!("Protection already enabled");
            return Ok(false);
        }
        let _guard = self.enabled_lock.lock().await;
        self.store
            .save_enabled(&self.enabled_names_with(name, true))
            .await?;
        *entry.protection.settings().write() = committed.clone();
        entry.enabled.store(true, Ordering::Release);
        info!("Protection enabled");
        Ok(true)
    }

    /// Stop delivering events to `name`.
    ///
    /// Returns `false` if it was already disabled.
    ///
    /// # Errors
    ///
    /// `UnknownProtection`, or `Storage` if the enabled set cannot be saved
    /// (the protection then stays enabled).
    #[instrument(skip(self))]
    pub async fn disable(&self, name: &str) -> ProtectionResult<bool> {
        let entry = self.entry(name)?;
        let _committed = entry.committed.lock().await;
        if !entry.is_enabled() {
            debug!("Protection already disabled");
            return Ok(false);
        }
        let _guard = self.enabled_lock.lock().await;
        self.store
            .save_enabled(&self.enabled_names_with(name, false))
            .await?;
        entry.enabled.store(false, Ordering::Release);
        info!("Protection disabled");
        Ok(true)
    }

    /// Every protection with its description and state, sorted by name.
    pub fn list_available(&self) -> Vec<ProtectionSummary> {
        let mut summaries: Vec<ProtectionSummary> = self
            .entries
            .iter()
            .map(|entry| ProtectionSummary {
                name: entry.protection.name().to_string(),
                description: entry.protection.description().to_string(),
                enabled: entry.is_enabled(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Committed settings of `name`, sorted by setting name.
    ///
    /// # Errors
    ///
    /// `UnknownProtection` if `name` is not registered.
    pub async fn get_settings(&self, name: &str) -> ProtectionResult<BTreeMap<String, SettingValue>> {
        Ok(self.entry(name)?.committed.lock().await.values())
    }

    /// Committed settings of every protection, sorted by protection name.
    pub async fn all_settings(&self) -> Vec<(String, BTreeMap<String, SettingValue>)> {
        let mut all = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let values = entry.committed.lock().await.values();
            all.push((entry.protection.name().to_string(), values));
        }
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Change one setting of `name`.
    ///
    /// The new value is computed and validated against the committed
    /// settings, the full snapshot is persisted, and only then are the
    /// committed copy and (if enabled) the running instance replaced. Any
    /// failure leaves every copy untouched.
    ///
    /// # Errors
    ///
    /// `UnknownProtection`, `UnknownSetting`, `NotAListSetting`,
    /// `InvalidValue`, `TypeMismatch`, or `Storage`.
    #[instrument(skip(self, update))]
    pub async fn apply_setting_change(
        &self,
        name: &str,
        setting: &str,
        update: SettingUpdate,
    ) -> ProtectionResult<SettingChange> {
        let entry = self.entry(name)?;
        let mut committed = entry.committed.lock().await;

        let previous = committed.get(setting)?.clone();
        let current = match update {
            SettingUpdate::Replace(value) => value,
            SettingUpdate::Parse(text) => committed.parse(setting, &text)?,
            SettingUpdate::Add(text) => committed.with_added(setting, &text)?,
            SettingUpdate::Remove(text) => committed.with_removed(setting, &text)?,
        };
        let mut next = committed.clone();
        next.set(setting, current.clone())?;

        self.store.save_settings(name, &next.to_text()).await?;

        let live = entry.is_enabled();
        if live {
            *entry.protection.settings().write() = next.clone();
        }
        *committed = next;

        info!(previous = %previous, current = %current, live, "Protection setting changed");
        Ok(SettingChange {
            protection: name.to_string(),
            setting: setting.to_string(),
            previous,
            current,
            live,
        })
    }

    /// Deliver a report to every enabled report handler, in registration order.
    ///
    /// Handler failures are logged and collected; delivery continues with
    /// the next protection.
    #[instrument(
        skip(self, context, report),
        fields(message_id = %report.message_id(), reporter = %report.reporter_id())
    )]
    pub async fn handle_report(&self, context: &ProtectionContext, report: &ReportEvent) -> Delivery {
        let mut delivery = Delivery::default();
        for entry in self.entries.iter().filter(|entry| entry.is_enabled()) {
            let Some(handler) = entry.protection.capability().reports() else {
                continue;
            };
            let name = entry.protection.name().to_string();
            match handler.handle_report(context, report).await {
                Ok(()) => delivery.handled.push(name),
                Err(e) => {
                    error!(protection = %name, error = %e, "Report handler failed");
                    delivery.failed.push((name, e));
                }
            }
        }
        debug!(handled = delivery.handled.len(), failed = delivery.failed.len(), "Report delivered");
        delivery
    }

    /// Deliver a room event to every enabled event handler, in registration order.
    #[instrument(
        skip(self, context, event),
        fields(event_id = %event.event_id(), room_id = %event.room_id())
    )]
    pub async fn handle_event(&self, context: &ProtectionContext, event: &RoomEvent) -> Delivery {
        let mut delivery = Delivery::default();
        for entry in self.entries.iter().filter(|entry| entry.is_enabled()) {
            let Some(handler) = entry.protection.capability().events() else {
                continue;
            };
            let name = entry.protection.name().to_string();
            match handler.handle_event(context, event).await {
                Ok(()) => delivery.handled.push(name),
                Err(e) => {
                    error!(protection = %name, error = %e, "Event handler failed");
                    delivery.failed.push((name, e));
                }
            }
        }
        delivery
    }

    fn entry(&self, name: &str) -> ProtectionResult<&Entry> {
        self.index
            .get(name)
            .map(|i| &self.entries[*i])
            .ok_or_else(|| {
                ProtectionError::new(ProtectionErrorKind::UnknownProtection(name.to_string()))
            })
    }

    /// Enabled names in registration order, with `name` forced to `on`.
    fn enabled_names_with(&self, name: &str, on: bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| {
                if entry.protection.name() == name {
                    on
                } else {
                    entry.is_enabled()
                }
            })
            .map(|entry| entry.protection.name().to_string())
            .collect()
    }
}
