//! Named settings owned by one protection.

use crate::{SettingType, SettingValue};
use bulwark_error::{ProtectionError, ProtectionErrorKind, ProtectionResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct Slot {
    ty: Arc<SettingType>,
    value: SettingValue,
}

/// Mapping from setting name to its current value, each bound to a
/// [`SettingType`].
///
/// Names iterate in sorted order, so every rendering is deterministic.
/// Cloning is cheap for the types (shared) and copies the values.
///
/// # Example
///
/// ```
/// use bulwark_protection::{ProtectionSettings, SettingType, SettingValue};
///
/// let mut settings = ProtectionSettings::new("Example")
///     .with("threshold", SettingType::number(3))
///     .with("mxids", SettingType::user_ids());
///
/// let value = settings.parse("threshold", "5").unwrap();
/// settings.set("threshold", value).unwrap();
/// assert_eq!(settings.number("threshold").unwrap(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct ProtectionSettings {
    owner: String,
    slots: BTreeMap<String, Slot>,
}

impl ProtectionSettings {
    /// Empty settings for the protection named `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            slots: BTreeMap::new(),
        }
    }

    /// Declare a setting, initialised to its type's default.
    pub fn with(mut self, name: impl Into<String>, ty: SettingType) -> Self {
        let value = ty.default_value().clone();
        self.slots.insert(
            name.into(),
            Slot {
                ty: Arc::new(ty),
                value,
            },
        );
        self
    }

    /// Name of the owning protection.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of declared settings.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the protection declares no settings.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Declared setting names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Type bound to `name`.
    pub fn setting_type(&self, name: &str) -> ProtectionResult<&SettingType> {
        self.slot(name).map(|slot| slot.ty.as_ref())
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> ProtectionResult<&SettingValue> {
        self.slot(name).map(|slot| &slot.value)
    }

    /// Replace the value of `name`, returning the previous value.
    ///
    /// The value is validated first; on failure nothing changes.
    pub fn set(&mut self, name: &str, value: SettingValue) -> ProtectionResult<SettingValue> {
        let owner = self.owner.clone();
        let slot = self.slots.get_mut(name).ok_or_else(|| unknown(&owner, name))?;
        slot.ty.validate(name, &value)?;
        debug!(protection = %owner, setting = name, value = %value, "Setting updated");
        Ok(std::mem::replace(&mut slot.value, value))
    }

    /// Parse `text` with the type bound to `name`, without storing it.
    pub fn parse(&self, name: &str, text: &str) -> ProtectionResult<SettingValue> {
        self.setting_type(name)?.parse(name, text)
    }

    /// The value `name` would have after adding `text` to it.
    pub fn with_added(&self, name: &str, text: &str) -> ProtectionResult<SettingValue> {
        let slot = self.slot(name)?;
        slot.ty.add_value(name, &slot.value, text)
    }

    /// The value `name` would have after removing `text` from it.
    pub fn with_removed(&self, name: &str, text: &str) -> ProtectionResult<SettingValue> {
        let slot = self.slot(name)?;
        slot.ty.remove_value(name, &slot.value, text)
    }

    /// Every value, sorted by setting name.
    pub fn values(&self) -> BTreeMap<String, SettingValue> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.value.clone()))
            .collect()
    }

    /// Every value rendered as text, sorted by setting name.
    pub fn to_text(&self) -> BTreeMap<String, String> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.value.to_string()))
            .collect()
    }

    /// Numeric value of `name`.
    pub fn number(&self, name: &str) -> ProtectionResult<i64> {
        let value = self.get(name)?;
        value.as_number().ok_or_else(|| mismatch(name, "number", value))
    }

    /// Text or choice value of `name`.
    pub fn text(&self, name: &str) -> ProtectionResult<&str> {
        let value = self.get(name)?;
        value.as_str().ok_or_else(|| mismatch(name, "string", value))
    }

    /// List value of `name`.
    pub fn list(&self, name: &str) -> ProtectionResult<&[String]> {
        let value = self.get(name)?;
        value.as_list().ok_or_else(|| mismatch(name, "list", value))
    }

    fn slot(&self, name: &str) -> ProtectionResult<&Slot> {
        self.slots.get(name).ok_or_else(|| unknown(&self.owner, name))
    }
}

#[track_caller]
fn unknown(owner: &str, name: &str) -> ProtectionError {
    ProtectionError::new(ProtectionErrorKind::UnknownSetting {
        protection: owner.to_string(),
        setting: name.to_string(),
    })
}

#[track_caller]
fn mismatch(name: &str, expected: &str, actual: &SettingValue) -> ProtectionError {
    ProtectionError::new(ProtectionErrorKind::TypeMismatch {
        setting: name.to_string(),
        expected: expected.to_string(),
        actual: actual.kind_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProtectionSettings {
        ProtectionSettings::new("TrustedReporters")
            .with("threshold", SettingType::number(3))
            .with("mxids", SettingType::user_ids())
            .with("action", SettingType::choice(&["alert", "ban"], "alert"))
    }

    #[test]
    fn test_defaults_are_applied() {
        let s = settings();
        assert_eq!(s.number("threshold").unwrap(), 3);
        assert!(s.list("mxids").unwrap().is_empty());
        assert_eq!(s.text("action").unwrap(), "alert");
    }

    #[test]
    fn test_get_unknown_setting() {
        let err = settings().get("nope").unwrap_err();
        assert_eq!(
            err.kind,
            ProtectionErrorKind::UnknownSetting {
                protection: "TrustedReporters".into(),
                setting: "nope".into(),
            }
        );
    }

    #[test]
    fn test_set_mismatch_leaves_value_unchanged() {
        let mut s = settings();
        let err = s.set("threshold", SettingValue::Text("9".into())).unwrap_err();
        assert!(matches!(err.kind, ProtectionErrorKind::TypeMismatch { .. }));
        assert_eq!(s.number("threshold").unwrap(), 3);
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut s = settings();
        let old = s.set("threshold", SettingValue::Number(7)).unwrap();
        assert_eq!(old, SettingValue::Number(3));
        assert_eq!(s.number("threshold").unwrap(), 7);
    }

    #[test]
    fn test_values_sorted_by_name() {
        let names: Vec<String> = settings().values().into_keys().collect();
        assert_eq!(names, vec!["action", "mxids", "threshold"]);
    }

    #[test]
    fn test_with_added_does_not_commit() {
        let s = settings();
        let next = s.with_added("mxids", "@alice:example.org").unwrap();
        assert_eq!(next.as_list().unwrap(), ["@alice:example.org".to_string()]);
        assert!(s.list("mxids").unwrap().is_empty());
    }

    #[test]
    fn test_with_added_on_scalar_fails() {
        let err = settings().with_added("threshold", "4").unwrap_err();
        assert!(matches!(err.kind, ProtectionErrorKind::NotAListSetting(_)));
    }
}
