//! Typed setting values and the templates that parse and validate them.

use bulwark_error::{ProtectionError, ProtectionErrorKind, ProtectionResult};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Matrix-style user identifier: `@localpart:server`.
static USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@[^:\s,]+:[^\s,]+$").expect("Valid user id regex"));

/// Separator used when a list value is rendered as text.
const LIST_SEPARATOR: &str = ", ";

/// Current value of one setting.
///
/// The variant always matches the [`SettingKind`] of the slot that holds it;
/// [`SettingType::validate`] rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingValue {
    /// Signed integer
    Number(i64),
    /// Free text
    Text(String),
    /// Ordered set of strings
    List(Vec<String>),
    /// One member of a fixed set of choices
    Choice(String),
}

impl SettingValue {
    /// Name of the variant, used in type-mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::List(_) => "list",
            Self::Choice(_) => "enumeration",
        }
    }

    /// The number, if this is a numeric value.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string, if this is a text or choice value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The items, if this is a list value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) | Self::Choice(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(LIST_SEPARATOR)),
        }
    }
}

/// What a list setting may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListItem {
    /// Trimmed, non-empty text without commas
    Text,
    /// `@localpart:server` user identifiers
    UserId,
}

/// Declared kind of a setting slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingKind {
    /// Integer, optionally bounded (inclusive)
    Number {
        /// Smallest accepted value
        min: Option<i64>,
        /// Largest accepted value
        max: Option<i64>,
    },
    /// Free text
    Text,
    /// Ordered set of items
    List(ListItem),
    /// One of a fixed set of choices
    Choice(&'static [&'static str]),
}

impl SettingKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Number { .. } => "number",
            Self::Text => "string",
            Self::List(_) => "list",
            Self::Choice(_) => "enumeration",
        }
    }
}

/// Template for one named configuration slot.
///
/// Immutable once built; every value stored in the slot is produced by
/// [`parse`](Self::parse), [`add_value`](Self::add_value) or
/// [`remove_value`](Self::remove_value), or checked by
/// [`validate`](Self::validate).
///
/// # Example
///
/// ```
/// use bulwark_protection::{SettingType, SettingValue};
///
/// let threshold = SettingType::number(3);
/// assert_eq!(threshold.parse("threshold", "5").unwrap(), SettingValue::Number(5));
/// assert!(threshold.parse("threshold", "five").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingType {
    kind: SettingKind,
    default: SettingValue,
}

impl SettingType {
    /// Unbounded integer setting.
    pub fn number(default: i64) -> Self {
        Self::bounded_number(default, None, None)
    }

    /// Integer setting with inclusive bounds.
    pub fn bounded_number(default: i64, min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            kind: SettingKind::Number { min, max },
            default: SettingValue::Number(default),
        }
    }

    /// Free-text setting.
    pub fn text(default: impl Into<String>) -> Self {
        Self {
            kind: SettingKind::Text,
            default: SettingValue::Text(default.into()),
        }
    }

    /// Empty list setting holding `item`s.
    pub fn list(item: ListItem) -> Self {
        Self {
            kind: SettingKind::List(item),
            default: SettingValue::List(Vec::new()),
        }
    }

    /// Empty list of user identifiers.
    pub fn user_ids() -> Self {
        Self::list(ListItem::UserId)
    }

    /// Enumeration over `allowed`, defaulting to `default`.
    pub fn choice(allowed: &'static [&'static str], default: &'static str) -> Self {
        debug_assert!(allowed.contains(&default), "default must be an allowed choice");
        Self {
            kind: SettingKind::Choice(allowed),
            default: SettingValue::Choice(default.to_string()),
        }
    }

    /// Declared kind.
    pub fn kind(&self) -> &SettingKind {
        &self.kind
    }

    /// Value a fresh slot starts with.
    pub fn default_value(&self) -> &SettingValue {
        &self.default
    }

    /// True only for list-valued kinds.
    pub fn is_list(&self) -> bool {
        matches!(self.kind, SettingKind::List(_))
    }

    /// Parse user-supplied text into a value of this kind.
    ///
    /// Lists are comma-separated; duplicates collapse to their first
    /// occurrence and an empty string yields an empty list.
    pub fn parse(&self, name: &str, text: &str) -> ProtectionResult<SettingValue> {
        match &self.kind {
            SettingKind::Number { .. } => {
                let n = text.trim().parse::<i64>().map_err(|e| {
                    invalid(name, text, format!("expected a whole number ({})", e))
                })?;
                let value = SettingValue::Number(n);
                self.check_constraints(name, &value)?;
                Ok(value)
            }
            SettingKind::Text => Ok(SettingValue::Text(text.to_string())),
            SettingKind::List(item) => {
                let mut items: Vec<String> = Vec::new();
                for raw in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    check_item(name, *item, raw)?;
                    if !items.iter().any(|existing| existing == raw) {
                        items.push(raw.to_string());
                    }
                }
                Ok(SettingValue::List(items))
            }
            SettingKind::Choice(allowed) => allowed
                .iter()
                .find(|choice| choice.eq_ignore_ascii_case(text.trim()))
                .map(|choice| SettingValue::Choice(choice.to_string()))
                .ok_or_else(|| {
                    invalid(name, text, format!("must be one of: {}", allowed.join(", ")))
                }),
        }
    }

    /// Check that `value` has this kind and satisfies its constraints.
    pub fn validate(&self, name: &str, value: &SettingValue) -> ProtectionResult<()> {
        let matches_kind = matches!(
            (&self.kind, value),
            (SettingKind::Number { .. }, SettingValue::Number(_))
                | (SettingKind::Text, SettingValue::Text(_))
                | (SettingKind::List(_), SettingValue::List(_))
                | (SettingKind::Choice(_), SettingValue::Choice(_))
        );
        if !matches_kind {
            return Err(ProtectionError::new(ProtectionErrorKind::TypeMismatch {
                setting: name.to_string(),
                expected: self.kind.name().to_string(),
                actual: value.kind_name().to_string(),
            }));
        }
        self.check_constraints(name, value)
    }

    /// Return `current` with `text` appended, unless it is already present.
    pub fn add_value(
        &self,
        name: &str,
        current: &SettingValue,
        text: &str,
    ) -> ProtectionResult<SettingValue> {
        let (item, items) = self.list_parts(name, current)?;
        let text = text.trim();
        check_item(name, item, text)?;
        let mut items = items.to_vec();
        if !items.iter().any(|existing| existing == text) {
            items.push(text.to_string());
        }
        Ok(SettingValue::List(items))
    }

    /// Return `current` without `text`; absent items are a no-op.
    pub fn remove_value(
        &self,
        name: &str,
        current: &SettingValue,
        text: &str,
    ) -> ProtectionResult<SettingValue> {
        let (_, items) = self.list_parts(name, current)?;
        let text = text.trim();
        Ok(SettingValue::List(
            items.iter().filter(|existing| *existing != text).cloned().collect(),
        ))
    }

    fn list_parts<'a>(
        &self,
        name: &str,
        current: &'a SettingValue,
    ) -> ProtectionResult<(ListItem, &'a [String])> {
        let SettingKind::List(item) = self.kind else {
            return Err(ProtectionError::new(ProtectionErrorKind::NotAListSetting(
                name.to_string(),
            )));
        };
        self.validate(name, current)?;
        let items = current.as_list().unwrap_or_default();
        Ok((item, items))
    }

    fn check_constraints(&self, name: &str, value: &SettingValue) -> ProtectionResult<()> {
        match (&self.kind, value) {
            (SettingKind::Number { min, max }, SettingValue::Number(n)) => {
                if let Some(min) = min
                    && n < min
                {
                    return Err(invalid(name, &n.to_string(), format!("must be at least {}", min)));
                }
                if let Some(max) = max
                    && n > max
                {
                    return Err(invalid(name, &n.to_string(), format!("must be at most {}", max)));
                }
                Ok(())
            }
            (SettingKind::List(item), SettingValue::List(items)) => {
                for (i, entry) in items.iter().enumerate() {
                    check_item(name, *item, entry)?;
                    if items[..i].contains(entry) {
                        return Err(invalid(name, entry, "duplicate list entry"));
                    }
                }
                Ok(())
            }
            (SettingKind::Choice(allowed), SettingValue::Choice(choice)) => {
                if allowed.iter().any(|allowed| *allowed == choice) {
                    Ok(())
                } else {
                    Err(invalid(name, choice, format!("must be one of: {}", allowed.join(", "))))
                }
            }
            _ => Ok(()),
        }
    }
}

fn check_item(name: &str, item: ListItem, text: &str) -> ProtectionResult<()> {
    match item {
        ListItem::Text if text.trim().is_empty() || text.contains(',') => {
            Err(invalid(name, text, "list entries must be non-empty and contain no commas"))
        }
        ListItem::Text if text != text.trim() => Err(invalid(
            name,
            text,
            "list entries must not start or end with whitespace",
        )),
        ListItem::UserId if !USER_ID.is_match(text) => {
            Err(invalid(name, text, "expected a user id like @user:example.org"))
        }
        _ => Ok(()),
    }
}

#[track_caller]
fn invalid(name: &str, value: &str, reason: impl Into<String>) -> ProtectionError {
    ProtectionError::new(ProtectionErrorKind::InvalidValue {
        setting: name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: &[&str] = &["alert", "redact", "ban"];

    fn list(items: &[&str]) -> SettingValue {
        SettingValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_number_rejects_non_numeric() {
        let err = SettingType::number(3).parse("threshold", "lots").unwrap_err();
        assert!(matches!(err.kind, ProtectionErrorKind::InvalidValue { .. }));
    }

    #[test]
    fn test_number_bounds() {
        let ty = SettingType::bounded_number(10, Some(1), Some(100));
        assert_eq!(ty.parse("max", "1").unwrap(), SettingValue::Number(1));
        assert!(ty.parse("max", "0").is_err());
        assert!(ty.parse("max", "101").is_err());
    }

    #[test]
    fn test_user_id_list_rejects_malformed_ids() {
        let ty = SettingType::user_ids();
        assert!(ty.parse("mxids", "@alice:example.org, @bob:example.org").is_ok());
        let err = ty.parse("mxids", "alice").unwrap_err();
        assert!(matches!(err.kind, ProtectionErrorKind::InvalidValue { .. }));
    }

    #[test]
    fn test_choice_is_case_insensitive_and_canonical() {
        let ty = SettingType::choice(ACTIONS, "alert");
        assert_eq!(ty.parse("action", "BAN").unwrap(), SettingValue::Choice("ban".into()));
        assert!(ty.parse("action", "kick").is_err());
    }

    #[test]
    fn test_round_trip_through_display() {
        let cases = [
            (SettingType::number(0), SettingValue::Number(-1)),
            (SettingType::text(""), SettingValue::Text("spam and flooding".into())),
            (SettingType::text(""), SettingValue::Text(String::new())),
            (SettingType::user_ids(), list(&["@a:example.org", "@b:example.org"])),
            (SettingType::user_ids(), list(&[])),
            (SettingType::list(ListItem::Text), list(&["two words", "x"])),
            (SettingType::choice(ACTIONS, "alert"), SettingValue::Choice("redact".into())),
        ];
        for (ty, value) in cases {
            assert_eq!(ty.parse("s", &value.to_string()).unwrap(), value);
        }

        // Values the text form cannot reproduce are rejected up front.
        let ty = SettingType::list(ListItem::Text);
        let unrepresentable: [&[&str]; 4] = [&[" padded"], &["padded "], &["   "], &["a,b"]];
        for entries in unrepresentable {
            let err = ty.validate("s", &list(entries)).unwrap_err();
            assert!(matches!(err.kind, ProtectionErrorKind::InvalidValue { .. }));
        }
    }

    #[test]
    fn test_validate_rejects_mismatched_tag() {
        let err = SettingType::number(3)
            .validate("threshold", &SettingValue::Text("5".into()))
            .unwrap_err();
        assert!(matches!(err.kind, ProtectionErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn test_add_then_remove_restores_list() {
        let ty = SettingType::user_ids();
        let start = list(&["@a:example.org"]);
        let added = ty.add_value("mxids", &start, "@alice:example.org").unwrap();
        assert_eq!(added, list(&["@a:example.org", "@alice:example.org"]));
        assert_eq!(ty.remove_value("mxids", &added, "@alice:example.org").unwrap(), start);
    }

    #[test]
    fn test_add_existing_is_unchanged() {
        let ty = SettingType::user_ids();
        let start = list(&["@a:example.org"]);
        assert_eq!(ty.add_value("mxids", &start, "@a:example.org").unwrap(), start);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let ty = SettingType::user_ids();
        let start = list(&["@a:example.org"]);
        assert_eq!(ty.remove_value("mxids", &start, "@z:example.org").unwrap(), start);
    }

    #[test]
    fn test_add_on_scalar_is_not_a_list() {
        let err = SettingType::number(3)
            .add_value("threshold", &SettingValue::Number(3), "4")
            .unwrap_err();
        assert_eq!(err.kind, ProtectionErrorKind::NotAListSetting("threshold".into()));
    }
}
