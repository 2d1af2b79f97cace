//! Moderation action kinds.

/// Text form of every [`ActionKind`], for enumeration settings.
pub const ACTION_CHOICES: &[&str] = &["alert", "redact", "ban"];

/// Action taken once a policy triggers.
///
/// Ordered by severity, which is also the order actions run in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    /// Audit notice only
    Alert,
    /// Remove the offending message
    Redact,
    /// Remove the offending user from the room
    Ban,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_choices_match_variants() {
        let names: Vec<String> = ActionKind::iter().map(|a| a.to_string()).collect();
        assert_eq!(names, ACTION_CHOICES);
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(ActionKind::from_str("ban").unwrap(), ActionKind::Ban);
        assert!(ActionKind::from_str("kick").is_err());
    }
}
