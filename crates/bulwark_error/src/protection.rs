//! Protection framework error types.

/// Specific error conditions for protection and settings operations.
///
/// All of these are recoverable; the command layer renders them as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProtectionErrorKind {
    /// No protection is registered under this name
    #[display("Unknown protection: {}", _0)]
    UnknownProtection(String),

    /// The protection has no setting with this name
    #[display("Unknown setting {} for protection {}", setting, protection)]
    UnknownSetting {
        /// Protection that was addressed
        protection: String,
        /// Setting that does not exist
        setting: String,
    },

    /// Add/remove was used on a scalar setting
    #[display("Setting {} isn't a list", _0)]
    NotAListSetting(String),

    /// Text could not be parsed into the setting's kind
    #[display("Invalid value '{}' for setting {}: {}", value, setting, reason)]
    InvalidValue {
        /// Setting being parsed
        setting: String,
        /// Offending input
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A value of the wrong kind was offered to a setting
    #[display("Type mismatch for setting {}: expected {}, got {}", setting, expected, actual)]
    TypeMismatch {
        /// Setting being written
        setting: String,
        /// Kind declared by the setting
        expected: String,
        /// Kind of the offered value
        actual: String,
    },

    /// Two protections were registered under one name
    #[display("Protection already registered: {}", _0)]
    DuplicateProtection(String),

    /// A redact/ban/lock call failed downstream
    #[display("Action {} failed for {}: {}", action, target, reason)]
    ActionFailed {
        /// Action that was attempted
        action: String,
        /// Message or user the action targeted
        target: String,
        /// Failure reported by the moderation API
        reason: String,
    },

    /// Settings could not be loaded from or saved to the store
    #[display("Settings storage failed: {}", _0)]
    Storage(String),
}

/// Protection error with location tracking.
///
/// # Examples
///
/// ```
/// use bulwark_error::{ProtectionError, ProtectionErrorKind};
///
/// let err = ProtectionError::new(ProtectionErrorKind::NotAListSetting(
///     "threshold".to_string(),
/// ));
/// assert_eq!(err.kind().to_string(), "Setting threshold isn't a list");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Protection Error: {} at line {} in {}", kind, line, file)]
pub struct ProtectionError {
    /// The specific error kind
    pub kind: ProtectionErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl ProtectionError {
    /// Create a new protection error with location tracking.
    #[track_caller]
    pub fn new(kind: ProtectionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ProtectionErrorKind {
        &self.kind
    }
}

/// Result type for protection operations.
pub type ProtectionResult<T> = Result<T, ProtectionError>;
