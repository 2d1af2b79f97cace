//! Errors raised by the external moderation API.

/// Classification of a failed moderation call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ModerationErrorKind {
    /// The bot lacks the power level or role to perform the call
    #[display("Permission denied: {}", _0)]
    PermissionDenied(String),
    /// Transport failure talking to the homeserver
    #[display("Network error: {}", _0)]
    Network(String),
    /// Account administration requires server admin rights
    #[display("Not a server administrator: {}", _0)]
    NotAdministrator(String),
    /// Anything else the remote side reported
    #[display("{}", _0)]
    Other(String),
}

/// Moderation API error with location tracking.
///
/// # Examples
///
/// ```
/// use bulwark_error::{ModerationError, ModerationErrorKind};
///
/// let err = ModerationError::new(ModerationErrorKind::PermissionDenied(
///     "power level too low".to_string(),
/// ));
/// assert!(format!("{}", err).contains("Permission denied"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Moderation Error: {} at line {} in {}", kind, line, file)]
pub struct ModerationError {
    /// The kind of error that occurred
    pub kind: ModerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ModerationError {
    /// Create a new moderation error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ModerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ModerationErrorKind {
        &self.kind
    }
}

/// Result type for moderation API calls.
pub type ModerationResult<T> = Result<T, ModerationError>;
