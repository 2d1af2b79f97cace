//! Top-level error wrapper types.

use crate::{CommandError, ConfigError, ModerationError, ProtectionError};

/// Union of every error the workspace can surface.
///
/// # Examples
///
/// ```
/// use bulwark_error::{BulwarkError, ConfigError};
///
/// let err: BulwarkError = ConfigError::new("missing management_room").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum BulwarkErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Protection framework error
    #[from(ProtectionError)]
    Protection(ProtectionError),
    /// External moderation API error
    #[from(ModerationError)]
    Moderation(ModerationError),
    /// Operator command error
    #[from(CommandError)]
    Command(CommandError),
}

/// Bulwark error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Bulwark Error: {}", _0)]
pub struct BulwarkError(Box<BulwarkErrorKind>);

impl BulwarkError {
    /// Create a new error from a kind.
    pub fn new(kind: BulwarkErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &BulwarkErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to BulwarkErrorKind
impl<T> From<T> for BulwarkError
where
    T: Into<BulwarkErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Bulwark operations.
pub type BulwarkResult<T> = Result<T, BulwarkError>;
