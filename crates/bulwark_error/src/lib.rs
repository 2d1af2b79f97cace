//! Error types for the Bulwark moderation-policy engine.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! The command layer renders only the kind back to users; the location is
//! kept for logs.
//!
//! # Examples
//!
//! ```
//! use bulwark_error::{BulwarkResult, ProtectionError, ProtectionErrorKind};
//!
//! fn lookup() -> BulwarkResult<()> {
//!     Err(ProtectionError::new(ProtectionErrorKind::UnknownProtection(
//!         "Nope".to_string(),
//!     )))?
//! }
//!
//! assert!(lookup().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod config;
mod error;
mod moderation;
mod protection;

pub use command::{CommandError, CommandErrorKind, CommandResult};
pub use config::ConfigError;
pub use error::{BulwarkError, BulwarkErrorKind, BulwarkResult};
pub use moderation::{ModerationError, ModerationErrorKind, ModerationResult};
pub use protection::{ProtectionError, ProtectionErrorKind, ProtectionResult};
