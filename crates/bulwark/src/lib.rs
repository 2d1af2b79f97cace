//! Bulwark - a moderation-policy engine for chat rooms.
//!
//! Pluggable *protections* watch abuse reports and room messages, and act
//! (alert, redact, ban) once their configured policy triggers. Operators
//! reconfigure protections at runtime through text commands; changes are
//! validated, persisted, and applied to the running protection atomically.
//!
//! This facade re-exports the workspace crates:
//! - [`bulwark_error`] - error types
//! - [`bulwark_interface`] - events and the moderation client contract
//! - [`bulwark_protection`] - settings, protections and the registry
//! - [`bulwark_reports`] - report aggregation, action dispatch, shipped protections
//!
//! # Example
//!
//! ```no_run
//! use bulwark::{Bulwark, BulwarkConfig, LoggingModerationClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> bulwark::BulwarkResult<()> {
//! let config = BulwarkConfig::load(None)?;
//! let engine = Bulwark::start(&config, Arc::new(LoggingModerationClient::default())).await?;
//! println!("{}", engine.handle_command("set TrustedReporters.threshold 5").await);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod commands;
mod config;
mod engine;
mod logging_client;
mod telemetry;

pub use commands::{
    Command, CommandExecutor, ConfigVerb, NOT_ADMINISTRATOR, render_protections, render_settings,
};
pub use config::{BulwarkConfig, BulwarkConfigBuilder, LogFormat};
pub use engine::{Bulwark, Input};
pub use logging_client::LoggingModerationClient;
pub use telemetry::init_telemetry;

pub use bulwark_error::*;
pub use bulwark_interface::*;
pub use bulwark_protection::*;
pub use bulwark_reports::*;
