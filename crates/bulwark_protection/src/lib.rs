//! Protection framework for Bulwark.
//!
//! A *protection* is a pluggable moderation-policy unit with typed,
//! live-reconfigurable settings. This crate provides:
//!
//! - [`SettingType`] / [`SettingValue`] - typed parse/validate/serialize for one setting
//! - [`ProtectionSettings`] - the named settings owned by one protection
//! - [`Protection`] - the policy unit, with an explicit [`Capability`] set
//! - [`ProtectionRegistry`] - catalog of protections, enable/disable, and
//!   the validate → persist → live-patch settings pipeline
//! - [`SettingsStore`] - persistence seam for settings and the enabled set

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod protection;
mod registry;
mod setting;
mod settings;
mod store;

pub use protection::{
    Capability, EventHandler, Protection, ProtectionContext, ReportHandler, SharedSettings,
    shared_settings,
};
pub use registry::{Delivery, ProtectionRegistry, ProtectionSummary, SettingChange, SettingUpdate};
pub use setting::{ListItem, SettingKind, SettingType, SettingValue};
pub use settings::ProtectionSettings;
pub use store::{MemoryStore, SettingsStore, TomlFileStore};
