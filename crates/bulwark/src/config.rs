//! Runtime configuration.
//!
//! Sources are merged in increasing precedence:
//! 1. Bundled defaults (include_str! from bulwark.toml)
//! 2. `~/.config/bulwark/bulwark.toml`
//! 3. `./bulwark.toml`
//! 4. An explicit file passed on the command line
//! 5. `BULWARK_*` environment variables

use bulwark_error::{BulwarkResult, ConfigError};
use bulwark_protection::{MemoryStore, SettingsStore, TomlFileStore};
use bulwark_reports::DEFAULT_REPORT_CAPACITY;
use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Log output style.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

fn default_management_room() -> String {
    "!management:localhost".to_string()
}

fn default_report_capacity() -> usize {
    DEFAULT_REPORT_CAPACITY
}

/// Engine configuration.
///
/// # Example
///
/// ```
/// use bulwark::BulwarkConfigBuilder;
///
/// let config = BulwarkConfigBuilder::default()
///     .management_room("!mgmt:example.org")
///     .report_capacity(50usize)
///     .build()
///     .unwrap();
/// assert_eq!(*config.report_capacity(), 50);
/// assert!(config.settings_path().is_none());
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct BulwarkConfig {
    /// Channel receiving audit notices
    #[builder(default = "default_management_room()")]
    #[serde(default = "default_management_room")]
    management_room: String,

    /// Reported messages tracked at once
    #[builder(default = "default_report_capacity()")]
    #[serde(default = "default_report_capacity")]
    report_capacity: usize,

    /// Settings file; settings live in memory when absent
    #[builder(default)]
    #[serde(default)]
    settings_path: Option<PathBuf>,

    /// Protections enabled on first start
    #[builder(default)]
    #[serde(default)]
    enabled_protections: Vec<String>,

    /// Log output style
    #[builder(default)]
    #[serde(default)]
    log_format: LogFormat,
}

impl BulwarkConfig {
    /// Load configuration from every source, `extra` taking precedence over
    /// the discovered files.
    #[instrument]
    pub fn load(extra: Option<&Path>) -> BulwarkResult<Self> {
        debug!("Loading configuration with precedence: env > explicit > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../bulwark.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/bulwark/bulwark.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("bulwark").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("BULWARK")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("enabled_protections"),
        );

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;
        config.validate()
    }

    /// Load configuration from one TOML file only.
    pub fn from_file(path: impl AsRef<Path>) -> BulwarkResult<Self> {
        let path = path.as_ref();
        let config: Self = Config::builder()
            .add_source(File::from(path))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to parse configuration from {}: {}",
                    path.display(),
                    e
                ))
            })?;
        config.validate()
    }

    /// Reject values no component can run with.
    pub fn validate(self) -> BulwarkResult<Self> {
        if self.report_capacity < 1 {
            return Err(ConfigError::new("report_capacity must be at least 1").into());
        }
        if self.management_room.trim().is_empty() {
            return Err(ConfigError::new("management_room must not be empty").into());
        }
        Ok(self)
    }

    /// Settings store selected by `settings_path`.
    pub fn settings_store(&self) -> Arc<dyn SettingsStore> {
        match &self.settings_path {
            Some(path) => Arc::new(TomlFileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        }
    }
}

impl Default for BulwarkConfig {
    fn default() -> Self {
        Self {
            management_room: default_management_room(),
            report_capacity: default_report_capacity(),
            settings_path: None,
            enabled_protections: Vec::new(),
            log_format: LogFormat::default(),
        }
    }
}
