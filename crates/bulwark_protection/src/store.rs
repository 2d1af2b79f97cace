//! Persistence for protection settings and the enabled set.
//!
//! Values are stored as the text form of each [`SettingValue`](crate::SettingValue)
//! and re-parsed through the owning [`SettingType`](crate::SettingType) on
//! restore, so a stored value can never bypass validation.

use async_trait::async_trait;
use bulwark_error::{ProtectionError, ProtectionErrorKind, ProtectionResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Durable home for settings and the enabled set.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored settings for `protection`; empty if none were saved.
    async fn load_settings(&self, protection: &str) -> ProtectionResult<BTreeMap<String, String>>;

    /// Replace the stored settings for `protection`.
    async fn save_settings(
        &self,
        protection: &str,
        values: &BTreeMap<String, String>,
    ) -> ProtectionResult<()>;

    /// Stored enabled set, or `None` if it was never saved.
    async fn load_enabled(&self) -> ProtectionResult<Option<Vec<String>>>;

    /// Replace the stored enabled set.
    async fn save_enabled(&self, names: &[String]) -> ProtectionResult<()>;
}

/// On-disk layout shared by both stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<Vec<String>>,
    #[serde(default)]
    settings: BTreeMap<String, BTreeMap<String, String>>,
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_settings(&self, protection: &str) -> ProtectionResult<BTreeMap<String, String>> {
        Ok(self
            .document
            .lock()
            .settings
            .get(protection)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_settings(
        &self,
        protection: &str,
        values: &BTreeMap<String, String>,
    ) -> ProtectionResult<()> {
        self.document
            .lock()
            .settings
            .insert(protection.to_string(), values.clone());
        Ok(())
    }

    async fn load_enabled(&self) -> ProtectionResult<Option<Vec<String>>> {
        Ok(self.document.lock().enabled.clone())
    }

    async fn save_enabled(&self, names: &[String]) -> ProtectionResult<()> {
        self.document.lock().enabled = Some(names.to_vec());
        Ok(())
    }
}

/// Store backed by one TOML file.
///
/// Every save rewrites the whole document through a sibling temporary file
/// and a rename, so a crash mid-write leaves the previous version intact.
///
/// ```toml
/// enabled = ["TrustedReporters"]
///
/// [settings.TrustedReporters]
/// threshold = "5"
/// mxids = "@alice:example.org, @bob:example.org"
/// ```
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles on the file.
    lock: tokio::sync::Mutex<()>,
}

impl TomlFileStore {
    /// Store at `path`; the file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> ProtectionResult<StoreDocument> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                storage(format!("Failed to parse {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Settings file missing, starting empty");
                Ok(StoreDocument::default())
            }
            Err(e) => Err(storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write(&self, document: &StoreDocument) -> ProtectionResult<()> {
        let content = toml::to_string(document)
            .map_err(|e| storage(format!("Failed to serialize settings: {}", e)))?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let temp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&temp, content)
            .await
            .map_err(|e| storage(format!("Failed to write {}: {}", temp.display(), e)))?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl SettingsStore for TomlFileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_settings(&self, protection: &str) -> ProtectionResult<BTreeMap<String, String>> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        Ok(document.settings.remove(protection).unwrap_or_default())
    }

    #[instrument(skip(self, values), fields(path = %self.path.display()))]
    async fn save_settings(
        &self,
        protection: &str,
        values: &BTreeMap<String, String>,
    ) -> ProtectionResult<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        document
            .settings
            .insert(protection.to_string(), values.clone());
        self.write(&document).await?;
        debug!(count = values.len(), "Saved protection settings");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_enabled(&self) -> ProtectionResult<Option<Vec<String>>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.enabled)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn save_enabled(&self, names: &[String]) -> ProtectionResult<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        document.enabled = Some(names.to_vec());
        self.write(&document).await
    }
}

#[track_caller]
fn storage(message: String) -> ProtectionError {
    ProtectionError::new(ProtectionErrorKind::Storage(message))
}
