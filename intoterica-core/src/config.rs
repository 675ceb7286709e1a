//! Configuration for the Intoterica faction engine.
//!
//! Maps directly to `intoterica.toml`. Every field has a default, so an
//! empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntotericaConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Chat notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// World settings store.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl IntotericaConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `IntotericaError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::IntotericaError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the faction engine is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
        }
    }
}

/// Which committed changes are announced in chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Master switch for faction chat cards.
    #[serde(default = "default_true")]
    pub notify_factions: bool,
    /// Announce every reputation value change, not just tier changes.
    #[serde(default = "default_true")]
    pub reputation_changes: bool,
    /// Announce tier label changes.
    #[serde(default = "default_true")]
    pub tier_changes: bool,
    /// Announce XP awards and promotions.
    #[serde(default = "default_true")]
    pub xp_awards: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notify_factions: true,
            reputation_changes: true,
            tier_changes: true,
            xp_awards: true,
        }
    }
}

/// World settings store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Settings namespace holding the world document.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Settings key of the world document.
    #[serde(default = "default_key")]
    pub key: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Number of rotating backups to keep.
    #[serde(default = "default_3")]
    pub backup_count: u32,
    /// Detect document corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            namespace: default_namespace(),
            key: default_key(),
            wal_mode: true,
            backup_count: 3,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_database_path() -> String { "intoterica.db".to_string() }
fn default_namespace() -> String { "intoterica".to_string() }
fn default_key() -> String { "data".to_string() }
fn default_3() -> u32 { 3 }
