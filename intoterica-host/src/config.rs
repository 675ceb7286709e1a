//! Host-side configuration.
//!
//! Extends the core `intoterica.toml` with permission thresholds and
//! dispatch queue sizes. Core sections (`[general]`, `[notifications]`,
//! `[persistence]`) live in the same file.

use intoterica_core::config::IntotericaConfig;
use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};
use crate::roles::PermissionConfig;

/// Full host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Core engine sections.
    #[serde(flatten)]
    pub engine: IntotericaConfig,
    /// Role thresholds.
    #[serde(default)]
    pub permissions: PermissionConfig,
    /// Command queue and socket sizing.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl HostConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `HostError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| HostError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HostError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }
}

/// Queue sizing for the single-writer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Pending commands the authority will buffer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Socket messages buffered per subscriber.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize { 64 }
fn default_broadcast_capacity() -> usize { 256 }
