//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise `general.log_level` from the
//! configuration file is used.

use intoterica_core::config::GeneralConfig;
use tracing_subscriber::EnvFilter;

use crate::error::{HostError, Result};

fn filter(general: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&general.log_level))
}

/// Install a human-readable subscriber.
///
/// # Errors
/// Returns [`HostError::Config`] if a global subscriber is already set.
pub fn init_tracing(general: &GeneralConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(general))
        .with_target(false)
        .try_init()
        .map_err(|e| HostError::Config(format!("tracing: {e}")))
}

/// Install a JSON-lines subscriber for log shippers.
///
/// # Errors
/// Returns [`HostError::Config`] if a global subscriber is already set.
pub fn init_json_tracing(general: &GeneralConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(general))
        .try_init()
        .map_err(|e| HostError::Config(format!("tracing: {e}")))
}
