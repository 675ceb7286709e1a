//! Error types for the host integration layer.

use intoterica_core::IntotericaError;
use thiserror::Error;

/// Errors raised while routing or committing faction commands.
#[derive(Error, Debug)]
pub enum HostError {
    /// Failure inside the core (store, serialization, config).
    #[error(transparent)]
    Core(#[from] IntotericaError),

    /// The faction authority's command queue is gone.
    #[error("Faction writer is not running")]
    WriterClosed,

    /// The socket channel refused a message.
    #[error("Socket error: {0}")]
    Socket(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Core(IntotericaError::from(err))
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, HostError>;
