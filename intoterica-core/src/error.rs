//! Error types for the Intoterica core library.
//!
//! Missing factions or members are not errors: lookups return `None` and
//! the operation becomes a no-op. Only infrastructure failures surface here.

use thiserror::Error;

/// Top-level error type for all Intoterica core operations.
#[derive(Error, Debug)]
pub enum IntotericaError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored world document is structurally unusable.
    #[error("Corrupt world document under {namespace}.{key}: {reason}")]
    CorruptDocument {
        /// Settings namespace of the document.
        namespace: String,
        /// Settings key of the document.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for IntotericaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, IntotericaError>;
