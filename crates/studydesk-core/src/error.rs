//! Core error types for studydesk-core.
//!
//! One thiserror hierarchy per concern: the shared state store, the session
//! log, configuration, and side-effect dispatch. Side-effect errors never
//! reach command callers; store errors do (see the propagation notes on
//! `TimerAuthority`).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for studydesk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Shared state store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session log errors
    #[error("Session log error: {0}")]
    SessionLog(#[from] SessionLogError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors from the shared persisted state store and its adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open an adapter's backing resource
    #[error("Failed to open store at {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    /// Read failed in a specific adapter
    #[error("Read failed for key '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Write failed in a specific adapter
    #[error("Write failed for key '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Every adapter in the fallback chain failed
    #[error("All store adapters failed for key '{key}'")]
    Exhausted { key: String },
}

/// Session-log (SQLite) errors.
#[derive(Error, Debug)]
pub enum SessionLogError {
    /// Failed to open the database
    #[error("Failed to open session log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl From<rusqlite::Error> for SessionLogError {
    fn from(err: rusqlite::Error) -> Self {
        SessionLogError::QueryFailed(err.to_string())
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Side-effect (audio / notification) errors. Always caught and logged at
/// the dispatch site, never propagated into timer state.
#[derive(Error, Debug)]
pub enum EffectError {
    /// Sound playback was rejected or no player is available
    #[error("Playback failed: {0}")]
    Playback(String),

    /// OS notification could not be shown
    #[error("Notification failed: {0}")]
    Notification(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
