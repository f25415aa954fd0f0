//! Core error types for coding-mode-core.
//!
//! Domain failures (bad durations, missing domains, auth problems) and the
//! infrastructure failures wrapped around them share one hierarchy so the
//! message facade can turn any of them into a `{ok: false, error}` response.

use std::path::PathBuf;
use thiserror::Error;

use crate::base32::Base32Error;

/// Core error type for coding-mode-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A session length or extension was absent, zero, negative or not finite.
    #[error("{label} must be greater than 0")]
    InvalidDuration { label: &'static str },

    /// Starting a session with nothing to block.
    #[error("No blocked domains configured")]
    NoDomainsConfigured,

    /// Extending while no session is running.
    #[error("No active session to extend")]
    NoActiveSession,

    /// Auth is enabled but no shared secret exists.
    #[error("Authenticator not set")]
    AuthenticatorNotConfigured,

    /// Submitted TOTP code did not match any candidate in the window.
    #[error("Invalid code")]
    InvalidCode,

    /// Malformed Base32 input.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(#[from] Base32Error),

    /// The OS random source failed.
    #[error("Failed to generate random bytes: {0}")]
    Entropy(String),

    /// Durable store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Blocking-rule engine or wake-timer errors
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed inbound message
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Message type the facade does not know.
    #[error("Unknown message type")]
    UnknownMessage,
}

/// Durable store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt value for key '{key}': {message}")]
    CorruptValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Errors from the platform blocking-rule engine and wake-timer service.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The rule engine refused an update
    #[error("Rule update rejected: {0}")]
    RuleUpdateRejected(String),

    /// The timer service refused to schedule or cancel
    #[error("Wake-timer failure for '{name}': {message}")]
    Timer { name: String, message: String },

    /// Backing storage of a platform service failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for PolicyError {
    fn from(err: rusqlite::Error) -> Self {
        PolicyError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
