//! Error types for the Memo application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Memo application.
///
/// The first four variants form the synchronization taxonomy: failures reported by the
/// remote store, local validation failures, missing sessions, and rejected double
/// submissions. The rest cover the ambient concerns (configuration, the local token file).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoError {
    /// Network or store failure. The message is store-supplied and shown verbatim.
    #[error("{message}")]
    Remote { message: String },

    /// A required draft field was empty after trimming.
    #[error("{field} must not be empty")]
    Validation { field: &'static str },

    /// No authenticated session is present.
    #[error("Not signed in")]
    AuthAbsent,

    /// A create/update submission is already in flight for this editor.
    #[error("A submission is already in progress")]
    SubmitPending,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },
}

impl MemoError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Remote error carrying the store's message.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Creates a Validation error for the named field.
    pub fn validation(field: &'static str) -> Self {
        Self::Validation { field }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Remote error
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error means there is no session
    pub fn is_auth_absent(&self) -> bool {
        matches!(self, Self::AuthAbsent)
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<reqwest::Error> for MemoError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for MemoError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MemoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MemoError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MemoError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, MemoError>`.
pub type Result<T> = std::result::Result<T, MemoError>;
