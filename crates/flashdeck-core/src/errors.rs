//! Unified error type for the flashcard engine
//!
//! Every fallible operation in the workspace reports a [`DeckError`]. The
//! engine itself never hands these to its callers for remote or storage
//! failures; they exist so internal functions can use `?` and so the call
//! sites that discard them do it in one visible place.

use serde::{Deserialize, Serialize};

/// Unified error type for all flashcard operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DeckError {
    /// Invalid input (empty card face, malformed id, ...)
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Device-local storage failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Remote store or bridge call failed
    #[error("Remote error: {message}")]
    Remote {
        /// Error message describing the remote failure
        message: String,
    },

    /// Operation needs a session credential and none was present
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Error message naming the operation
        message: String,
    },

    /// Configuration rejected
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the rejected setting
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl DeckError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a remote error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create an unauthenticated error
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying later could plausibly succeed.
    ///
    /// Remote and storage failures are transient; everything else describes
    /// bad input or a programming error.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::Storage { .. } | Self::Unauthenticated { .. }
        )
    }
}

/// Standard Result type for flashcard operations
pub type Result<T> = std::result::Result<T, DeckError>;

impl From<serde_json::Error> for DeckError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DeckError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<std::io::Error> for DeckError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}
