//! Shared error definitions for tool primitives.

use thiserror::Error;

/// Result alias used throughout the tool primitives.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing tool primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// Tool identifier failed validation.
    #[error("invalid tool id `{id}`: {reason}")]
    InvalidToolId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool configuration failed validation.
    #[error("invalid tool configuration: {reason}")]
    InvalidToolConfig {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
