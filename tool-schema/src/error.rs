//! Errors raised while reading API descriptions.

use http::Method;
use thiserror::Error;

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors produced while parsing or querying a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document is not a readable OpenAPI description.
    #[error("failed to load openapi spec: {reason}")]
    Parse {
        /// Parser or structural failure detail.
        reason: String,
    },

    /// The tool has no API schema configured.
    #[error("tool does not have an API schema")]
    MissingSchema,

    /// No operation carries the requested identifier.
    #[error("failed to find path and method for action `{action}`")]
    ActionNotFound {
        /// Requested action identifier.
        action: String,
    },

    /// An operation has no `operationId` and cannot be addressed.
    #[error("operationId is missing for {method} {path}")]
    MissingIdentifier {
        /// Path of the offending operation.
        path: String,
        /// Method of the offending operation.
        method: Method,
    },

    /// A filtered document could not be rendered.
    #[error("failed to marshal openapi spec: {source}")]
    Render {
        /// Source [`serde_json::Error`].
        #[from]
        source: serde_json::Error,
    },
}

impl SchemaError {
    /// Convenience constructor for parse failures.
    #[must_use]
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}
