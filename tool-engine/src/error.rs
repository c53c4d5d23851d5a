//! Error taxonomy for request preparation.

use std::time::Duration;

use http::Method;
use thiserror::Error;
use tool_adapters::AdapterError;
use tool_prompts::TemplateError;
use tool_schema::SchemaError;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a request preparation. No partial results are returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The schema document is malformed.
    #[error("failed to load openapi spec: {reason}")]
    SchemaParse {
        /// Parser detail.
        reason: String,
    },

    /// The tool has no API schema configured.
    #[error("tool does not have an API schema")]
    MissingSchema,

    /// The action identifier is absent from the schema.
    #[error("failed to find path and method for action `{action}`")]
    ActionNotFound {
        /// Requested action identifier.
        action: String,
    },

    /// The prompt template could not be parsed or rendered.
    #[error("failed to render request prompt: {source}")]
    Template {
        /// Source [`TemplateError`].
        #[from]
        source: TemplateError,
    },

    /// The model call failed or produced no answer.
    #[error("failed to get response from inference API: {reason}")]
    Inference {
        /// Failure detail.
        reason: String,
    },

    /// The model answer is not a JSON object.
    #[error("failed to parse model response as parameters ({reason}): {raw}")]
    ResponseParse {
        /// Parser detail.
        reason: String,
        /// Raw model answer.
        raw: String,
    },

    /// An operation cannot be addressed because it has no identifier.
    #[error("operationId is missing for {method} {path}")]
    MissingIdentifier {
        /// Path of the offending operation.
        path: String,
        /// Method of the offending operation.
        method: Method,
    },

    /// The caller cancelled the invocation during the model call.
    #[error("request preparation cancelled")]
    Cancelled,

    /// The model call exceeded the configured inference timeout.
    #[error("inference timed out after {timeout:?}")]
    TimedOut {
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The configured base URL or the resulting request URL is invalid.
    #[error("invalid request URL `{url}`: {reason}")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Parser detail.
        reason: String,
    },

    /// A configured header cannot be sent.
    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader {
        /// Header name as configured.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The conversation has no message to extract parameters from.
    #[error("conversation history is empty")]
    EmptyHistory,

    /// The action requires a request body, which cannot be built.
    #[error("action `{action}` requires a request body, which is not supported")]
    UnsupportedRequestBody {
        /// Action identifier.
        action: String,
    },
}

impl EngineError {
    /// Convenience constructor for inference failures.
    #[must_use]
    pub fn inference(reason: impl Into<String>) -> Self {
        Self::Inference {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for unparseable model answers.
    #[must_use]
    pub fn response_parse(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::ResponseParse {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_header(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<SchemaError> for EngineError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Parse { reason } => Self::SchemaParse { reason },
            SchemaError::MissingSchema => Self::MissingSchema,
            SchemaError::ActionNotFound { action } => Self::ActionNotFound { action },
            SchemaError::MissingIdentifier { path, method } => {
                Self::MissingIdentifier { path, method }
            }
            SchemaError::Render { source } => Self::SchemaParse {
                reason: format!("failed to marshal openapi spec: {source}"),
            },
        }
    }
}

impl From<AdapterError> for EngineError {
    fn from(err: AdapterError) -> Self {
        Self::inference(err.to_string())
    }
}
