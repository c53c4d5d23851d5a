//! Turns a conversation into an executable HTTP request for an API tool.
//!
//! [`ApiRequestPreparer`] runs the whole pipeline for one invocation: the
//! tool's schema is reduced to the requested action, a language model infers
//! parameter values from the conversation, and the action's path and query
//! are filled in to produce a [`BuiltRequest`]. Executing the request is left
//! to the caller.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod inference;
mod preparer;
mod request;

pub use error::{EngineError, EngineResult};
pub use inference::{ParameterValue, parse_parameters};
pub use preparer::{ApiRequestPreparer, DEFAULT_OWNER, InvocationContext};
pub use request::{BuiltRequest, TOOL_ACTION_ID_HEADER, TOOL_ID_HEADER, build_request};
