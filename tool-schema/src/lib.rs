//! OpenAPI schema handling for API tools.
//!
//! A tool's raw API description is parsed into a [`SchemaDocument`], which can
//! then resolve an action identifier to its method, path, and parameter
//! classification, produce a minimal document for a single action to keep
//! prompts small, and list every action it declares.
//!
//! Operations are always enumerated in a fixed order (paths lexically, then
//! methods by name) so "first match wins" is deterministic.

#![warn(missing_docs, clippy::pedantic)]

mod actions;
mod document;
mod error;
mod filter;
mod index;

pub use actions::{ApiAction, list_actions};
pub use document::{OperationEntry, SchemaDocument};
pub use error::{SchemaError, SchemaResult};
pub use filter::{filter_schema, filter_tool_schema};
pub use index::{
    ParameterClassification, ParameterLocation, RequestBodyRequirement, ResolvedAction,
    resolve_action,
};
