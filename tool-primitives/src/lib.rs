//! Core shared types for schema-driven API tools.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod history;
mod ids;
mod params;
mod tool;

/// Error type and result alias shared across the SDK.
pub use error::{Error, Result};
/// Ordered conversation turns supplied by the caller.
pub use history::ToolHistoryMessage;
/// Identifier of a configured tool.
pub use ids::ToolId;
/// Flat string-valued parameters inferred for an action.
pub use params::ParameterSet;
/// Tool definitions and their API configuration.
pub use tool::{ApiConfig, Tool, ToolConfig};
