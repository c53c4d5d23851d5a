//! Schema-driven API tool invocation.
//!
//! Depend on this crate via `cargo add api-tools`. It bundles the workspace
//! crates behind feature flags so downstream users only compile what they use.

#![warn(missing_docs, clippy::pedantic)]

/// Tool definitions, conversation history and parameter sets.
pub use tool_primitives as primitives;

/// OpenAPI action index, filtering and listing (enabled by `schema` feature).
#[cfg(feature = "schema")]
pub use tool_schema as schema;

/// Prompt templates (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use tool_prompts as prompts;

/// Chat completion clients (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use tool_adapters as adapters;

/// Parameter inference and request building (enabled by `engine` feature).
#[cfg(feature = "engine")]
pub use tool_engine as engine;

/// Engine configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use tool_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use tool_telemetry as telemetry;
