//! Tracing setup for binaries built on the API tool crates.
//!
//! Library crates only emit `tracing` events; applications call
//! [`init_tracing`] once at startup to print them.

#![warn(missing_docs, clippy::pedantic)]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser detail.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {reason}")]
    AlreadyInitialized {
        /// Detail from `tracing-subscriber`.
        reason: String,
    },
}

/// Output options for the fmt subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Directive applied when `RUST_LOG` is unset, e.g. `tool_engine=debug`.
    pub default_directive: String,
    /// Print event targets.
    pub with_target: bool,
    /// Use the compact line format.
    pub compact: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_DIRECTIVE.to_owned(),
            with_target: false,
            compact: false,
        }
    }
}

impl TelemetryConfig {
    /// Uses `directive` when `RUST_LOG` is unset.
    #[must_use]
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Builds the filter, preferring `RUST_LOG` over the default directive.
    ///
    /// An empty `RUST_LOG` counts as unset.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] when `RUST_LOG` or the
    /// default directive is malformed.
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        self.filter_for(from_env.as_deref())
    }

    fn filter_for(&self, from_env: Option<&str>) -> Result<EnvFilter, TelemetryError> {
        let directive = from_env
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or(&self.default_directive);
        EnvFilter::try_new(directive).map_err(|err| TelemetryError::InvalidFilter {
            directive: directive.to_owned(),
            reason: err.to_string(),
        })
    }
}

/// Installs a global fmt subscriber filtered by `RUST_LOG` or the configured
/// default directive.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_level(true);

    let installed = if config.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|err| TelemetryError::AlreadyInitialized {
        reason: err.to_string(),
    })
}
