//! Configuration for the API tool engine.
//!
//! Values come from serde (embedded in a host application's config file) or
//! from environment variables via [`EngineConfig::from_env`].

#![warn(missing_docs, clippy::pedantic)]

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the model used for parameter inference.
pub const MODEL_ENV: &str = "API_TOOLS_MODEL";
/// Environment variable holding the inference timeout in whole seconds.
pub const INFERENCE_TIMEOUT_ENV: &str = "API_TOOLS_INFERENCE_TIMEOUT_SECS";
/// Environment variable overriding the model provider base URL.
pub const PROVIDER_BASE_URL_ENV: &str = "API_TOOLS_PROVIDER_BASE_URL";
/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Inference timeout used when none is configured.
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 60;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is present but unusable.
    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid {
        /// Name of the offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Settings shared by every request preparation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    model: String,
    inference_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_base_url: Option<String>,
    #[serde(skip_serializing)]
    api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            inference_timeout_ms: DEFAULT_INFERENCE_TIMEOUT_SECS * 1000,
            provider_base_url: None,
            api_key: None,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration for `model` with default settings.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for blank models, non-numeric or zero
    /// timeouts, and blank base URLs.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup(MODEL_ENV) {
            if model.trim().is_empty() {
                return Err(ConfigError::invalid(MODEL_ENV, "model cannot be empty"));
            }
            config.model = model.trim().to_owned();
        }

        if let Some(raw) = lookup(INFERENCE_TIMEOUT_ENV) {
            let secs = raw.trim().parse::<u64>().map_err(|err| {
                ConfigError::invalid(INFERENCE_TIMEOUT_ENV, format!("`{raw}`: {err}"))
            })?;
            if secs == 0 {
                return Err(ConfigError::invalid(
                    INFERENCE_TIMEOUT_ENV,
                    "timeout must be at least one second",
                ));
            }
            config.inference_timeout_ms = secs.saturating_mul(1000);
        }

        if let Some(url) = lookup(PROVIDER_BASE_URL_ENV) {
            if url.trim().is_empty() {
                return Err(ConfigError::invalid(
                    PROVIDER_BASE_URL_ENV,
                    "base URL cannot be empty",
                ));
            }
            config.provider_base_url = Some(url.trim().to_owned());
        }

        config.api_key = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty());

        debug!(
            model = %config.model,
            inference_timeout_ms = config.inference_timeout_ms,
            provider_base_url = ?config.provider_base_url,
            api_key_configured = config.api_key.is_some(),
            "loaded engine configuration"
        );

        Ok(config)
    }

    /// Sets the inference timeout, kept at millisecond precision and never
    /// below one millisecond.
    #[must_use]
    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout_ms = u64::try_from(timeout.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }

    /// Sets the provider base URL.
    #[must_use]
    pub fn with_provider_base_url(mut self, url: impl Into<String>) -> Self {
        self.provider_base_url = Some(url.into());
        self
    }

    /// Sets the provider API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Model used for parameter inference.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Upper bound on a single model call.
    #[must_use]
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    /// Provider base URL override.
    #[must_use]
    pub fn provider_base_url(&self) -> Option<&str> {
        self.provider_base_url.as_deref()
    }

    /// Provider API key.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.inference_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn reads_every_key() {
        let config = EngineConfig::from_lookup(lookup(&[
            (MODEL_ENV, "llama3:instruct"),
            (INFERENCE_TIMEOUT_ENV, " 15 "),
            (PROVIDER_BASE_URL_ENV, "http://localhost:11434"),
            (API_KEY_ENV, "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.model(), "llama3:instruct");
        assert_eq!(config.inference_timeout(), Duration::from_secs(15));
        assert_eq!(config.provider_base_url(), Some("http://localhost:11434"));
        assert_eq!(config.api_key(), Some("sk-test"));
    }

    #[test]
    fn rejects_invalid_values() {
        for pairs in [
            [(MODEL_ENV, " ")],
            [(INFERENCE_TIMEOUT_ENV, "soon")],
            [(INFERENCE_TIMEOUT_ENV, "0")],
            [(PROVIDER_BASE_URL_ENV, "")],
        ] {
            let err = EngineConfig::from_lookup(lookup(&pairs)).expect_err("invalid");
            assert!(matches!(err, ConfigError::Invalid { key, .. } if key == pairs[0].0));
        }
    }

    #[test]
    fn sub_second_timeouts_are_kept() {
        let config = EngineConfig::default().with_inference_timeout(Duration::from_millis(1500));
        assert_eq!(config.inference_timeout(), Duration::from_millis(1500));

        let config = EngineConfig::default().with_inference_timeout(Duration::from_millis(500));
        assert_eq!(config.inference_timeout(), Duration::from_millis(500));

        let config = EngineConfig::default().with_inference_timeout(Duration::ZERO);
        assert_eq!(config.inference_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn deserializes_with_defaults_and_hides_key() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "model": "gpt-4o", "api_key": "secret" }"#).unwrap();
        assert_eq!(config.model(), "gpt-4o");
        assert_eq!(config.inference_timeout(), Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS));

        let config: EngineConfig =
            serde_json::from_str(r#"{ "inference_timeout_ms": 2500 }"#).unwrap();
        assert_eq!(config.inference_timeout(), Duration::from_millis(2500));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
