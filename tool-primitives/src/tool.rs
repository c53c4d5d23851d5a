//! Tool definitions backed by an OpenAPI description.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, ToolId};

/// A caller-owned tool. Immutable for the duration of one invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    id: ToolId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    config: ToolConfig,
}

impl Tool {
    /// Creates a tool with the supplied configuration.
    #[must_use]
    pub fn new(id: ToolId, config: ToolConfig) -> Self {
        Self {
            id,
            name: String::new(),
            description: None,
            config,
        }
    }

    /// Creates a tool whose configuration is a single API description.
    #[must_use]
    pub fn with_api(id: ToolId, api: ApiConfig) -> Self {
        Self::new(id, ToolConfig::api(api))
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the tool identifier.
    #[must_use]
    pub fn id(&self) -> &ToolId {
        &self.id
    }

    /// Returns the display name, empty when unset.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the tool configuration.
    #[must_use]
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Shortcut for the API configuration, if any.
    #[must_use]
    pub fn api(&self) -> Option<&ApiConfig> {
        self.config.api.as_ref()
    }
}

/// Persisted configuration of a tool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api: Option<ApiConfig>,
}

impl ToolConfig {
    /// Configuration for an API-backed tool.
    #[must_use]
    pub fn api(api: ApiConfig) -> Self {
        Self { api: Some(api) }
    }

    /// Returns the API configuration if present.
    #[must_use]
    pub fn api_config(&self) -> Option<&ApiConfig> {
        self.api.as_ref()
    }
}

/// HTTP API description of a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    url: String,
    #[serde(default)]
    schema: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_prep_template: Option<String>,
}

impl ApiConfig {
    /// Creates an API configuration from a base URL and raw schema text.
    ///
    /// The schema may be empty; operations that need it fail later with a
    /// missing-schema error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolConfig`] when the base URL is blank.
    pub fn new(url: impl Into<String>, schema: impl Into<String>) -> crate::Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::InvalidToolConfig {
                reason: "API base URL cannot be empty".into(),
            });
        }

        Ok(Self {
            url,
            schema: schema.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            request_prep_template: None,
        })
    }

    /// Adds a static header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a static query parameter appended to every request.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Overrides the prompt template used to infer request parameters.
    #[must_use]
    pub fn with_request_prep_template(mut self, template: impl Into<String>) -> Self {
        self.request_prep_template = Some(template.into());
        self
    }

    /// Base URL the action path is appended to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw schema document text, `None` when not configured.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        Some(self.schema.as_str()).filter(|s| !s.trim().is_empty())
    }

    /// Static headers.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Static query parameters.
    #[must_use]
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Custom prompt template, `None` when unset or blank.
    #[must_use]
    pub fn request_prep_template(&self) -> Option<&str> {
        self.request_prep_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}
