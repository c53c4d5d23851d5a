//! `OpenAI`-compatible chat completion client.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, CallContext, ChatChoice, ChatCompletionClient,
    ChatCompletionRequest, ChatCompletionResponse, MessageRole, PromptMessage,
};

/// Environment variable used when loading configuration automatically.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for the `OpenAI` adapter.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl OpenAiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: "https://api.openai.com/".to_owned(),
            timeout: Duration::from_secs(60),
            default_temperature: None,
        }
    }

    /// Loads the API key from the `OPENAI_API_KEY` environment variable.
    #[must_use]
    pub fn from_env(model: impl Into<String>) -> Self {
        let mut cfg = Self::new(model);
        cfg.api_key = env::var(OPENAI_API_KEY_ENV).ok();
        cfg
    }

    /// Overrides the base URL used for API calls, e.g. a self-hosted
    /// `OpenAI`-compatible gateway.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        let sanitized = sanitize_base_url(base_url.as_ref())?;
        self.base_url = sanitized;
        Ok(self)
    }

    /// Sets the default sampling temperature used when requests omit it.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Client that calls an `OpenAI`-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Constructs a new adapter with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| AdapterError::configuration("OpenAI adapter requires an API key"))?;

        let metadata = AdapterMetadata::new("openai", config.model.clone());
        let endpoint = format!("{}v1/chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                AdapterError::configuration(format!("invalid OpenAI endpoint: {err}"))
            })?;

        let client = build_https_client()?;

        Ok(Self {
            client,
            endpoint,
            metadata,
            api_key,
            timeout: config.timeout,
            default_temperature: config.default_temperature,
        })
    }

    fn build_request(&self, context: &CallContext, request: &ChatCompletionRequest) -> WireRequest {
        let messages = request.messages().iter().map(map_prompt_message).collect();

        WireRequest {
            model: request
                .model()
                .unwrap_or_else(|| self.metadata.model())
                .to_owned(),
            messages,
            temperature: request.temperature().or(self.default_temperature),
            max_tokens: request.max_output_tokens(),
            stream: false,
            user: Some(context.owner_id().to_owned()).filter(|owner| !owner.is_empty()),
        }
    }
}

#[async_trait]
impl ChatCompletionClient for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn create_chat_completion(
        &self,
        context: &CallContext,
        request: ChatCompletionRequest,
    ) -> AdapterResult<ChatCompletionResponse> {
        let payload = self.build_request(context, &request);
        debug!(
            model = %payload.model,
            session_id = context.session_id(),
            interaction_id = context.interaction_id(),
            step = %context.step(),
            "sending chat completion request"
        );
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode OpenAI request: {err}"))
        })?;

        let mut builder = Request::post(self.endpoint.clone());
        builder = builder.header(CONTENT_TYPE, "application/json");
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", self.api_key));

        let request = builder.body(Body::from(body)).map_err(|err| {
            AdapterError::transport(format!("failed to build OpenAI request: {err}"))
        })?;

        let response = timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| AdapterError::transport("OpenAI request timed out"))?
            .map_err(|err| AdapterError::transport(format!("OpenAI request failed: {err}")))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            AdapterError::transport(format!("failed to read OpenAI response: {err}"))
        })?;

        if status == hyper::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after.and_then(|secs| secs.parse::<u64>().ok());
            return Err(AdapterError::RateLimited {
                retry_after: retry_after.map(Duration::from_secs),
            });
        }

        if !status.is_success() {
            let reason = String::from_utf8_lossy(&bytes).to_string();
            return Err(AdapterError::response(format!(
                "OpenAI returned {status}: {reason}"
            )));
        }

        let response: WireResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode OpenAI response: {err}"))
        })?;

        Ok(map_response(response))
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "max_tokens")]
    max_tokens: Option<u32>,
    #[serde(default)]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_prompt_message(message: &PromptMessage) -> OpenAiMessage {
    OpenAiMessage {
        role: message.role().to_string(),
        content: message.content().to_owned(),
    }
}

/// Choices without a message are skipped; a missing content reads as empty.
fn map_response(response: WireResponse) -> ChatCompletionResponse {
    let choices = response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message)
        .map(|message| ChatChoice {
            message: PromptMessage::new(
                MessageRole::Assistant,
                message.content.unwrap_or_default(),
            ),
        })
        .collect();

    ChatCompletionResponse { choices }
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "OpenAI base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid OpenAI base URL: {err}")))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LlmCallStep;

    fn context() -> CallContext {
        CallContext::new("system", "ses_1", "int_1", LlmCallStep::PrepareApiRequest)
    }

    #[test]
    fn base_url_requires_scheme() {
        let err = OpenAiConfig::new("gpt-4")
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");

        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn sanitize_allows_trailing_slash() {
        let cfg = OpenAiConfig::new("gpt-4")
            .with_base_url("https://example.com/openai")
            .expect("valid URL");
        assert_eq!(cfg.base_url, "https://example.com/openai/");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = OpenAiAdapter::new(OpenAiConfig::new("gpt-4")).expect_err("no key");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn prompt_mapping_preserves_role() {
        let message = PromptMessage::new(MessageRole::User, "hello");
        let mapped = map_prompt_message(&message);
        assert_eq!(mapped.role, "user");
        assert_eq!(mapped.content, "hello");
    }

    #[test]
    fn response_mapping_keeps_every_choice() {
        let json = r#"{
            "choices": [
                { "message": { "content": "{\"a\": 1}" } },
                { "message": { "content": null } },
                { }
            ]
        }"#;

        let parsed: WireResponse = serde_json::from_str(json).unwrap();
        let response = map_response(parsed);
        assert_eq!(response.choices.len(), 2);
        assert_eq!(response.first_content(), Some(r#"{"a": 1}"#));
        assert_eq!(response.choices[1].message.content(), "");
    }

    #[test]
    fn empty_choice_list_maps_to_no_choices() {
        let parsed: WireResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(map_response(parsed).choices.is_empty());
    }

    #[test]
    fn build_request_uses_defaults() {
        let config = OpenAiConfig::new("gpt-4")
            .with_default_temperature(0.2)
            .with_api_key("test_key");
        let adapter = OpenAiAdapter::new(config).expect("adapter");
        let request = ChatCompletionRequest::new(vec![
            PromptMessage::system("system"),
            PromptMessage::user("hello"),
        ])
        .unwrap();

        let wire = adapter.build_request(&context(), &request);
        assert_eq!(wire.model, adapter.metadata.model());
        assert_eq!(wire.messages.len(), 2);
        assert!(wire.temperature.is_some());
        assert!(!wire.stream);
        assert_eq!(wire.user.as_deref(), Some("system"));
    }

    #[test]
    fn request_model_overrides_default() {
        let adapter =
            OpenAiAdapter::new(OpenAiConfig::new("gpt-4").with_api_key("k")).expect("adapter");
        let request = ChatCompletionRequest::new(vec![PromptMessage::user("hi")])
            .unwrap()
            .with_model("llama3:instruct");

        let wire = adapter.build_request(&context(), &request);
        assert_eq!(wire.model, "llama3:instruct");
    }
}
