//! End-to-end request preparation for a single tool invocation.

use std::fmt;
use std::sync::Arc;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tool_adapters::{CallContext, ChatCompletionClient, ChatCompletionRequest, LlmCallStep};
use tool_config::EngineConfig;
use tool_primitives::{ApiConfig, ParameterSet, Tool, ToolHistoryMessage};
use tool_schema::{ApiAction, SchemaDocument};
use tracing::{Instrument, debug, info, info_span};

use crate::error::{EngineError, EngineResult};
use crate::inference::{build_messages, parse_parameters};
use crate::request::{BuiltRequest, build_request, ensure_body_supported};

/// Owner recorded on model calls when the caller does not name one.
pub const DEFAULT_OWNER: &str = "system";

/// Per-invocation attribution and cancellation.
#[derive(Clone, Debug, Default)]
pub struct InvocationContext {
    owner_id: Option<String>,
    session_id: String,
    interaction_id: String,
    cancellation: Option<CancellationToken>,
}

impl InvocationContext {
    /// Creates a context for the supplied session and interaction.
    #[must_use]
    pub fn new(session_id: impl Into<String>, interaction_id: impl Into<String>) -> Self {
        Self {
            owner_id: None,
            session_id: session_id.into(),
            interaction_id: interaction_id.into(),
            cancellation: None,
        }
    }

    /// Attributes model calls to `owner_id`.
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Aborts the model call when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Owner identifier, [`DEFAULT_OWNER`] when unset.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        self.owner_id.as_deref().unwrap_or(DEFAULT_OWNER)
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Interaction identifier.
    #[must_use]
    pub fn interaction_id(&self) -> &str {
        &self.interaction_id
    }

    /// Cancellation token, if any.
    #[must_use]
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    fn call_context(&self) -> CallContext {
        CallContext::new(
            self.owner_id(),
            &self.session_id,
            &self.interaction_id,
            LlmCallStep::PrepareApiRequest,
        )
    }
}

/// Prepares HTTP requests for API tool actions.
///
/// Holds no per-invocation state; clones share the model client and can run
/// concurrently.
#[derive(Clone)]
pub struct ApiRequestPreparer {
    client: Arc<dyn ChatCompletionClient>,
    config: EngineConfig,
}

impl fmt::Debug for ApiRequestPreparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.client.metadata();
        f.debug_struct("ApiRequestPreparer")
            .field("provider", &metadata.provider())
            .field("model", &self.config.model())
            .field("inference_timeout", &self.config.inference_timeout())
            .finish_non_exhaustive()
    }
}

impl ApiRequestPreparer {
    /// Creates a preparer calling `client` with the settings in `config`.
    #[must_use]
    pub fn new(client: Arc<dyn ChatCompletionClient>, config: EngineConfig) -> Self {
        Self { client, config }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lists the actions exposed by the tool's schema.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingSchema`], [`EngineError::SchemaParse`] or
    /// [`EngineError::MissingIdentifier`].
    pub fn list_actions(&self, tool: &Tool) -> EngineResult<Vec<ApiAction>> {
        Ok(load_schema(tool)?.1.actions()?)
    }

    /// Infers parameter values for `action` from the conversation.
    ///
    /// # Errors
    ///
    /// Fails with the schema, template, inference, parse, cancellation or
    /// timeout variants of [`EngineError`].
    pub async fn infer_parameters(
        &self,
        ctx: &InvocationContext,
        tool: &Tool,
        history: &[ToolHistoryMessage],
        action: &str,
    ) -> EngineResult<ParameterSet> {
        let (api, document) = load_schema(tool)?;
        self.infer_with(ctx, api, &document, history, action)
            .instrument(invocation_span(ctx, tool, action))
            .await
    }

    /// Builds the request for `action` from already inferred parameters.
    ///
    /// # Errors
    ///
    /// Fails with the schema variants of [`EngineError`] or any error of
    /// [`build_request`].
    pub fn build_request(
        &self,
        tool: &Tool,
        action: &str,
        params: &ParameterSet,
    ) -> EngineResult<BuiltRequest> {
        let (_, document) = load_schema(tool)?;
        let resolved = document.resolve(action)?;
        build_request(tool, &resolved, params)
    }

    /// Runs the full pipeline: resolve the action, filter the schema, infer
    /// parameters and build the request.
    ///
    /// Actions that require a request body are rejected before the model is
    /// called.
    ///
    /// # Errors
    ///
    /// Any failure aborts the invocation; see [`EngineError`].
    pub async fn prepare(
        &self,
        ctx: &InvocationContext,
        tool: &Tool,
        history: &[ToolHistoryMessage],
        action: &str,
    ) -> EngineResult<BuiltRequest> {
        async {
            let (api, document) = load_schema(tool)?;
            let resolved = document.resolve(action)?;
            ensure_body_supported(&resolved)?;
            let params = self.infer_with(ctx, api, &document, history, action).await?;
            let request = build_request(tool, &resolved, &params)?;
            info!(
                method = %request.method(),
                url = %request.url(),
                parameters = params.len(),
                "prepared API request"
            );
            Ok::<_, EngineError>(request)
        }
        .instrument(invocation_span(ctx, tool, action))
        .await
    }

    async fn infer_with(
        &self,
        ctx: &InvocationContext,
        api: &ApiConfig,
        document: &SchemaDocument,
        history: &[ToolHistoryMessage],
        action: &str,
    ) -> EngineResult<ParameterSet> {
        let filtered = serde_json::to_string_pretty(&document.filter(action)?)
            .map_err(tool_schema::SchemaError::from)?;
        let messages = build_messages(api, &filtered, action, history)?;
        let request = ChatCompletionRequest::new(messages)?.with_model(self.config.model());

        let answer = self.complete(ctx, request).await?;
        let params = parse_parameters(&answer)?;
        debug!(parameters = ?params, "inferred request parameters");
        Ok(params)
    }

    async fn complete(
        &self,
        ctx: &InvocationContext,
        request: ChatCompletionRequest,
    ) -> EngineResult<String> {
        let call_context = ctx.call_context();
        let limit = self.config.inference_timeout();
        debug!(
            model = self.config.model(),
            owner_id = call_context.owner_id(),
            step = %call_context.step(),
            "calling model for parameter inference"
        );

        let call = timeout(
            limit,
            self.client.create_chat_completion(&call_context, request),
        );
        let outcome = match ctx.cancellation() {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(EngineError::Cancelled),
                outcome = call => outcome,
            },
            None => call.await,
        };

        let response = outcome.map_err(|_| EngineError::TimedOut { timeout: limit })??;
        response
            .first_content()
            .map(str::to_owned)
            .ok_or_else(|| EngineError::inference("model returned no choices"))
    }
}

fn load_schema(tool: &Tool) -> EngineResult<(&ApiConfig, SchemaDocument)> {
    let api = tool.api().ok_or(EngineError::MissingSchema)?;
    let schema = api.schema().ok_or(EngineError::MissingSchema)?;
    Ok((api, SchemaDocument::parse(schema)?))
}

fn invocation_span(ctx: &InvocationContext, tool: &Tool, action: &str) -> tracing::Span {
    info_span!(
        "prepare_api_request",
        tool_id = %tool.id(),
        action,
        owner_id = ctx.owner_id(),
        session_id = ctx.session_id(),
        interaction_id = ctx.interaction_id()
    )
}
