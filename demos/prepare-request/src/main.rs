//! Prepares an HTTP request for an API tool action from a single message.
//!
//! ```text
//! prepare-request <schema-file> <base-url> --list
//! prepare-request <schema-file> <base-url> <action> <message...>
//! ```
//!
//! Model settings come from `API_TOOLS_MODEL`, `API_TOOLS_PROVIDER_BASE_URL`,
//! `API_TOOLS_INFERENCE_TIMEOUT_SECS` and `OPENAI_API_KEY`.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tool_adapters::openai::{OpenAiAdapter, OpenAiConfig};
use tool_config::EngineConfig;
use tool_engine::{ApiRequestPreparer, InvocationContext};
use tool_primitives::{ApiConfig, Tool, ToolHistoryMessage, ToolId};
use tool_schema::list_actions;
use tool_telemetry::{TelemetryConfig, init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(&TelemetryConfig::default())?;

    let args: Vec<String> = env::args().skip(1).collect();
    let [schema_path, base_url, rest @ ..] = args.as_slice() else {
        bail!("usage: prepare-request <schema-file> <base-url> (--list | <action> <message...>)");
    };

    let schema = tokio::fs::read_to_string(schema_path)
        .await
        .with_context(|| format!("failed to read schema {schema_path}"))?;
    let tool = Tool::with_api(ToolId::new("demo")?, ApiConfig::new(base_url, &schema)?)
        .with_name("Demo API");

    match rest {
        [flag] if flag == "--list" => {
            for action in list_actions(&schema)? {
                println!(
                    "{:<7} {:<30} {}  {}",
                    action.method, action.path, action.name, action.description
                );
            }
        }
        [action, message @ ..] if !message.is_empty() => {
            let config = EngineConfig::from_env()?;
            let preparer = ApiRequestPreparer::new(Arc::new(openai_adapter(&config)?), config);
            let history = vec![ToolHistoryMessage::user(message.join(" "))];
            let ctx = InvocationContext::new("demo-session", "demo-interaction");

            let request = preparer.prepare(&ctx, &tool, &history, action).await?;
            info!(action = %action, "request prepared");

            println!("{} {}", request.method(), request.url());
            for (name, value) in request.headers() {
                println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
            }
        }
        _ => bail!("expected --list or an action followed by a message"),
    }

    Ok(())
}

fn openai_adapter(config: &EngineConfig) -> Result<OpenAiAdapter> {
    let mut openai =
        OpenAiConfig::from_env(config.model()).with_timeout(config.inference_timeout());
    if let Some(base_url) = config.provider_base_url() {
        openai = openai.with_base_url(base_url)?;
    }
    if let Some(key) = config.api_key() {
        openai = openai.with_api_key(key);
    }
    Ok(OpenAiAdapter::new(openai)?)
}
