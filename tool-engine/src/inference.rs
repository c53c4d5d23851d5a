//! Prompt assembly for parameter inference and parsing of the model answer.

use std::fmt;

use serde_json::{Number, Value};
use tool_adapters::PromptMessage;
use tool_primitives::{ApiConfig, ParameterSet, ToolHistoryMessage};
use tool_prompts::{ApiPromptInputs, api_system_instruction, render_api_user_prompt};

use crate::error::{EngineError, EngineResult};

const FENCE: &str = "```";

/// A single value from the model answer, before flattening to text.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    /// JSON `null`; flattens to the empty string.
    Null,
    /// A JSON string, used verbatim.
    String(String),
    /// A JSON number, written as its literal text.
    Number(Number),
    /// A JSON boolean.
    Bool(bool),
    /// An array or object, written as compact JSON.
    Json(Value),
}

impl From<Value> for ParameterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(text) => Self::String(text),
            Value::Number(number) => Self::Number(number),
            Value::Bool(flag) => Self::Bool(flag),
            other @ (Value::Array(_) | Value::Object(_)) => Self::Json(other),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::String(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

impl ParameterValue {
    /// Flattens the value into the string used for substitution.
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::String(text) => text,
            other => other.to_string(),
        }
    }
}

/// Parses a model answer into a flat parameter set.
///
/// The answer may be bare JSON or contain a fenced code block (with or
/// without a language tag); the first fenced block wins. The JSON must be an
/// object. Keys the model left out stay absent; explicit `null`s become empty
/// strings.
///
/// # Errors
///
/// Returns [`EngineError::ResponseParse`] carrying the raw answer when no JSON
/// object can be read.
pub fn parse_parameters(answer: &str) -> EngineResult<ParameterSet> {
    let payload = extract_json(answer);
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| EngineError::response_parse(err.to_string(), answer))?;

    let Value::Object(fields) = value else {
        return Err(EngineError::response_parse(
            "expected a JSON object",
            answer,
        ));
    };

    Ok(fields
        .into_iter()
        .map(|(name, value)| (name, ParameterValue::from(value).into_string()))
        .collect())
}

fn extract_json(answer: &str) -> &str {
    let Some(start) = answer.find(FENCE) else {
        return answer.trim();
    };

    let after_fence = &answer[start + FENCE.len()..];
    let block = after_fence
        .find(FENCE)
        .map_or(after_fence, |end| &after_fence[..end]);

    // Drop the language tag, whether or not a newline follows it.
    block
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
}

/// Builds the system and user messages for one inference call.
pub(crate) fn build_messages(
    api: &ApiConfig,
    schema: &str,
    action: &str,
    history: &[ToolHistoryMessage],
) -> EngineResult<Vec<PromptMessage>> {
    if history.is_empty() {
        return Err(EngineError::EmptyHistory);
    }

    let inputs = ApiPromptInputs {
        schema,
        action,
        interactions: history,
    };
    let user = render_api_user_prompt(api.request_prep_template(), &inputs)?;

    Ok(vec![
        PromptMessage::system(api_system_instruction().content()),
        PromptMessage::user(user),
    ])
}
