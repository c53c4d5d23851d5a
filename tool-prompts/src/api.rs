//! Built-in prompts for extracting API request parameters from a conversation.

use tool_primitives::ToolHistoryMessage;

use crate::system::SystemInstruction;
use crate::template::{PromptTemplate, TemplateContext, TemplateItem, TemplateResult};

/// Fixed system instruction for parameter extraction. Not user-configurable.
pub const API_SYSTEM_PROMPT: &str = "You are an intelligent machine learning model that can \
produce REST API's params / query params in json format, given the json schema, user input, \
data from previous api calls, and current application state.";

/// Default user prompt.
///
/// Variables: `schema` (filtered API description), `message` (most recent
/// conversation message), `action` (operation identifier) and the list
/// `interactions`, whose items expose `role` and `content`.
pub const DEFAULT_API_USER_TEMPLATE: &str = r#"
Your output must be a valid json, without any commentary or additional formatting.

Examples:

**User Input:** Get project prj_1234 details
**OpenAPI schema path:** /projects/{projectId}
**Verdict:** response should be {"projectId": "prj_1234"}

**User Input:** List all users with status "active"
**OpenAPI schema path:** /users/findByStatus
**OpenAPI schema parameters:** [
	{
		"name": "status",
		"in": "query",
		"description": "Status values that need to be considered for filter",
		"required": true,
		"type": "array",
		"items": {
			"type": "string",
			"enum": ["active", "pending", "sold"],
			"default": "available"
		}
	}
]
**Verdict:** response should be:

```json
{
  "status": "active"
}
```

**Response Format:** Always respond with JSON without any commentary, wrapped in markdown json tags, for example:
```json
{
  "parameterName": "parameterValue",
  "parameterName2": "parameterValue2"
}
```

===END EXAMPLES===
OpenAPI schema: {{schema}}

Conversation so far:
{{#each interactions}}
<{{role}}_message>{{content}}</{{role}}_message>
{{/each}}

Based on the information provided, construct a valid JSON object. In cases where user input does not contain information for a query, DO NOT add that specific query parameter to the output. If a user doesn't provide a required parameter, use sensible defaults for required params, and leave optional params.
"#;

/// Returns the fixed system instruction.
#[must_use]
pub fn api_system_instruction() -> SystemInstruction {
    SystemInstruction::builder().content(API_SYSTEM_PROMPT).build()
}

/// Values available to the user prompt template.
#[derive(Clone, Copy, Debug)]
pub struct ApiPromptInputs<'a> {
    /// Filtered schema document text.
    pub schema: &'a str,
    /// Action identifier the parameters are for.
    pub action: &'a str,
    /// Full conversation, oldest first.
    pub interactions: &'a [ToolHistoryMessage],
}

impl ApiPromptInputs<'_> {
    /// Content of the most recent message, empty when there is none.
    #[must_use]
    pub fn message(&self) -> &str {
        self.interactions
            .last()
            .map(ToolHistoryMessage::content)
            .unwrap_or_default()
    }

    fn context(&self) -> TemplateContext {
        let interactions = self
            .interactions
            .iter()
            .map(|message| {
                TemplateItem::new()
                    .with_field("role", message.role())
                    .with_field("content", message.content())
            })
            .collect();

        TemplateContext::new()
            .with_value("schema", self.schema)
            .with_value("message", self.message())
            .with_value("action", self.action)
            .with_list("interactions", interactions)
    }
}

/// Renders the user prompt from `custom` when given, else from
/// [`DEFAULT_API_USER_TEMPLATE`].
///
/// # Errors
///
/// Returns a [`crate::TemplateError`] when the custom template is malformed
/// or references values that do not exist.
pub fn render_api_user_prompt(
    custom: Option<&str>,
    inputs: &ApiPromptInputs<'_>,
) -> TemplateResult<String> {
    let template = PromptTemplate::parse(custom.unwrap_or(DEFAULT_API_USER_TEMPLATE))?;
    template.render_with(&inputs.context())
}
