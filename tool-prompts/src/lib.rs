//! Prompt construction for API parameter inference.
//!
//! [`template`] implements the small template language used for both the
//! built-in prompt and tool-specific overrides; [`api`] holds the fixed system
//! instruction and default user prompt for extracting request parameters.

#![warn(missing_docs, clippy::pedantic)]

pub mod api;
pub mod system;
pub mod template;

pub use api::{
    API_SYSTEM_PROMPT, ApiPromptInputs, DEFAULT_API_USER_TEMPLATE, api_system_instruction,
    render_api_user_prompt,
};
pub use system::{SystemInstruction, SystemInstructionBuilder};
pub use template::{
    PromptTemplate, TemplateBuilder, TemplateContext, TemplateError, TemplateItem, TemplateResult,
};
