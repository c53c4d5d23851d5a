//! Language-model clients used to infer API request parameters.
//!
//! The engine only depends on the [`traits::ChatCompletionClient`] contract;
//! [`openai`] provides an implementation for any `OpenAI`-compatible
//! chat completions endpoint.

#![warn(missing_docs, clippy::pedantic)]

pub mod openai;
pub mod traits;

mod http_client;

pub use traits::{
    AdapterError, AdapterMetadata, AdapterResult, CallContext, ChatChoice, ChatCompletionClient,
    ChatCompletionRequest, ChatCompletionResponse, LlmCallStep, MessageRole, PromptMessage,
};
