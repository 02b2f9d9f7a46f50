pub mod fake;
pub mod real;

use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestMessage, CreateChatCompletionResponse,
};
use async_trait::async_trait;

/// Constants for message roles
pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// Sampling parameters for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionOptions {
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

/// What was asked of the model, kept by the fake client for assertions.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model_name: String,
    pub options: CompletionOptions,
    /// Messages as they would be serialized on the wire.
    pub messages: Vec<serde_json::Value>,
}

impl ModelRequest {
    /// Content of the first message with the given role.
    pub fn content_for_role(&self, role: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.get("role").and_then(|r| r.as_str()) == Some(role))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
    }
}

/// A trait that abstracts OpenAI client functionality for testing
///
/// Both the real client and [`fake::FakeOpenAIClient`] implement it, so the
/// conversation pipeline can run against either.
#[async_trait]
pub trait OpenAIClientTrait: Send + Sync {
    /// Creates a chat completion by sending messages to the language model
    ///
    /// # Arguments
    /// * `model` - The model identifier (e.g., "gpt-4", "gpt-3.5-turbo")
    /// * `messages` - A sequence of messages using OpenAI types
    /// * `options` - Token limit and temperature for this call
    async fn chat_completion(
        &self,
        model: String,
        messages: Vec<ChatCompletionRequestMessage>,
        options: CompletionOptions,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error>;
}
