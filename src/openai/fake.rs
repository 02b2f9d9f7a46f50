use anyhow::Result;
use async_openai::types::{
    ChatChoice, ChatCompletionRequestMessage, ChatCompletionResponseMessage,
    CompletionUsage, CreateChatCompletionResponse, FinishReason, Role,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::openai::{CompletionOptions, ModelRequest, OpenAIClientTrait};

enum FakeReply {
    Content(Option<String>),
    Failure(String),
}

/// A fake implementation of the OpenAI client for testing
///
/// Replies are queued with the builder methods and handed out in order; once
/// the queue is empty every call gets `"Fake default response"`. Each call is
/// recorded in `requests` so tests can inspect the prompts that were sent.
///
/// # Example
///
/// ```
/// use adaptive_chat::openai::{CompletionOptions, OpenAIClientTrait};
/// use adaptive_chat::openai::fake::FakeOpenAIClient;
/// use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = FakeOpenAIClient::new()
///         .with_response("First response");
///
///     let user_msg = ChatCompletionRequestUserMessageArgs::default()
///         .content("Hola")
///         .build()?;
///     let messages = vec![ChatCompletionRequestMessage::User(user_msg)];
///
///     let response = client
///         .chat_completion(
///             "gpt-4".to_string(),
///             messages,
///             CompletionOptions::new(100, 0.7),
///         )
///         .await?;
///
///     let content = response.choices.first()
///         .and_then(|choice| choice.message.content.as_ref())
///         .map(String::from)
///         .unwrap_or_default();
///
///     assert_eq!(content, "First response");
///     Ok(())
/// }
/// ```
pub struct FakeOpenAIClient {
    responses: Mutex<Vec<FakeReply>>,
    usage: (u32, u32),
    // Track requests for verification in tests
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl Default for FakeOpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeOpenAIClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(vec![]),
            usage: (0, 0),
            requests: Mutex::new(vec![]),
        }
    }

    /// Add a response to be returned by the fake client
    pub fn with_response(self, response: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(FakeReply::Content(Some(response.to_string())));
        self
    }

    /// Configure the client to return a response with None content
    pub fn with_none_content_response(self) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(FakeReply::Content(None));
        self
    }

    /// Add multiple responses to be returned by the fake client in sequence
    pub fn with_responses(self, responses: Vec<&str>) -> Self {
        {
            let mut queue = self.responses.lock().unwrap();
            for response in responses {
                queue.push(FakeReply::Content(Some(response.to_string())));
            }
        }
        self
    }

    /// Queue an API failure, as if the provider returned an error.
    pub fn with_error(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(FakeReply::Failure(message.to_string()));
        self
    }

    /// Token counts reported in every response.
    pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
        self.usage = (prompt_tokens, completion_tokens);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl OpenAIClientTrait for FakeOpenAIClient {
    #[allow(deprecated)]
    async fn chat_completion(
        &self,
        model: String,
        messages: Vec<ChatCompletionRequestMessage>,
        options: CompletionOptions,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error> {
        let recorded = messages
            .iter()
            .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
            .collect();
        self.requests.lock().unwrap().push(ModelRequest {
            model_name: model.clone(),
            options,
            messages: recorded,
        });

        let reply = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                FakeReply::Content(Some("Fake default response".to_string()))
            } else {
                responses.remove(0)
            }
        };

        let content_option = match reply {
            FakeReply::Content(content) => content,
            FakeReply::Failure(message) => {
                return Err(anyhow::anyhow!(message));
            }
        };

        let message = ChatCompletionResponseMessage {
            role: Role::Assistant,
            content: content_option,
            #[allow(deprecated)]
            function_call: None,
            tool_calls: None,
            #[allow(deprecated)]
            refusal: None,
            audio: None,
        };

        let chat_choice = ChatChoice {
            index: 0,
            message,
            finish_reason: Some(FinishReason::Stop),
            logprobs: None,
        };

        let (prompt_tokens, completion_tokens) = self.usage;
        let usage = CompletionUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            prompt_tokens_details: None,
            completion_tokens_details: None,
        };

        Ok(CreateChatCompletionResponse {
            id: "fake_id".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: model.clone(),
            system_fingerprint: Some("fake-fingerprint".to_string()),
            service_tier: None,
            choices: vec![chat_choice],
            usage: Some(usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::ROLE_SYSTEM;
    use async_openai::types::ChatCompletionRequestSystemMessageArgs;

    fn options() -> CompletionOptions {
        CompletionOptions::new(500, 0.7)
    }

    #[tokio::test]
    async fn test_fake_openai_client_responses() -> Result<(), anyhow::Error> {
        let client = FakeOpenAIClient::new()
            .with_response("First response")
            .with_response("Second response");

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content("You are helpful")
            .build()?;

        let response1 = client
            .chat_completion(
                "gpt-4".to_string(),
                vec![ChatCompletionRequestMessage::System(system_msg)],
                options(),
            )
            .await
            .unwrap();
        assert_eq!(
            response1.choices[0].message.content,
            Some("First response".to_string())
        );

        let response2 = client
            .chat_completion("gpt-4".to_string(), vec![], options())
            .await
            .unwrap();
        assert_eq!(
            response2.choices[0].message.content,
            Some("Second response".to_string())
        );

        // Queue exhausted, default reply
        let response3 = client
            .chat_completion("gpt-4".to_string(), vec![], options())
            .await
            .unwrap();
        assert_eq!(
            response3.choices[0].message.content,
            Some("Fake default response".to_string())
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_request_tracking() -> Result<(), anyhow::Error> {
        let client = FakeOpenAIClient::new().with_response("Test response");

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content("Eres un amigo")
            .build()?;
        client
            .chat_completion(
                "gpt-4".to_string(),
                vec![ChatCompletionRequestMessage::System(system_msg)],
                CompletionOptions::new(42, 0.3),
            )
            .await?;

        let request = client.last_request().unwrap();
        assert_eq!(client.request_count(), 1);
        assert_eq!(request.model_name, "gpt-4");
        assert_eq!(request.options.max_tokens, 42);
        assert_eq!(request.content_for_role(ROLE_SYSTEM), Some("Eres un amigo"));
        Ok(())
    }

    #[tokio::test]
    async fn test_error_and_usage() {
        let client = FakeOpenAIClient::new()
            .with_error("quota exceeded")
            .with_usage(12, 30);

        let err = client
            .chat_completion("gpt-4".to_string(), vec![], options())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        let response = client
            .chat_completion("gpt-4".to_string(), vec![], options())
            .await
            .unwrap();
        assert_eq!(response.usage.unwrap().total_tokens, 42);
    }

    #[tokio::test]
    async fn test_none_content_response() {
        let client = FakeOpenAIClient::new().with_none_content_response();

        let response = client
            .chat_completion("gpt-4".to_string(), vec![], options())
            .await
            .unwrap();

        assert_eq!(response.choices[0].message.content, None);
    }
}
