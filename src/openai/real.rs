use crate::openai::{CompletionOptions, OpenAIClientTrait};
use anyhow::Result;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse,
};
use async_openai::Client;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

// A real implementation of the OpenAI client
pub struct RealOpenAIClient {
    client: Client<OpenAIConfig>,
}

impl RealOpenAIClient {
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

/// Builds a client when an API key is available.
///
/// The base URL is optional so OpenAI-compatible gateways can be used.
pub fn maybe_create_openai_client(
    api_key: Option<String>,
    api_base: Option<String>,
) -> Result<Arc<dyn OpenAIClientTrait>> {
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("OpenAI API key not configured"))?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(api_base) = api_base.filter(|b| !b.trim().is_empty()) {
        info!("Using OpenAI API base {}", api_base);
        config = config.with_api_base(api_base);
    }

    Ok(Arc::new(RealOpenAIClient::new(Client::with_config(config))))
}

#[async_trait]
impl OpenAIClientTrait for RealOpenAIClient {
    #[allow(deprecated)]
    async fn chat_completion(
        &self,
        model: String,
        messages: Vec<ChatCompletionRequestMessage>,
        options: CompletionOptions,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .max_tokens(options.max_tokens)
            .temperature(options.temperature)
            .build()?;

        let response = self.client.chat().create(request).await?;

        Ok(response)
    }
}
