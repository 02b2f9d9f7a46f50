use crate::error::ChatError;
use crate::news::{format_news_brief, Article};
use crate::openai::{
    CompletionOptions, OpenAIClientTrait, ROLE_ASSISTANT, ROLE_SYSTEM,
};
use crate::profile::UserProfile;
use crate::prompts::{DEFAULT_ASSISTANT_PROMPT, PROACTIVE_QUESTION_PROMPT};
use crate::sessions::StoredMessage;
use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

pub const CHAT_OPTIONS: CompletionOptions = CompletionOptions::new(500, 0.7);
pub const PROACTIVE_OPTIONS: CompletionOptions =
    CompletionOptions::new(100, 0.8);
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// One message of a conversation as sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

impl From<&StoredMessage> for ConversationTurn {
    fn from(message: &StoredMessage) -> Self {
        Self::new(&message.role, &message.content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// Renders turns as the `Usuario:` / `Asistente:` transcript used in
/// analysis prompts.
pub fn format_conversation(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = if turn.role == ROLE_ASSISTANT {
                "Asistente"
            } else {
                "Usuario"
            };
            format!("{}: {}", speaker, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn system_message(content: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestMessage::System(
        ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?,
    ))
}

fn user_message(content: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestMessage::User(
        ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?,
    ))
}

/// Converts a system prompt and history into request messages.
pub fn build_messages(
    system_prompt: Option<&str>,
    history: &[ConversationTurn],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(system_prompt) = system_prompt {
        messages.push(system_message(system_prompt)?);
    }

    for turn in history {
        let message = match turn.role.as_str() {
            ROLE_ASSISTANT => ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.as_str())
                    .build()?,
            ),
            ROLE_SYSTEM => system_message(&turn.content)?,
            _ => user_message(&turn.content)?,
        };
        messages.push(message);
    }

    Ok(messages)
}

fn first_content(response: &CreateChatCompletionResponse) -> Option<String> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_ref())
        .map(String::from)
}

fn to_reply(response: CreateChatCompletionResponse) -> ChatReply {
    let usage = response
        .usage
        .as_ref()
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    ChatReply {
        content: first_content(&response).unwrap_or_default(),
        usage,
        model: response.model,
    }
}

/// Chat completion with a caller supplied system prompt.
#[instrument(skip(client, history, system_prompt), err)]
pub async fn chat_with_custom_system(
    client: &dyn OpenAIClientTrait,
    model: &str,
    history: &[ConversationTurn],
    system_prompt: &str,
) -> Result<ChatReply, ChatError> {
    let messages = build_messages(Some(system_prompt), history)
        .map_err(|e| ChatError::Llm(e.to_string()))?;

    info!("Requesting chat completion with {} messages", messages.len());
    let response = client
        .chat_completion(model.to_string(), messages, CHAT_OPTIONS)
        .await
        .map_err(|e| ChatError::Llm(e.to_string()))?;

    Ok(to_reply(response))
}

/// Chat completion with the default persona and the last `max_history`
/// messages of history.
pub async fn chat_with_memory(
    client: &dyn OpenAIClientTrait,
    model: &str,
    current_message: &str,
    history: &[ConversationTurn],
    max_history: usize,
) -> Result<ChatReply, ChatError> {
    let start = history.len().saturating_sub(max_history);
    let mut messages = history[start..].to_vec();
    messages.push(ConversationTurn::new(
        crate::openai::ROLE_USER,
        current_message,
    ));

    chat_with_custom_system(client, model, &messages, DEFAULT_ASSISTANT_PROMPT)
        .await
}

/// Decodes a JSON reply, tolerating a surrounding markdown code fence.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("Model reply is not valid JSON: {}", e))
}

/// Sends a single user prompt and decodes the JSON answer.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn OpenAIClientTrait,
    model: &str,
    prompt: &str,
    options: CompletionOptions,
) -> Result<T> {
    let messages = vec![user_message(prompt)?];
    let response = client
        .chat_completion(model.to_string(), messages, options)
        .await?;
    let content = first_content(&response)
        .ok_or_else(|| anyhow::anyhow!("Model returned no content"))?;
    parse_json_reply(&content)
}

/// Builds a short conversation opener from recent news on the user's main
/// interest.
#[instrument(skip_all)]
pub async fn generate_proactive_question(
    client: &dyn OpenAIClientTrait,
    model: &str,
    interests: &[String],
    articles: &[Article],
    profile: &UserProfile,
) -> Option<String> {
    let interest = interests.first()?;
    if articles.is_empty() {
        return None;
    }

    let top_articles = &articles[..articles.len().min(2)];
    let prompt = PROACTIVE_QUESTION_PROMPT
        .replace("{interest}", interest)
        .replace("{news}", &format_news_brief(top_articles))
        .replace("{age}", profile.age_range.as_deref().unwrap_or("adulto"))
        .replace(
            "{tone}",
            profile.tone_preference.as_deref().unwrap_or("amigable"),
        );

    let messages = match user_message(&prompt) {
        Ok(message) => vec![message],
        Err(e) => {
            error!("Failed to build proactive prompt: {}", e);
            return None;
        }
    };

    match client
        .chat_completion(model.to_string(), messages, PROACTIVE_OPTIONS)
        .await
    {
        Ok(response) => first_content(&response)
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        Err(e) => {
            error!("Error generating proactive question: {}", e);
            None
        }
    }
}
