use crate::llm::{complete_json, format_conversation, ConversationTurn};
use crate::openai::{CompletionOptions, OpenAIClientTrait};
use crate::prompts::EMOTIONAL_ANALYSIS_PROMPT;
use crate::profile::lenient_list;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

pub const ANALYSIS_OPTIONS: CompletionOptions = CompletionOptions::new(400, 0.3);
/// Turns needed before the model is asked at all.
pub const MIN_ANALYSIS_TURNS: usize = 3;

fn none_level() -> String {
    "none".to_string()
}

fn normal_mode() -> String {
    "normal".to_string()
}

// Model replies may carry null or mistyped fields; each falls back to the
// field's default instead of failing the whole analysis.
fn text_or(value: Option<Value>, fallback: fn() -> String) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => fallback(),
    }
}

fn lenient_level<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_or(Option::<Value>::deserialize(deserializer)?, none_level))
}

fn lenient_mode<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_or(Option::<Value>::deserialize(deserializer)?, normal_mode))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_or(Option::<Value>::deserialize(deserializer)?, String::new))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Emotional estimate of a user, as reported by the analysis model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub depression_probability: f64,
    #[serde(default = "none_level", deserialize_with = "lenient_level")]
    pub anxiety_level: String,
    #[serde(default = "none_level", deserialize_with = "lenient_level")]
    pub loneliness_level: String,
    #[serde(default = "none_level", deserialize_with = "lenient_level")]
    pub support_needed: String,
    #[serde(default = "normal_mode", deserialize_with = "lenient_mode")]
    pub recommended_mode: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub detected_concerns: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub positive_indicators: Vec<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub professional_help_suggested: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: String,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub insufficient_data: bool,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            depression_probability: 0.0,
            anxiety_level: none_level(),
            loneliness_level: none_level(),
            support_needed: none_level(),
            recommended_mode: normal_mode(),
            detected_concerns: Vec::new(),
            positive_indicators: Vec::new(),
            confidence: 0.0,
            professional_help_suggested: false,
            notes: String::new(),
            insufficient_data: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationMode {
    Normal,
    Friendly,
    Empathetic,
    Supportive,
    Crisis,
}

impl ConversationMode {
    /// Modes in which the assistant drops its peer persona.
    pub fn is_support(self) -> bool {
        matches!(
            self,
            ConversationMode::Empathetic
                | ConversationMode::Supportive
                | ConversationMode::Crisis
        )
    }
}

impl EmotionalState {
    pub fn insufficient() -> Self {
        Self {
            insufficient_data: true,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ConversationMode {
        match self.recommended_mode.trim().to_lowercase().as_str() {
            "friendly" => ConversationMode::Friendly,
            "empathetic" => ConversationMode::Empathetic,
            "supportive" => ConversationMode::Supportive,
            "crisis" => ConversationMode::Crisis,
            _ => ConversationMode::Normal,
        }
    }

    pub fn needs_high_support(&self) -> bool {
        matches!(
            self.support_needed.trim().to_lowercase().as_str(),
            "high" | "urgent"
        )
    }
}

/// Clinical style estimate of the user's emotional state.
///
/// Short conversations are answered with `insufficient_data` without a model
/// call; a failed call yields `None`.
#[instrument(skip_all, fields(turns = conversation.len()))]
pub async fn analyze_emotional_state(
    client: &dyn OpenAIClientTrait,
    model: &str,
    conversation: &[ConversationTurn],
) -> Option<EmotionalState> {
    if conversation.len() < MIN_ANALYSIS_TURNS {
        return Some(EmotionalState::insufficient());
    }

    let prompt = EMOTIONAL_ANALYSIS_PROMPT
        .replace("{conversation}", &format_conversation(conversation));

    match complete_json::<EmotionalState>(client, model, &prompt, ANALYSIS_OPTIONS)
        .await
    {
        Ok(state) => {
            info!(
                "Emotional analysis: mode={} support={}",
                state.recommended_mode, state.support_needed
            );
            Some(state)
        }
        Err(e) => {
            error!("Error in emotional analysis: {}", e);
            None
        }
    }
}
