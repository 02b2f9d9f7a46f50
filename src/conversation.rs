use crate::emotion::analyze_emotional_state;
use crate::error::ChatError;
use crate::llm::{
    chat_with_custom_system, generate_proactive_question, ConversationTurn,
    TokenUsage,
};
use crate::news::NewsQuery;
use crate::openai::{ROLE_ASSISTANT, ROLE_USER};
use crate::profile::{
    extract_profile_from_conversation, get_or_create_profile, get_user_profile,
    update_emotional_state, update_user_profile, EXTRACTION_WINDOW,
};
use crate::sessions::{
    add_message, get_session_messages, session_owner, ChatSession,
};
use crate::system_prompt::generate_system_prompt;
use crate::AppState;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Turns required before an emotional check is attempted.
pub const MIN_EMOTIONAL_HISTORY: usize = 10;
/// Turns sent to the emotional analysis.
pub const EMOTIONAL_WINDOW: usize = 15;
/// Inactivity after which a returning user may get a news greeting.
pub const GREETING_IDLE_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurnOutcome {
    pub response: String,
    pub usage: TokenUsage,
    pub model: String,
    pub profile_updated: bool,
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Runs one user turn: stores the message, refreshes what is known about
/// the user, and answers with the adaptive system prompt.
#[instrument(skip(state, message), err)]
pub async fn handle_chat_turn(
    state: &AppState,
    session_id: i64,
    message: &str,
) -> Result<ChatTurnOutcome, ChatError> {
    let client = state
        .openai_client
        .as_deref()
        .ok_or(ChatError::LlmUnavailable)?;
    if message.trim().is_empty() {
        return Err(ChatError::InvalidInput(
            "Message must not be empty".to_string(),
        ));
    }
    let user_id = session_owner(state, session_id)
        .await?
        .ok_or(ChatError::SessionNotFound)?;

    add_message(state, session_id, ROLE_USER, message).await?;
    let count = state.bump_message_counter(session_id).await;

    let history: Vec<ConversationTurn> =
        get_session_messages(state, session_id, None)
            .await?
            .iter()
            .map(ConversationTurn::from)
            .collect();

    let stored = get_or_create_profile(state, user_id).await?;
    let mut profile = stored.profile;
    let mut emotional_state = stored.emotional_state;

    let mut profile_updated = false;
    if history.len() >= 2 && count % state.profile_update_frequency == 0 {
        info!("Updating profile for user {}", user_id);
        profile = extract_profile_from_conversation(
            client,
            &state.chat_model,
            tail(&history, EXTRACTION_WINDOW),
            Some(&profile),
        )
        .await;
        update_user_profile(state, user_id, &profile).await?;
        profile_updated = true;
    }

    if count % state.emotional_check_frequency == 0
        && history.len() >= MIN_EMOTIONAL_HISTORY
    {
        info!("Analyzing emotional state for user {}", user_id);
        let analysis = analyze_emotional_state(
            client,
            &state.chat_model,
            tail(&history, EMOTIONAL_WINDOW),
        )
        .await;
        if let Some(analysis) = analysis.filter(|a| !a.insufficient_data) {
            update_emotional_state(state, user_id, &analysis).await?;
            emotional_state = Some(analysis);
        }
    }

    let system_prompt = generate_system_prompt(&profile, emotional_state.as_ref());
    let reply =
        chat_with_custom_system(client, &state.chat_model, &history, &system_prompt)
            .await?;

    add_message(state, session_id, ROLE_ASSISTANT, &reply.content).await?;

    Ok(ChatTurnOutcome {
        response: reply.content,
        usage: reply.usage,
        model: reply.model,
        profile_updated,
    })
}

/// News based opener for a user coming back after a long pause.
///
/// `sessions` must be ordered most recent first, as `list_sessions` returns
/// them. Any failure just means no greeting.
#[instrument(skip(state, sessions))]
pub async fn proactive_greeting(
    state: &AppState,
    user_id: i64,
    sessions: &[ChatSession],
) -> Option<String> {
    let news_client = state.news_client.as_deref()?;
    let openai_client = state.openai_client.as_deref()?;
    let last_session = sessions.first()?;

    let idle = chrono::Utc::now().timestamp() - last_session.updated_at;
    if idle <= GREETING_IDLE_SECS {
        return None;
    }

    let profile = match get_user_profile(state, user_id).await {
        Ok(Some(stored)) => stored.profile,
        Ok(None) => return None,
        Err(e) => {
            warn!("Could not load profile for greeting: {}", e);
            return None;
        }
    };
    let interest = profile.interests.first()?;

    let query = NewsQuery::new(interest).days_back(3).max_results(3);
    let articles = match news_client.search_news(&query).await {
        Ok(articles) => articles,
        Err(e) => {
            warn!("News search failed: {}", e);
            return None;
        }
    };

    generate_proactive_question(
        openai_client,
        &state.chat_model,
        &profile.interests,
        &articles,
        &profile,
    )
    .await
}
