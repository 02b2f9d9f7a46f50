use crate::accounts::user_exists;
use crate::emotion::EmotionalState;
use crate::error::ChatError;
use crate::llm::{complete_json, format_conversation, ConversationTurn};
use crate::openai::{CompletionOptions, OpenAIClientTrait};
use crate::prompts::PROFILE_EXTRACTION_PROMPT;
use crate::AppState;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, info, instrument};

pub const DEFAULT_TONE: &str = "amigable y natural";
pub const EXTRACTION_OPTIONS: CompletionOptions =
    CompletionOptions::new(600, 0.3);
/// Turns of recent conversation sent to the extractor.
pub const EXTRACTION_WINDOW: usize = 10;

const WORK_PHRASES: [&str; 6] = [
    "trabaja como",
    "trabaja de",
    "es un",
    "es una",
    "su trabajo",
    "su ocupación",
];
const BARE_WORK_FACTS: [&str; 3] =
    ["trabaja", "tiene trabajo", "trabaja como trabajador"];
const STUDY_PHRASES: [&str; 4] =
    ["estudió", "graduado en", "título en", "carrera de"];

fn clean_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => clean_text(&s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => clean_text(&s).into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(clean_text)
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => {
            serde_json::from_value(value).unwrap_or_default()
        }
        _ => T::default(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoliticalStance {
    #[serde(default, deserialize_with = "lenient_string")]
    pub spectrum: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub intensity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub approach: Option<String>,
}

impl PoliticalStance {
    pub fn is_known(&self) -> bool {
        self.spectrum.is_some()
            || self.intensity.is_some()
            || self.approach.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Religion {
    #[serde(default, deserialize_with = "lenient_string")]
    pub faith: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub intensity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub approach: Option<String>,
}

impl Religion {
    pub fn is_known(&self) -> bool {
        self.faith.is_some() || self.intensity.is_some() || self.approach.is_some()
    }
}

/// What the assistant knows about a user.
///
/// Decoding is lenient because the extractor is a language model: `"null"`
/// and blank strings become `None`, a bare string is accepted where a list is
/// expected, and missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age_range: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub profession: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub education: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub political_stance: PoliticalStance,
    #[serde(default, deserialize_with = "lenient_object")]
    pub religion: Religion,
    #[serde(default, deserialize_with = "lenient_list")]
    pub important_facts: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub sensitive_topics: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub personality_traits: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub needs: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tone_preference: Option<String>,
}

impl UserProfile {
    /// Profile of a user nothing is known about yet.
    pub fn empty() -> Self {
        Self {
            tone_preference: Some(DEFAULT_TONE.to_string()),
            ..Self::default()
        }
    }
}

/// A profile row: the profile plus the latest emotional estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredProfile {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub emotional_state: Option<EmotionalState>,
    pub last_updated: i64,
    pub last_emotional_check: Option<i64>,
}

fn union_into(target: &mut Vec<String>, items: &[String]) {
    let mut seen: HashSet<String> = target.iter().cloned().collect();
    for item in items {
        if seen.insert(item.clone()) {
            target.push(item.clone());
        }
    }
}

fn overwrite(target: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value {
        *target = Some(v.clone());
    }
}

fn restates_profession(fact: &str, profession: &str) -> bool {
    if profession.is_empty() {
        return false;
    }
    let phrased = WORK_PHRASES.iter().any(|p| fact.contains(p))
        && (fact.contains(profession) || fact.contains("trabajador"));
    phrased || BARE_WORK_FACTS.contains(&fact)
}

fn restates_interest(fact: &str, interests: &[String]) -> bool {
    interests
        .iter()
        .filter(|i| !i.is_empty())
        .any(|interest| fact.contains(interest.as_str()) || interest.contains(fact))
}

fn restates_education(fact: &str, education: &str) -> bool {
    !education.is_empty()
        && STUDY_PHRASES.iter().any(|p| fact.contains(p))
        && fact.contains(education)
}

fn is_near_duplicate(fact: &str, kept: &[String]) -> bool {
    let words: HashSet<String> =
        fact.to_lowercase().split_whitespace().map(String::from).collect();
    kept.iter().any(|other| {
        let other_words: HashSet<String> = other
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        let overlap = words.intersection(&other_words).count();
        overlap >= 2 && overlap as f64 >= words.len() as f64 * 0.5
    })
}

/// Drops facts that repeat the profession, an interest or the education,
/// then facts that mostly repeat an earlier one.
fn clean_facts(profile: &UserProfile) -> Vec<String> {
    let profession = profile
        .profession
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let education = profile
        .education
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let interests: Vec<String> =
        profile.interests.iter().map(|i| i.to_lowercase()).collect();

    let mut kept: Vec<String> = Vec::new();
    for fact in &profile.important_facts {
        let lower = fact.to_lowercase();
        if restates_profession(&lower, &profession)
            || restates_interest(&lower, &interests)
            || restates_education(&lower, &education)
        {
            debug!("Dropping redundant fact: {}", fact);
            continue;
        }
        if is_near_duplicate(fact, &kept) {
            debug!("Dropping near-duplicate fact: {}", fact);
            continue;
        }
        kept.push(fact.clone());
    }
    kept
}

/// Folds a freshly extracted profile into an existing one.
pub fn merge_profiles(existing: &UserProfile, new: &UserProfile) -> UserProfile {
    let mut merged = existing.clone();

    overwrite(&mut merged.name, &new.name);
    overwrite(&mut merged.age_range, &new.age_range);
    overwrite(&mut merged.gender, &new.gender);
    overwrite(&mut merged.profession, &new.profession);
    overwrite(&mut merged.education, &new.education);
    overwrite(&mut merged.tone_preference, &new.tone_preference);

    union_into(&mut merged.interests, &new.interests);
    union_into(&mut merged.important_facts, &new.important_facts);
    union_into(&mut merged.sensitive_topics, &new.sensitive_topics);
    union_into(&mut merged.personality_traits, &new.personality_traits);
    union_into(&mut merged.needs, &new.needs);

    merged.important_facts = clean_facts(&merged);

    if new.political_stance.is_known() {
        merged.political_stance = new.political_stance.clone();
    }
    if new.religion.is_known() {
        merged.religion = new.religion.clone();
    }

    merged
}

/// Asks the model for the user's profile from recent turns.
///
/// Never fails: on any problem the existing profile (or an empty one) is
/// returned unchanged.
#[instrument(skip_all, fields(turns = conversation.len()))]
pub async fn extract_profile_from_conversation(
    client: &dyn OpenAIClientTrait,
    model: &str,
    conversation: &[ConversationTurn],
    existing: Option<&UserProfile>,
) -> UserProfile {
    let fallback = || existing.cloned().unwrap_or_else(UserProfile::empty);
    if conversation.len() < 2 {
        return fallback();
    }

    let start = conversation.len().saturating_sub(EXTRACTION_WINDOW);
    let prompt = PROFILE_EXTRACTION_PROMPT
        .replace("{conversation}", &format_conversation(&conversation[start..]));

    match complete_json::<UserProfile>(client, model, &prompt, EXTRACTION_OPTIONS)
        .await
    {
        Ok(extracted) => match existing {
            Some(existing) if existing.age_range.is_some() => {
                merge_profiles(existing, &extracted)
            }
            _ => extracted,
        },
        Err(e) => {
            error!("Error extracting profile: {}", e);
            fallback()
        }
    }
}

fn decode_json<T: DeserializeOwned>(column: &str, text: &str) -> Result<T, ChatError> {
    serde_json::from_str(text)
        .map_err(|e| anyhow::anyhow!("Corrupt {} column: {}", column, e).into())
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, ChatError> {
    serde_json::to_string(value)
        .map_err(|e| anyhow::anyhow!("Failed to encode JSON: {}", e).into())
}

pub async fn get_user_profile(
    state: &AppState,
    user_id: i64,
) -> Result<Option<StoredProfile>, ChatError> {
    let conn = state.chat_db.get()?;
    let row = conn
        .query_row(
            "SELECT profile_json, emotional_state_json, last_updated, last_emotional_check
             FROM user_profiles WHERE user_id = ?",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((profile_json, emotional_json, last_updated, last_emotional_check)) =
        row
    else {
        return Ok(None);
    };

    let emotional_state = match emotional_json {
        Some(text) => Some(decode_json("emotional_state_json", &text)?),
        None => None,
    };
    Ok(Some(StoredProfile {
        profile: decode_json("profile_json", &profile_json)?,
        emotional_state,
        last_updated,
        last_emotional_check,
    }))
}

/// Returns false when the user already has a profile.
#[instrument(skip(state, profile), err)]
pub async fn create_user_profile(
    state: &AppState,
    user_id: i64,
    profile: &UserProfile,
) -> Result<bool, ChatError> {
    let conn = state.chat_db.get()?;
    insert_profile(&conn, user_id, profile)
}

/// Inserts a profile row unless one exists; usable inside a transaction.
pub(crate) fn insert_profile(
    conn: &Connection,
    user_id: i64,
    profile: &UserProfile,
) -> Result<bool, ChatError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO user_profiles (user_id, profile_json, last_updated)
         VALUES (?, ?, ?)",
        params![user_id, encode_json(profile)?, chrono::Utc::now().timestamp()],
    )?;
    Ok(inserted > 0)
}

#[instrument(skip(state, profile), err)]
pub async fn update_user_profile(
    state: &AppState,
    user_id: i64,
    profile: &UserProfile,
) -> Result<bool, ChatError> {
    let conn = state.chat_db.get()?;
    let updated = conn.execute(
        "UPDATE user_profiles SET profile_json = ?, last_updated = ? WHERE user_id = ?",
        params![encode_json(profile)?, chrono::Utc::now().timestamp(), user_id],
    )?;
    Ok(updated > 0)
}

#[instrument(skip(state, emotional_state), err)]
pub async fn update_emotional_state(
    state: &AppState,
    user_id: i64,
    emotional_state: &EmotionalState,
) -> Result<bool, ChatError> {
    let conn = state.chat_db.get()?;
    let updated = conn.execute(
        "UPDATE user_profiles
         SET emotional_state_json = ?, last_emotional_check = ?
         WHERE user_id = ?",
        params![
            encode_json(emotional_state)?,
            chrono::Utc::now().timestamp(),
            user_id
        ],
    )?;
    Ok(updated > 0)
}

/// Loads the user's profile, storing an empty one first if there is none.
pub async fn get_or_create_profile(
    state: &AppState,
    user_id: i64,
) -> Result<StoredProfile, ChatError> {
    if let Some(stored) = get_user_profile(state, user_id).await? {
        return Ok(stored);
    }
    if !user_exists(state, user_id).await? {
        return Err(ChatError::UserNotFound);
    }

    info!("Creating empty profile for user {}", user_id);
    create_user_profile(state, user_id, &UserProfile::empty()).await?;
    get_user_profile(state, user_id)
        .await?
        .ok_or(ChatError::UserNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::create_user;
    use crate::openai::fake::FakeOpenAIClient;
    use crate::openai::{ROLE_ASSISTANT, ROLE_USER};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { ROLE_USER } else { ROLE_ASSISTANT };
                ConversationTurn::new(role, &format!("turno {}", i))
            })
            .collect()
    }

    #[test]
    fn decodes_model_output_leniently() {
        let profile: UserProfile = serde_json::from_value(json!({
            "name": "null",
            "age_range": "~10 años (niño)",
            "gender": "  ",
            "interests": "Minecraft",
            "important_facts": ["Tiene un perro", 3, null, "null"],
            "political_stance": null,
            "religion": {"faith": "null", "intensity": "secular"}
        }))
        .unwrap();

        assert_eq!(profile.name, None);
        assert_eq!(profile.age_range.as_deref(), Some("~10 años (niño)"));
        assert_eq!(profile.gender, None);
        assert_eq!(profile.interests, strings(&["Minecraft"]));
        assert_eq!(profile.important_facts, strings(&["Tiene un perro"]));
        assert_eq!(profile.political_stance, PoliticalStance::default());
        assert_eq!(profile.religion.faith, None);
        assert_eq!(profile.religion.intensity.as_deref(), Some("secular"));
        assert!(profile.needs.is_empty());
        assert_eq!(profile.tone_preference, None);
    }

    #[test]
    fn empty_profile_has_default_tone() {
        let profile = UserProfile::empty();
        assert_eq!(profile.tone_preference.as_deref(), Some(DEFAULT_TONE));
        assert!(profile.interests.is_empty());
        assert!(!profile.political_stance.is_known());
    }

    #[test]
    fn merge_overwrites_scalars_and_unions_lists_in_order() {
        let existing = UserProfile {
            name: Some("Ana".to_string()),
            age_range: Some("~30 años".to_string()),
            interests: strings(&["Yoga", "Cine"]),
            ..UserProfile::empty()
        };
        let new = UserProfile {
            age_range: Some("~31 años".to_string()),
            interests: strings(&["Cine", "Viajes"]),
            needs: strings(&["Compañía"]),
            ..UserProfile::default()
        };

        let merged = merge_profiles(&existing, &new);
        assert_eq!(merged.name.as_deref(), Some("Ana"));
        assert_eq!(merged.age_range.as_deref(), Some("~31 años"));
        assert_eq!(merged.interests, strings(&["Yoga", "Cine", "Viajes"]));
        assert_eq!(merged.needs, strings(&["Compañía"]));
        assert_eq!(merged.tone_preference.as_deref(), Some(DEFAULT_TONE));
    }

    #[test]
    fn merge_drops_facts_repeating_other_fields() {
        let existing = UserProfile {
            profession: Some("Enfermera".to_string()),
            education: Some("Enfermería".to_string()),
            interests: strings(&["cocina"]),
            ..UserProfile::empty()
        };
        let new = UserProfile {
            important_facts: strings(&[
                "Trabaja como enfermera en un hospital",
                "Trabaja",
                "Le encanta la cocina italiana",
                "Estudió enfermería en Sevilla",
                "Tiene dos hijos",
                "Vive en Madrid",
            ]),
            ..UserProfile::default()
        };

        let merged = merge_profiles(&existing, &new);
        assert_eq!(
            merged.important_facts,
            strings(&["Tiene dos hijos", "Vive en Madrid"])
        );
    }

    #[test]
    fn merge_drops_near_duplicate_facts() {
        let existing = UserProfile {
            important_facts: strings(&["Tiene un perro llamado Max"]),
            ..UserProfile::empty()
        };
        let new = UserProfile {
            important_facts: strings(&[
                "Tiene un perro",
                "Vive en un pueblo",
            ]),
            ..UserProfile::default()
        };

        let merged = merge_profiles(&existing, &new);
        assert_eq!(
            merged.important_facts,
            strings(&["Tiene un perro llamado Max", "Vive en un pueblo"])
        );
    }

    #[test]
    fn merge_keeps_beliefs_unless_new_ones_are_known() {
        let existing = UserProfile {
            religion: Religion {
                faith: Some("catolico".to_string()),
                intensity: None,
                approach: Some("respectful".to_string()),
            },
            ..UserProfile::empty()
        };

        let merged = merge_profiles(&existing, &UserProfile::default());
        assert_eq!(merged.religion.faith.as_deref(), Some("catolico"));

        let new = UserProfile {
            political_stance: PoliticalStance {
                spectrum: Some("centro".to_string()),
                ..PoliticalStance::default()
            },
            ..UserProfile::default()
        };
        let merged = merge_profiles(&existing, &new);
        assert_eq!(merged.political_stance.spectrum.as_deref(), Some("centro"));
    }

    #[tokio::test]
    async fn extraction_needs_two_turns() {
        let client = FakeOpenAIClient::new();
        let profile =
            extract_profile_from_conversation(&client, "gpt-4", &turns(1), None)
                .await;
        assert_eq!(profile, UserProfile::empty());
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn extraction_replaces_profile_without_age() {
        let client = FakeOpenAIClient::new().with_response(
            "```json\n{\"name\": \"Leo\", \"age_range\": \"~12 años\", \"interests\": [\"Fortnite\"]}\n```",
        );
        let existing = UserProfile {
            interests: strings(&["Ajedrez"]),
            ..UserProfile::empty()
        };

        let profile = extract_profile_from_conversation(
            &client,
            "gpt-4",
            &turns(14),
            Some(&existing),
        )
        .await;
        assert_eq!(profile.name.as_deref(), Some("Leo"));
        assert_eq!(profile.interests, strings(&["Fortnite"]));

        let request = client.last_request().unwrap();
        assert_eq!(request.options, EXTRACTION_OPTIONS);
        let prompt = request.content_for_role(ROLE_USER).unwrap();
        assert!(prompt.contains("Usuario: turno 4"));
        assert!(!prompt.contains("turno 3\n"));
        assert!(prompt.contains("Asistente: turno 13"));
    }

    #[tokio::test]
    async fn extraction_merges_when_age_is_known() {
        let client = FakeOpenAIClient::new()
            .with_response(r#"{"interests": ["Fortnite"], "name": null}"#);
        let existing = UserProfile {
            name: Some("Leo".to_string()),
            age_range: Some("~12 años".to_string()),
            interests: strings(&["Ajedrez"]),
            ..UserProfile::empty()
        };

        let profile = extract_profile_from_conversation(
            &client,
            "gpt-4",
            &turns(2),
            Some(&existing),
        )
        .await;
        assert_eq!(profile.name.as_deref(), Some("Leo"));
        assert_eq!(profile.interests, strings(&["Ajedrez", "Fortnite"]));
    }

    #[tokio::test]
    async fn extraction_failure_keeps_existing_profile() {
        let client = FakeOpenAIClient::new().with_response("no es json");
        let existing = UserProfile {
            name: Some("Eva".to_string()),
            ..UserProfile::empty()
        };

        let profile = extract_profile_from_conversation(
            &client,
            "gpt-4",
            &turns(4),
            Some(&existing),
        )
        .await;
        assert_eq!(profile, existing);

        let client = FakeOpenAIClient::new().with_error("timeout");
        let profile =
            extract_profile_from_conversation(&client, "gpt-4", &turns(4), None)
                .await;
        assert_eq!(profile, UserProfile::empty());
    }

    #[tokio::test]
    async fn profile_storage_round_trip() {
        let state = AppState::new_for_testing();
        let user = create_user(&state, "lucia", "pw").await.unwrap();

        let stored = get_user_profile(&state, user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.profile, UserProfile::empty());
        assert!(!create_user_profile(&state, user.user_id, &UserProfile::empty())
            .await
            .unwrap());
        assert!(!update_user_profile(&state, 999, &UserProfile::empty())
            .await
            .unwrap());

        let updated = UserProfile {
            name: Some("Lucía".to_string()),
            ..UserProfile::empty()
        };
        assert!(update_user_profile(&state, user.user_id, &updated)
            .await
            .unwrap());

        let emotional = EmotionalState {
            support_needed: "high".to_string(),
            ..EmotionalState::default()
        };
        assert!(update_emotional_state(&state, user.user_id, &emotional)
            .await
            .unwrap());

        let stored = get_user_profile(&state, user.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.profile, updated);
        assert_eq!(stored.emotional_state, Some(emotional));
        assert!(stored.last_emotional_check.is_some());
    }

    #[tokio::test]
    async fn get_or_create_profile_restores_missing_row() {
        let state = AppState::new_for_testing();
        let user = create_user(&state, "mario", "pw").await.unwrap();
        state
            .chat_db
            .get()
            .unwrap()
            .execute(
                "DELETE FROM user_profiles WHERE user_id = ?",
                [user.user_id],
            )
            .unwrap();
        assert!(get_user_profile(&state, user.user_id).await.unwrap().is_none());

        let stored = get_or_create_profile(&state, user.user_id).await.unwrap();
        assert_eq!(stored.profile, UserProfile::empty());
        assert_eq!(stored.emotional_state, None);
        assert!(get_user_profile(&state, user.user_id).await.unwrap().is_some());

        assert!(matches!(
            get_or_create_profile(&state, 999).await,
            Err(ChatError::UserNotFound)
        ));
    }

    #[test]
    fn stored_profile_serializes_flat() {
        let stored = StoredProfile {
            profile: UserProfile::empty(),
            emotional_state: None,
            last_updated: 1_700_000_000,
            last_emotional_check: None,
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["tone_preference"], DEFAULT_TONE);
        assert_eq!(value["last_updated"], 1_700_000_000);
        assert!(value["emotional_state"].is_null());
    }
}
