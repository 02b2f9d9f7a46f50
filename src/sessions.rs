use crate::accounts::user_exists;
use crate::error::ChatError;
use crate::AppState;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: i64,
    pub session_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

#[instrument(skip(state), err)]
pub async fn create_session(
    state: &AppState,
    user_id: i64,
    session_name: &str,
) -> Result<i64, ChatError> {
    let session_name = session_name.trim();
    if session_name.is_empty() {
        return Err(ChatError::InvalidInput(
            "Session name must not be empty".to_string(),
        ));
    }
    if !user_exists(state, user_id).await? {
        return Err(ChatError::UserNotFound);
    }

    let conn = state.chat_db.get()?;
    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "INSERT INTO sessions (user_id, session_name, created_at, updated_at)
         VALUES (?, ?, ?, ?)",
        params![user_id, session_name, now, now],
    )?;
    let session_id = conn.last_insert_rowid();
    info!("Created session {} for user {}", session_id, user_id);
    Ok(session_id)
}

/// Sessions of a user, most recently active first.
pub async fn list_sessions(
    state: &AppState,
    user_id: i64,
) -> Result<Vec<ChatSession>, ChatError> {
    let conn = state.chat_db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, session_name, created_at, updated_at
         FROM sessions
         WHERE user_id = ?
         ORDER BY updated_at DESC, id DESC",
    )?;

    let sessions = stmt
        .query_map(params![user_id], |row| {
            Ok(ChatSession {
                id: row.get(0)?,
                session_name: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sessions)
}

/// The user a session belongs to, if the session exists.
pub async fn session_owner(
    state: &AppState,
    session_id: i64,
) -> Result<Option<i64>, ChatError> {
    let conn = state.chat_db.get()?;
    let owner = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE id = ?",
            params![session_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(owner)
}

#[instrument(skip(state, content), err)]
pub async fn add_message(
    state: &AppState,
    session_id: i64,
    role: &str,
    content: &str,
) -> Result<i64, ChatError> {
    let mut conn = state.chat_db.get()?;
    let now = chrono::Utc::now().timestamp();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO messages (session_id, role, content, created_at)
         VALUES (?, ?, ?, ?)",
        params![session_id, role, content, now],
    )?;
    let message_id = tx.last_insert_rowid();
    tx.execute(
        "UPDATE sessions SET updated_at = ? WHERE id = ?",
        params![now, session_id],
    )?;
    tx.commit()?;

    debug!("Stored {} message {} in session {}", role, message_id, session_id);
    Ok(message_id)
}

/// Messages of a session in the order they were written.
///
/// With a limit only the first `limit` messages are returned.
pub async fn get_session_messages(
    state: &AppState,
    session_id: i64,
    limit: Option<usize>,
) -> Result<Vec<StoredMessage>, ChatError> {
    let conn = state.chat_db.get()?;
    // SQLite treats a negative LIMIT as no limit.
    let limit = limit.map(|l| l as i64).unwrap_or(-1);

    let mut stmt = conn.prepare(
        "SELECT id, role, content, created_at
         FROM messages
         WHERE session_id = ?
         ORDER BY id ASC
         LIMIT ?",
    )?;

    let messages = stmt
        .query_map(params![session_id, limit], |row| {
            Ok(StoredMessage {
                id: row.get(0)?,
                role: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(messages)
}

/// Deletes a session and its messages if it belongs to `user_id`.
#[instrument(skip(state), err)]
pub async fn delete_session(
    state: &AppState,
    session_id: i64,
    user_id: i64,
) -> Result<bool, ChatError> {
    let mut conn = state.chat_db.get()?;
    let tx = conn.transaction()?;

    let owned = tx
        .query_row(
            "SELECT id FROM sessions WHERE id = ? AND user_id = ?",
            params![session_id, user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !owned {
        return Ok(false);
    }

    let removed = tx.execute(
        "DELETE FROM messages WHERE session_id = ?",
        params![session_id],
    )?;
    tx.execute("DELETE FROM sessions WHERE id = ?", params![session_id])?;
    tx.commit()?;

    info!("Deleted session {} with {} messages", session_id, removed);
    Ok(true)
}
