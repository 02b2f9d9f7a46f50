use crate::error::ChatError;
use crate::profile::{insert_profile, UserProfile};
use crate::AppState;
use anyhow::anyhow;
use bcrypt::{hash, verify};
use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::Serialize;
use tracing::{info, instrument, warn};

pub const DEFAULT_SESSION_NAME: &str = "Default Session";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
}

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
// Keeps the test suite fast; bcrypt's minimum cost.
#[cfg(test)]
const HASH_COST: u32 = 4;

pub fn hash_password(password: &str) -> Result<String, ChatError> {
    hash(password, HASH_COST)
        .map_err(|e| anyhow!("Failed to hash password: {}", e).into())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    verify(password, password_hash).unwrap_or(false)
}

fn validate_credentials<'a>(
    username: &'a str,
    password: &str,
) -> Result<&'a str, ChatError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ChatError::InvalidInput(
            "Username must not be empty".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(ChatError::InvalidInput(
            "Password must not be empty".to_string(),
        ));
    }
    Ok(username)
}

/// Creates a user together with an empty profile and a default chat session.
#[instrument(skip(state, password), err)]
pub async fn create_user(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AuthenticatedUser, ChatError> {
    let username = validate_credentials(username, password)?;
    let password_hash = hash_password(password)?;
    let now = chrono::Utc::now().timestamp();

    let mut conn = state.chat_db.get()?;
    let tx = conn.transaction()?;

    let inserted = tx.execute(
        "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        params![username, password_hash, now],
    );
    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            warn!("Username {} already exists", username);
            return Err(ChatError::UsernameTaken);
        }
        Err(e) => return Err(e.into()),
    }
    let user_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO sessions (user_id, session_name, created_at, updated_at)
         VALUES (?, ?, ?, ?)",
        params![user_id, DEFAULT_SESSION_NAME, now, now],
    )?;
    insert_profile(&tx, user_id, &UserProfile::empty())?;
    tx.commit()?;

    info!("Created user {} with id {}", username, user_id);
    Ok(AuthenticatedUser {
        user_id,
        username: username.to_string(),
    })
}

#[instrument(skip(state, password))]
pub async fn authenticate_user(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AuthenticatedUser, ChatError> {
    let conn = state.chat_db.get()?;

    let row = conn
        .query_row(
            "SELECT id, username, password_hash FROM users WHERE username = ?",
            params![username.trim()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((user_id, username, password_hash))
            if verify_password(password, &password_hash) =>
        {
            Ok(AuthenticatedUser { user_id, username })
        }
        _ => Err(ChatError::InvalidCredentials),
    }
}

pub async fn user_exists(state: &AppState, user_id: i64) -> Result<bool, ChatError> {
    let conn = state.chat_db.get()?;
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?", params![user_id], |_| {
            Ok(())
        })
        .optional()?;
    Ok(found.is_some())
}
