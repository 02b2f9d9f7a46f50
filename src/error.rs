use axum::http::StatusCode;
use thiserror::Error;

/// Domain failures surfaced to API callers.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Language model is not configured")]
    LlmUnavailable,
    #[error("Error: {0}")]
    Llm(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::InvalidInput(_) | ChatError::UsernameTaken => {
                StatusCode::BAD_REQUEST
            }
            ChatError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ChatError::UserNotFound | ChatError::SessionNotFound => {
                StatusCode::NOT_FOUND
            }
            ChatError::LlmUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Llm(_) | ChatError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<rusqlite::Error> for ChatError {
    fn from(e: rusqlite::Error) -> Self {
        ChatError::Storage(e.into())
    }
}

impl From<r2d2::Error> for ChatError {
    fn from(e: r2d2::Error) -> Self {
        ChatError::Storage(e.into())
    }
}

/// Handlers answer with `(StatusCode, String)` pairs.
impl From<ChatError> for (StatusCode, String) {
    fn from(e: ChatError) -> Self {
        (e.status_code(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(
            ChatError::UsernameTaken.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ChatError::SessionNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ChatError::LlmUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let (status, body): (StatusCode, String) =
            ChatError::Llm("rate limited".to_string()).into();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error: rate limited");
    }
}
