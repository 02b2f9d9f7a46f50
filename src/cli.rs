use crate::news::DEFAULT_NEWS_API_BASE;
use crate::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMOTIONAL_CHECK_FREQUENCY,
    DEFAULT_PROFILE_UPDATE_FREQUENCY,
};
use clap::Parser;

/// Command-line arguments of the chat server
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Adaptive LLM chat agent")]
pub struct ServerArgs {
    /// Path to the chat database
    #[arg(long, env = "DATABASE_PATH", default_value = "chat_agent.db")]
    pub database_path: String,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    pub openai_api_base: Option<String>,

    /// Model used for chat, profile extraction and emotional analysis
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// NewsAPI key; news greetings are off without it
    #[arg(long, env = "NEWS_API_KEY")]
    pub news_api_key: Option<String>,

    /// NewsAPI base URL
    #[arg(long, env = "NEWS_API_BASE", default_value = DEFAULT_NEWS_API_BASE)]
    pub news_api_base: String,

    /// Refresh the user profile every N user messages
    #[arg(long, env = "PROFILE_UPDATE_FREQUENCY", default_value_t = DEFAULT_PROFILE_UPDATE_FREQUENCY)]
    pub profile_update_frequency: u64,

    /// Estimate the emotional state every N user messages
    #[arg(long, env = "EMOTIONAL_CHECK_FREQUENCY", default_value_t = DEFAULT_EMOTIONAL_CHECK_FREQUENCY)]
    pub emotional_check_frequency: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_constants() {
        let args = ServerArgs::try_parse_from(["adaptive_chat_server"]).unwrap();
        assert_eq!(args.port, 8000);
        assert_eq!(args.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(args.news_api_base, DEFAULT_NEWS_API_BASE);
        assert_eq!(args.emotional_check_frequency, 7);
    }

    #[test]
    fn flags_override_defaults() {
        let args = ServerArgs::try_parse_from([
            "adaptive_chat_server",
            "--database-path",
            "/tmp/chat.db",
            "--port",
            "9001",
            "--profile-update-frequency",
            "3",
        ])
        .unwrap();
        assert_eq!(args.database_path, "/tmp/chat.db");
        assert_eq!(args.port, 9001);
        assert_eq!(args.profile_update_frequency, 3);
    }
}
