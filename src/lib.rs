use crate::news::{real::maybe_create_news_client, NewsClientTrait};
use crate::openai::{real::maybe_create_openai_client, OpenAIClientTrait};
use anyhow::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing::instrument;
use tracing::warn;

pub mod accounts;
pub mod app;
pub mod cli;
pub mod conversation;
pub mod emotion;
pub mod error;
pub mod llm;
pub mod news;
pub mod openai;
pub mod profile;
pub mod prompts;
pub mod sessions;
pub mod system_prompt;

pub mod test_utils;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PROFILE_UPDATE_FREQUENCY: u64 = 1;
pub const DEFAULT_EMOTIONAL_CHECK_FREQUENCY: u64 = 7;

// Define the AppState struct for both main app and testing
pub struct AppState {
    pub chat_db: Pool<SqliteConnectionManager>,
    pub openai_client: Option<Arc<dyn OpenAIClientTrait>>,
    pub news_client: Option<Arc<dyn NewsClientTrait>>,
    pub chat_model: String,
    /// Refresh the profile every N user messages in a session.
    pub profile_update_frequency: u64,
    /// Estimate the emotional state every N user messages in a session.
    pub emotional_check_frequency: u64,
    // User messages seen per session since startup.
    pub message_counters: Arc<Mutex<HashMap<i64, u64>>>,
    #[allow(dead_code)]
    temp_chat_db_path: Option<tempfile::NamedTempFile>,
}

impl AppState {
    pub fn new_for_testing() -> Self {
        Self::new_for_testing_with_clients(None, None)
    }

    pub fn new_for_testing_with_openai_client(
        openai_client: Option<Arc<dyn OpenAIClientTrait>>,
    ) -> Self {
        Self::new_for_testing_with_clients(openai_client, None)
    }

    pub fn new_for_testing_with_clients(
        openai_client: Option<Arc<dyn OpenAIClientTrait>>,
        news_client: Option<Arc<dyn NewsClientTrait>>,
    ) -> Self {
        let temp_chat_db_file = tempfile::NamedTempFile::new()
            .expect("Failed to create temporary chat database file");
        let chat_db_path = temp_chat_db_file
            .path()
            .to_str()
            .expect("Failed to get chat temp file path")
            .to_string();

        let chat_pool =
            create_chat_pool(&chat_db_path).expect("Failed to create chat pool");

        let mut chat_conn = chat_pool.get().expect("Failed to get connection");
        init_chat_db(&mut chat_conn).expect("Failed to initialize chat db");

        Self {
            chat_db: chat_pool,
            openai_client,
            news_client,
            chat_model: "gpt-4".to_string(),
            profile_update_frequency: DEFAULT_PROFILE_UPDATE_FREQUENCY,
            emotional_check_frequency: DEFAULT_EMOTIONAL_CHECK_FREQUENCY,
            message_counters: Arc::new(Mutex::new(HashMap::new())),
            // Dropping the state removes the file
            temp_chat_db_path: Some(temp_chat_db_file),
        }
    }

    /// Increments and returns the message counter for a session.
    pub async fn bump_message_counter(&self, session_id: i64) -> u64 {
        let mut counters = self.message_counters.lock().await;
        let count = counters.entry(session_id).or_insert(0);
        *count += 1;
        *count
    }

    pub async fn forget_message_counter(&self, session_id: i64) {
        self.message_counters.lock().await.remove(&session_id);
    }

    pub fn news_available(&self) -> bool {
        self.news_client.is_some()
    }
}

// Create a config struct to hold AppState configuration
pub struct AppConfig {
    pub chat_pool: Pool<SqliteConnectionManager>,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub chat_model: String,
    pub news_api_key: Option<String>,
    pub news_api_base: String,
    pub profile_update_frequency: u64,
    pub emotional_check_frequency: u64,
}

// Function to create AppState from parameters
pub fn create_app_state(config: AppConfig) -> Arc<AppState> {
    let openai_client = match maybe_create_openai_client(
        config.openai_api_key,
        config.openai_api_base,
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Failed to create OpenAI client: {}", e);
            None
        }
    };

    let news_client =
        match maybe_create_news_client(config.news_api_key, &config.news_api_base)
        {
            Ok(client) => Some(client),
            Err(e) => {
                info!("News integration disabled: {}", e);
                None
            }
        };

    Arc::new(AppState {
        chat_db: config.chat_pool,
        openai_client,
        news_client,
        chat_model: config.chat_model,
        profile_update_frequency: config.profile_update_frequency.max(1),
        emotional_check_frequency: config.emotional_check_frequency.max(1),
        message_counters: Arc::new(Mutex::new(HashMap::new())),
        temp_chat_db_path: None,
    })
}

#[derive(Debug)]
struct ForeignKeys;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ForeignKeys {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.pragma_update(None, "foreign_keys", "ON")
    }
}

/// Opens a pool on the chat database with foreign keys enforced.
pub fn create_chat_pool(path: &str) -> Result<Pool<SqliteConnectionManager>> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .connection_customizer(Box::new(ForeignKeys))
        .build(manager)?;
    Ok(pool)
}

fn chat_migration_steps() -> Vec<M<'static>> {
    vec![
        M::up(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                session_name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                role TEXT NOT NULL,             -- 'user' or 'assistant'
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions (id)
            );

            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id INTEGER PRIMARY KEY,
                profile_json TEXT NOT NULL,
                emotional_state_json TEXT,
                last_updated INTEGER NOT NULL,
                last_emotional_check INTEGER,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );
            "#,
        ),
        M::up(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_session
                ON messages(session_id, id);

            CREATE INDEX IF NOT EXISTS idx_sessions_user_updated
                ON sessions(user_id, updated_at DESC);
            "#,
        ),
    ]
}

// Database initialization
#[instrument(skip(conn))]
pub fn init_chat_db(conn: &mut Connection) -> Result<()> {
    info!("Initializing chat database");
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let migrations = Migrations::new(chat_migration_steps());
    migrations.to_latest(conn)?;

    Ok(())
}
