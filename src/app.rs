use crate::accounts;
use crate::cli::ServerArgs;
use crate::conversation::{handle_chat_turn, proactive_greeting, ChatTurnOutcome};
use crate::profile;
use crate::sessions;
use crate::system_prompt::generate_system_prompt;
use crate::AppState;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{delete, get, post},
    Form, Json, Router,
};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::sync::Arc;
use std::sync::OnceLock;
use tera::{Context as TeraContext, Tera};
use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{prelude::*, Registry};
use tracing_tree::HierarchicalLayer;

// Add build-time information
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const SERVICE_NAME: &str = "Adaptive LLM Chat Agent";
const NO_PROFILE_PROMPT: &str = "Perfil no disponible aún";

type ApiResult<T> = Result<T, (StatusCode, String)>;

fn get_build_info() -> String {
    fn clean(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty() && v != "unknown")
    }

    let clean_env = |key: &str| clean(env::var(key).ok());

    let mut parts = Vec::new();
    parts.push(format!("Version {}", built_info::PKG_VERSION));

    if let Some(tag) = clean_env("APP_BUILD_TAG") {
        parts.push(format!("Image {}", tag));
    }
    if let Some(commit) = clean_env("APP_BUILD_COMMIT") {
        let short: String = commit.chars().take(12).collect();
        parts.push(format!("Commit {}", short));
    }
    if let Some(time) = clean(Some(built_info::BUILT_TIME_UTC.to_string())) {
        parts.push(format!("Built {}", time));
    }
    if let Some(profile) = clean(Some(built_info::PROFILE.to_string())) {
        parts.push(format!("Profile {}", profile));
    }
    if let Some(target) = clean(Some(built_info::TARGET.to_string())) {
        parts.push(format!("Target {}", target));
    }
    if let Some(rustc_version) =
        clean(Some(built_info::RUSTC_VERSION.to_string()))
    {
        parts.push(format!("Rustc {}", rustc_version));
    }

    parts.join(" • ")
}

static TEMPLATES: OnceLock<Tera> = OnceLock::new();

fn init_templates() -> Tera {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("templates/base.html")),
        ("landing.html", include_str!("templates/landing.html")),
        ("chat.html", include_str!("templates/chat.html")),
    ])
    .expect("built-in templates must parse");
    tera
}

pub fn ensure_templates() {
    TEMPLATES.get_or_init(init_templates);
}

fn render_page(template: &str, request_path: &str) -> Html<String> {
    let mut context = TeraContext::new();
    context.insert("build_info", &get_build_info());
    context.insert("request_path", &request_path);
    context.insert("service_name", &SERVICE_NAME);

    let rendered = TEMPLATES
        .get_or_init(init_templates)
        .render(template, &context)
        .unwrap_or_else(|e| format!("Template error: {}", e));

    Html(rendered)
}

async fn landing_page() -> Html<String> {
    render_page("landing.html", "/")
}

async fn chat_page() -> Html<String> {
    render_page("chat.html", "/chat")
}

#[instrument(skip(state))]
async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    debug!("Health check requested");
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": built_info::PKG_VERSION,
        "build": get_build_info(),
        "features": {
            "intelligent_profile": true,
            "emotional_analysis": true,
            "adaptive_identity": true,
            "llm_configured": state.openai_client.is_some(),
            "news_integration": state.news_available(),
        }
    }))
}

#[derive(Debug, Deserialize)]
struct CredentialsForm {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct NewSessionForm {
    user_id: i64,
    session_name: String,
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    session_id: i64,
    message: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> ApiResult<Json<Value>> {
    let user =
        accounts::create_user(&state, &form.username, &form.password).await?;

    Ok(Json(json!({
        "success": true,
        "user_id": user.user_id,
        "username": user.username,
    })))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> ApiResult<Json<Value>> {
    let user =
        accounts::authenticate_user(&state, &form.username, &form.password)
            .await?;

    Ok(Json(json!({
        "success": true,
        "user_id": user.user_id,
        "username": user.username,
    })))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let stored = profile::get_or_create_profile(&state, user_id).await?;
    Ok(Json(json!({ "profile": stored })))
}

async fn get_system_prompt(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let Some(stored) = profile::get_user_profile(&state, user_id).await? else {
        return Ok(Json(json!({
            "system_prompt": NO_PROFILE_PROMPT,
            "emotional_state": null,
        })));
    };

    let system_prompt =
        generate_system_prompt(&stored.profile, stored.emotional_state.as_ref());
    Ok(Json(json!({
        "system_prompt": system_prompt,
        "emotional_state": stored.emotional_state,
    })))
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let sessions = sessions::list_sessions(&state, user_id).await?;
    let greeting = proactive_greeting(&state, user_id, &sessions).await;

    Ok(Json(json!({
        "sessions": sessions,
        "proactive_greeting": greeting,
    })))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Form(form): Form<NewSessionForm>,
) -> ApiResult<Json<Value>> {
    let session_id =
        sessions::create_session(&state, form.user_id, &form.session_name)
            .await?;
    Ok(Json(json!({ "success": true, "session_id": session_id })))
}

async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let messages =
        sessions::get_session_messages(&state, session_id, None).await?;
    Ok(Json(json!({ "messages": messages })))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ChatForm>,
) -> ApiResult<Json<ChatTurnOutcome>> {
    let outcome = handle_chat_turn(&state, form.session_id, &form.message)
        .await
        .map_err(|e| {
            error!("Chat turn failed for session {}: {}", form.session_id, e);
            e
        })?;
    Ok(Json(outcome))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path((session_id, user_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    if !sessions::delete_session(&state, session_id, user_id).await? {
        return Err((
            StatusCode::NOT_FOUND,
            "Session not found or unauthorized".to_string(),
        ));
    }
    state.forget_message_counter(session_id).await;
    Ok(Json(json!({ "success": true })))
}

pub fn routes(state: Arc<AppState>) -> Router {
    let predicate = SizeAbove::new(32)
        // still don't compress gRPC
        .and(NotForContentType::GRPC)
        // still don't compress images
        .and(NotForContentType::IMAGES);

    let compression_layer = CompressionLayer::new()
        .br(true)
        .deflate(true)
        .gzip(true)
        .zstd(true)
        .compress_when(predicate);

    ensure_templates();

    Router::new()
        .route("/", get(landing_page))
        .route("/chat", get(chat_page))
        .route("/health", get(health_check))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/profile/{user_id}", get(get_profile))
        .route("/api/system-prompt/{user_id}", get(get_system_prompt))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{user_id}", get(list_sessions))
        .route(
            "/api/sessions/{session_id}/{user_id}",
            delete(delete_session),
        )
        .route("/api/messages/{session_id}", get(get_messages))
        .route("/api/chat", post(chat))
        .layer(compression_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve() -> Result<()> {
    // Initialize logging with tracing
    let subscriber = Registry::default()
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        );

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let args = ServerArgs::parse();

    info!("Starting {}", SERVICE_NAME);
    info!("Opening chat database at {}", args.database_path);
    let chat_pool = crate::create_chat_pool(&args.database_path)?;
    {
        let mut conn = chat_pool.get()?;
        crate::init_chat_db(&mut conn)?;
    }

    let state = crate::create_app_state(crate::AppConfig {
        chat_pool,
        openai_api_key: args.openai_api_key,
        openai_api_base: args.openai_api_base,
        chat_model: args.chat_model,
        news_api_key: args.news_api_key,
        news_api_base: args.news_api_base,
        profile_update_frequency: args.profile_update_frequency,
        emotional_check_frequency: args.emotional_check_frequency,
    });
    if state.openai_client.is_none() {
        error!("No OpenAI API key configured; chat requests will fail with 503");
    }

    // Set up ctrl-c handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL-C, initiating shutdown");
            let _ = shutdown_tx.send(());
        }
    });

    let app = routes(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_render_with_build_info() {
        let page = render_page("landing.html", "/");
        assert!(page.0.contains(SERVICE_NAME));
        assert!(page.0.contains(built_info::PKG_VERSION));

        let page = render_page("chat.html", "/chat");
        assert!(page.0.contains("/api/chat"));
    }

    #[test]
    fn build_info_starts_with_version() {
        assert!(get_build_info()
            .starts_with(&format!("Version {}", built_info::PKG_VERSION)));
    }
}
