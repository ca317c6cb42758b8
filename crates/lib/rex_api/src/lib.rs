//! # rex_api
//!
//! HTTP API library for Rex.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use rex_core::auth::Authenticator;
use rex_core::completion::{CompletionConfig, CompletionModel, OpenAiModel};
use rex_core::store::{
    ChatRepository, EventLogRepository, MemoryRepository, PgRepository, UserRepository,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use rex_core::auth::{LogMailer, ResetMailer};

use crate::config::ApiConfig;
use crate::handlers::{auth, chat, chats, completions, logs, messages, usage};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Chat rooms and messages.
    pub chats: Arc<dyn ChatRepository>,
    /// Event log records.
    pub logs: Arc<dyn EventLogRepository>,
    /// Credential flows and token issuing.
    pub auth: Authenticator,
    /// Completion provider.
    pub model: Arc<dyn CompletionModel>,
    /// Prompt and model settings.
    pub completion: CompletionConfig,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// State backed by PostgreSQL and the configured OpenAI-compatible model.
    /// Reset tokens go out through `mailer`.
    pub fn postgres(pool: PgPool, mailer: Arc<dyn ResetMailer>, config: ApiConfig) -> Self {
        let repo = Arc::new(PgRepository::new(pool));
        let model = openai_model(&config);
        Self::from_parts(repo, model, mailer, config)
    }

    /// State backed by an in-memory repository. Used by tests and local runs.
    pub fn in_memory(model: Arc<dyn CompletionModel>, config: ApiConfig) -> Self {
        Self::from_parts(
            Arc::new(MemoryRepository::new()),
            model,
            Arc::new(LogMailer),
            config,
        )
    }

    /// Assemble state from one repository serving all three store traits.
    pub fn from_parts<R>(
        repo: Arc<R>,
        model: Arc<dyn CompletionModel>,
        mailer: Arc<dyn ResetMailer>,
        config: ApiConfig,
    ) -> Self
    where
        R: ChatRepository + EventLogRepository + UserRepository + 'static,
    {
        let completion = CompletionConfig {
            model: config.model.clone(),
            ..CompletionConfig::default()
        };
        Self {
            chats: repo.clone(),
            logs: repo.clone(),
            auth: Authenticator::new(repo, mailer, config.jwt_secret.as_bytes()),
            model,
            completion,
            config,
        }
    }
}

/// Completion client for the configured OpenAI-compatible endpoint.
pub fn openai_model(config: &ApiConfig) -> Arc<dyn CompletionModel> {
    Arc::new(OpenAiModel::new(
        reqwest::Client::new(),
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
    ))
}

/// Run embedded database migrations.
///
/// Delegates to `rex_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    rex_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/password-reset", post(auth::password_reset_handler))
        .route(
            "/auth/password-reset/confirm",
            post(auth::password_reset_confirm_handler),
        );

    // Protected routes (require auth)
    let protected = Router::new()
        .route(
            "/chats",
            get(chats::list_chats_handler).post(chats::create_chat_handler),
        )
        .route(
            "/chats/{id}",
            get(chats::get_chat_handler)
                .patch(chats::update_chat_handler)
                .delete(chats::delete_chat_handler),
        )
        .route(
            "/chats/{id}/messages",
            get(messages::list_messages_handler).post(messages::post_message_handler),
        )
        .route(
            "/chats/{id}/messages/{message_id}",
            get(messages::get_message_handler),
        )
        .route(
            "/chats/{id}/reconcile",
            post(messages::reconcile_handler),
        )
        .route("/chat", post(chat::chat_handler))
        .route("/completions/title", post(completions::title_handler))
        .route("/usage", get(usage::usage_handler))
        .route("/logs", post(logs::post_log_handler))
        .route(
            "/logs/{id}",
            get(logs::get_log_handler)
                .patch(logs::update_log_handler)
                .delete(logs::delete_log_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
