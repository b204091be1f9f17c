//! # palaver_api
//!
//! HTTP API library for Palaver: conversation CRUD and the chat relay.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use palaver_core::completion::openrouter::OpenRouterClient;
use palaver_core::store::ConversationStore;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{chat, conversations, health, messages};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Conversation storage.
    pub store: Arc<dyn ConversationStore>,
    /// API configuration.
    pub config: ApiConfig,
    /// Upstream completion client.
    pub relay: OpenRouterClient,
    /// Cancelled on shutdown; every relay request runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: Arc<dyn ConversationStore>, config: ApiConfig) -> Self {
        let relay = OpenRouterClient::new(reqwest::Client::new(), config.upstream_url.clone());
        Self {
            store,
            config,
            relay,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `palaver_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    palaver_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/conversations",
            get(conversations::list_conversations_handler)
                .post(conversations::create_conversation_handler),
        )
        .route(
            "/conversations/{id}",
            get(conversations::get_conversation_handler)
                .patch(conversations::update_conversation_handler)
                .delete(conversations::delete_conversation_handler),
        )
        .route(
            "/conversations/{id}/messages",
            get(messages::list_messages_handler).post(messages::create_message_handler),
        )
        .route("/chat", post(chat::chat_handler))
        .layer(cors)
        .with_state(state)
}
