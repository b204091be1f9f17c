//! Palaver API server binary.
//!
//! Serves the conversation API and the chat relay. Uses PostgreSQL when a
//! database URL is given, otherwise an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use palaver_api::config::ApiConfig;
use palaver_core::completion::DEFAULT_MODEL;
use palaver_core::completion::openrouter::OPENROUTER_URL;
use palaver_core::store::{ConversationStore, MemoryConversationStore, PgConversationStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "palaver_server", about = "Palaver API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,

    /// PostgreSQL connection URL. Without one, data lives in memory only.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// OpenRouter API key for the chat relay.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    openrouter_api_key: Option<String>,

    /// Upstream chat-completions endpoint.
    #[arg(long, env = "OPENROUTER_URL", default_value = OPENROUTER_URL)]
    openrouter_url: String,

    /// Model used when a chat request does not name one.
    #[arg(long, env = "OPENROUTER_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Public hostname of this deployment, sent upstream as the referer.
    #[arg(long, env = "PUBLIC_HOST")]
    public_host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,palaver_api=debug,palaver_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind_addr,
        database_url: args.database_url.filter(|u| !u.trim().is_empty()),
        openrouter_api_key: args.openrouter_api_key,
        upstream_url: args.openrouter_url,
        default_model: args.model,
        public_host: args.public_host.filter(|h| !h.trim().is_empty()),
    };

    if config.api_key().is_none() {
        warn!("OPENROUTER_API_KEY is not set; POST /chat will answer 503");
    }

    let store: Arc<dyn ConversationStore> = match config.database_url.as_deref() {
        Some(url) => {
            info!(max_connections = args.max_connections, "connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(url)
                .await?;

            info!("running database migrations");
            palaver_api::migrate(&pool).await?;
            Arc::new(PgConversationStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store");
            Arc::new(MemoryConversationStore::new())
        }
    };

    let state = palaver_api::AppState::new(store, config.clone());
    let shutdown = state.shutdown.clone();
    let app = palaver_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, upstream = %config.upstream_url, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutting down, cancelling in-flight relays");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
