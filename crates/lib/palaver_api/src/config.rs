//! API server configuration.

use palaver_core::completion::DEFAULT_MODEL;
use palaver_core::completion::openrouter::OPENROUTER_URL;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// OpenRouter API key. The chat relay answers 503 while this is unset.
    pub openrouter_api_key: Option<String>,
    /// Upstream chat-completions endpoint.
    pub upstream_url: String,
    /// Model used when a chat request does not name one.
    pub default_model: String,
    /// Public hostname of this deployment, used for the `HTTP-Referer` header.
    pub public_host: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            database_url: None,
            openrouter_api_key: None,
            upstream_url: OPENROUTER_URL.into(),
            default_model: DEFAULT_MODEL.into(),
            public_host: None,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable             | Default                                          |
    /// |----------------------|--------------------------------------------------|
    /// | `BIND_ADDR`          | `127.0.0.1:3100`                                 |
    /// | `DATABASE_URL`       | unset (in-memory store)                          |
    /// | `OPENROUTER_API_KEY` | unset (chat relay disabled)                      |
    /// | `OPENROUTER_URL`     | `https://openrouter.ai/api/v1/chat/completions`  |
    /// | `OPENROUTER_MODEL`   | `openai/gpt-3.5-turbo`                           |
    /// | `PUBLIC_HOST`        | unset                                            |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: non_blank_env("DATABASE_URL"),
            openrouter_api_key: non_blank_env("OPENROUTER_API_KEY"),
            upstream_url: std::env::var("OPENROUTER_URL").unwrap_or(defaults.upstream_url),
            default_model: std::env::var("OPENROUTER_MODEL").unwrap_or(defaults.default_model),
            public_host: non_blank_env("PUBLIC_HOST"),
        }
    }

    /// The API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.openrouter_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Value of the `HTTP-Referer` header sent upstream.
    pub fn referer(&self) -> String {
        match self.public_host.as_deref() {
            Some(host) => format!("https://{host}"),
            None => format!("http://{}", self.bind_addr),
        }
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
