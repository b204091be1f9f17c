//! Chat-completion relay.
//!
//! Opens a streaming completion against the upstream provider
//! ([`openrouter`]) and copies the raw response body to the caller
//! ([`pump`]). The relay never looks inside the streamed payload.

pub mod openrouter;
pub mod pump;

use serde::Serialize;
use thiserror::Error;

use crate::models::MessageRole;

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

/// One message of the prompt sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// What the caller asked to complete.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// Build a request, falling back to `default_model` when `model` is
    /// absent or blank.
    pub fn new(messages: Vec<ChatMessage>, model: Option<&str>, default_model: &str) -> Self {
        let model = match model.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => default_model.to_string(),
        };
        Self { model, messages }
    }
}

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Upstream answered with a non-success status.
    #[error("Upstream returned status {status}")]
    Upstream { status: u16 },

    /// The relay request was cancelled before upstream responded.
    #[error("Relay cancelled")]
    Cancelled,

    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RelayError {
    /// Whether an upstream failure was the provider's fault (5xx) rather than
    /// a rejection of what we sent.
    pub fn is_upstream_server_error(&self) -> bool {
        matches!(self, RelayError::Upstream { status } if *status >= 500)
    }
}
