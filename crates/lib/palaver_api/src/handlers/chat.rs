//! Chat relay handler: streams an upstream completion to the caller.
//!
//! `POST /chat`:
//! 1. Requires an OpenRouter API key in the config (503 otherwise)
//! 2. Validates the message list and picks the model
//! 3. Opens a streamed completion upstream
//! 4. Pumps the upstream body, unmodified, into the response

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::stream;
use palaver_core::completion::pump::{RELAY_CHANNEL_CAPACITY, pump};
use palaver_core::completion::{ChatMessage, CompletionRequest};
use palaver_core::models::MessageRole;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, instrument};

use super::parse_json_body;
use crate::AppState;
use crate::error::{AppError, AppResult};

/// Body of `POST /chat`.
#[derive(Debug, Default, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Option<Value>,
    #[serde(default)]
    model: Option<Value>,
}

/// Validate the prompt: a non-empty array of `{role, content}` objects.
fn parse_messages(value: Option<&Value>) -> AppResult<Vec<ChatMessage>> {
    let items = value
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| {
            AppError::Validation("messages array is required and must not be empty".into())
        })?;

    items
        .iter()
        .map(|item| {
            let role = item
                .get("role")
                .and_then(Value::as_str)
                .and_then(|r| r.parse::<MessageRole>().ok());
            let content = item.get("content").and_then(Value::as_str);
            match (role, content) {
                (Some(role), Some(content)) => Ok(ChatMessage {
                    role,
                    content: content.to_string(),
                }),
                _ => Err(AppError::Validation(
                    "each message needs a role (user, assistant or system) and string content"
                        .into(),
                )),
            }
        })
        .collect()
}

/// `POST /chat`: relay a streamed chat completion.
#[instrument(skip_all, fields(operation = "relay chat completion"), err(level = "warn"))]
pub async fn chat_handler(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let api_key = state
        .config
        .api_key()
        .ok_or_else(|| AppError::Misconfigured("OPENROUTER_API_KEY is not set".into()))?
        .to_string();

    let body: ChatRequest = parse_json_body(&body, false)?;
    let messages = parse_messages(body.messages.as_ref())?;
    let request = CompletionRequest::new(
        messages,
        body.model.as_ref().and_then(Value::as_str),
        &state.config.default_model,
    );

    let cancel = state.shutdown.child_token();
    // Fires when this future is dropped before responding, or later when the
    // response body is dropped (client disconnect).
    let guard = cancel.clone().drop_guard();

    let upstream = state
        .relay
        .open(&api_key, &state.config.referer(), &request, &cancel)
        .await?;

    info!(
        model = %request.model,
        messages = request.messages.len(),
        "relaying chat completion"
    );

    let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
    tokio::spawn(pump(upstream.bytes_stream(), tx, cancel));

    let body = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|item| (item, (rx, guard)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .map_err(|e| AppError::Internal(format!("Response build failed: {e}")))
}
