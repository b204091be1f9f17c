//! Message request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use palaver_core::models::{Message, MessageRole};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::parse_json_body;
use crate::AppState;
use crate::error::{AppError, AppResult};

/// Body of `POST /conversations/{id}/messages`.
#[derive(Debug, Default, Deserialize)]
struct CreateMessageRequest {
    #[serde(default)]
    role: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
}

/// `GET /conversations/{id}/messages`: messages in send order.
#[instrument(skip_all, fields(operation = "list messages"), err(level = "warn"))]
pub async fn list_messages_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = state
        .store
        .list_messages(&conversation_id)
        .await
        .map_err(|e| AppError::store("list messages", e))?;
    Ok(Json(messages))
}

/// `POST /conversations/{id}/messages`: append a message.
#[instrument(skip_all, fields(operation = "create message"), err(level = "warn"))]
pub async fn create_message_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Message>)> {
    let body: CreateMessageRequest = parse_json_body(&body, false)?;
    let content = body
        .content
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Missing or invalid content".into()))?;
    let role = MessageRole::from_loose(body.role.as_ref());

    let message = state
        .store
        .create_message(&conversation_id, role, content)
        .await
        .map_err(|e| AppError::store("create message", e))?;

    debug!(
        conversation_id = %conversation_id,
        message_id = %message.id,
        role = %message.role,
        "message created"
    );
    Ok((StatusCode::CREATED, Json(message)))
}
