//! Conversation request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use palaver_core::models::{Conversation, ConversationWithMessages};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::parse_json_body;
use crate::AppState;
use crate::error::{AppError, AppResult};

/// Body of `POST /conversations`. A non-string title counts as absent.
#[derive(Debug, Default, Deserialize)]
struct CreateConversationRequest {
    #[serde(default)]
    title: Option<Value>,
}

/// Body of `PATCH /conversations/{id}`.
#[derive(Debug, Default, Deserialize)]
struct UpdateConversationRequest {
    #[serde(default)]
    title: Option<Value>,
}

/// `GET /conversations`: all conversations, most recently active first.
#[instrument(skip_all, fields(operation = "list conversations"), err(level = "warn"))]
pub async fn list_conversations_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Conversation>>> {
    let conversations = state
        .store
        .list_conversations()
        .await
        .map_err(|e| AppError::store("list conversations", e))?;
    Ok(Json(conversations))
}

/// `POST /conversations`: create a conversation.
#[instrument(skip_all, fields(operation = "create conversation"), err(level = "warn"))]
pub async fn create_conversation_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Conversation>)> {
    let body: CreateConversationRequest = parse_json_body(&body, true)?;
    let title = body.title.as_ref().and_then(Value::as_str);

    let conversation = state
        .store
        .create_conversation(title)
        .await
        .map_err(|e| AppError::store("create conversation", e))?;

    info!(conversation_id = %conversation.id, "conversation created");
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// `GET /conversations/{id}`: a conversation with its messages.
#[instrument(skip_all, fields(operation = "get conversation"), err(level = "warn"))]
pub async fn get_conversation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ConversationWithMessages>> {
    let conversation = state
        .store
        .get_conversation(&id)
        .await
        .map_err(|e| AppError::store("get conversation", e))?;
    Ok(Json(conversation))
}

/// `PATCH /conversations/{id}`: rename a conversation.
#[instrument(skip_all, fields(operation = "update conversation"), err(level = "warn"))]
pub async fn update_conversation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Conversation>> {
    let body: UpdateConversationRequest = parse_json_body(&body, false)?;
    let title = body
        .title
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Missing or invalid title".into()))?;

    let conversation = state
        .store
        .rename_conversation(&id, title)
        .await
        .map_err(|e| AppError::store("update conversation", e))?;
    Ok(Json(conversation))
}

/// `DELETE /conversations/{id}`: delete a conversation and its messages.
#[instrument(skip_all, fields(operation = "delete conversation"), err(level = "warn"))]
pub async fn delete_conversation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state
        .store
        .delete_conversation(&id)
        .await
        .map_err(|e| AppError::store("delete conversation", e))?;

    info!(conversation_id = %id, "conversation deleted");
    Ok(Json(serde_json::json!({"ok": true})))
}
