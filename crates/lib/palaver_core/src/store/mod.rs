//! Conversation and message persistence.
//!
//! [`ConversationStore`] is the single gateway to storage. Handlers hold it as
//! `Arc<dyn ConversationStore>` so the PostgreSQL backend and the in-memory
//! backend are interchangeable.

mod memory;
mod pg;

pub use memory::MemoryConversationStore;
pub use pg::PgConversationStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{Conversation, ConversationWithMessages, Message, MessageRole};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn conversation_not_found(id: &str) -> Self {
        StoreError::NotFound(format!("conversation {id}"))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Short backend name, reported by the health endpoint.
    fn backend(&self) -> &'static str;

    /// Round-trip to storage.
    async fn ping(&self) -> StoreResult<()>;

    /// All conversations, most recently updated first.
    async fn list_conversations(&self) -> StoreResult<Vec<Conversation>>;

    /// Create a conversation. A missing or blank title becomes
    /// [`DEFAULT_CONVERSATION_TITLE`](crate::models::DEFAULT_CONVERSATION_TITLE).
    async fn create_conversation(&self, title: Option<&str>) -> StoreResult<Conversation>;

    /// A conversation and its messages in ascending creation order.
    async fn get_conversation(&self, id: &str) -> StoreResult<ConversationWithMessages>;

    /// Set the title and touch `updated_at`. The title is stored as given.
    async fn rename_conversation(&self, id: &str, title: &str) -> StoreResult<Conversation>;

    /// Delete a conversation together with its messages.
    async fn delete_conversation(&self, id: &str) -> StoreResult<()>;

    /// Messages of a conversation in ascending creation order. Unknown ids
    /// yield an empty list.
    async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>>;

    /// Append a message and touch the owning conversation's `updated_at`.
    async fn create_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> StoreResult<Message>;
}

/// Next `updated_at` for a touched record: now, but always strictly after
/// the previous value.
pub(crate) fn next_touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    let floor = previous + Duration::microseconds(1);
    if now > floor { now } else { floor }
}
