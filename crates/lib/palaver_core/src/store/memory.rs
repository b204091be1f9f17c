//! In-process conversation store.
//!
//! Used when no database is configured and by tests. State lives for the
//! lifetime of the store value.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ConversationStore, StoreError, StoreResult, next_touch};
use crate::models::{
    Conversation, ConversationWithMessages, Message, MessageRole, conversation_title,
};
use crate::uuid::new_id;

#[derive(Debug, Default)]
struct Tables {
    conversations: Vec<Conversation>,
    // Insertion order doubles as the created_at tie-breaker.
    messages: Vec<Message>,
}

impl Tables {
    fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn latest_message_at(&self, conversation_id: &str) -> Option<DateTime<Utc>> {
        self.messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .map(|m| m.created_at)
            .max()
    }

    fn messages_of(&self, conversation_id: &str) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by_key(|m| m.created_at);
        messages
    }
}

/// [`ConversationStore`] holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    tables: RwLock<Tables>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn list_conversations(&self) -> StoreResult<Vec<Conversation>> {
        let tables = self.tables.read().await;
        let mut conversations = tables.conversations.clone();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn create_conversation(&self, title: Option<&str>) -> StoreResult<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: new_id(),
            title: conversation_title(title),
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .conversations
            .push(conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &str) -> StoreResult<ConversationWithMessages> {
        let tables = self.tables.read().await;
        let conversation = tables
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::conversation_not_found(id))?;
        let messages = tables.messages_of(id);
        Ok(ConversationWithMessages {
            conversation,
            messages,
        })
    }

    async fn rename_conversation(&self, id: &str, title: &str) -> StoreResult<Conversation> {
        let mut tables = self.tables.write().await;
        let conversation = tables
            .conversation_mut(id)
            .ok_or_else(|| StoreError::conversation_not_found(id))?;
        conversation.title = title.to_string();
        conversation.updated_at = next_touch(conversation.updated_at);
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.conversations.len();
        tables.conversations.retain(|c| c.id != id);
        if tables.conversations.len() == before {
            return Err(StoreError::conversation_not_found(id));
        }
        tables.messages.retain(|m| m.conversation_id != id);
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        Ok(self.tables.read().await.messages_of(conversation_id))
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> StoreResult<Message> {
        let mut tables = self.tables.write().await;
        // A wall clock stepping back must not reorder the transcript.
        let created_at = match tables.latest_message_at(conversation_id) {
            Some(latest) => Utc::now().max(latest),
            None => Utc::now(),
        };
        let conversation = tables
            .conversation_mut(conversation_id)
            .ok_or_else(|| StoreError::conversation_not_found(conversation_id))?;
        conversation.updated_at = next_touch(conversation.updated_at);

        let message = Message {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }
}
