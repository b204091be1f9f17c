//! PostgreSQL conversation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{ConversationStore, StoreError, StoreResult};
use crate::models::{
    Conversation, ConversationWithMessages, Message, MessageRole, conversation_title,
};
use crate::uuid::new_id;

/// Row returned by conversation queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ConversationRow {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row returned by message queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role: MessageRole = row
            .role
            .parse()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(Message {
            id: row.id,
            conversation_id: row.conversation_id,
            role,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

// Bumps updated_at even when clock_timestamp() has not moved past it.
const TOUCH_UPDATED_AT: &str =
    "updated_at = GREATEST(clock_timestamp(), updated_at + interval '1 microsecond')";

/// [`ConversationStore`] backed by a PostgreSQL pool.
///
/// Run [`crate::migrate::migrate`] against the pool before use.
#[derive(Debug, Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_conversations(&self) -> StoreResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, title, created_at, updated_at
            FROM conversations
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    async fn create_conversation(&self, title: Option<&str>) -> StoreResult<Conversation> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            INSERT INTO conversations (id, title)
            VALUES ($1, $2)
            RETURNING id, title, created_at, updated_at
            "#,
        )
        .bind(new_id())
        .bind(conversation_title(title))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_conversation(&self, id: &str) -> StoreResult<ConversationWithMessages> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, title, created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::conversation_not_found(id))?;

        let messages = self.fetch_messages(id).await?;

        Ok(ConversationWithMessages {
            conversation: row.into(),
            messages,
        })
    }

    async fn rename_conversation(&self, id: &str, title: &str) -> StoreResult<Conversation> {
        let sql = format!(
            r#"
            UPDATE conversations
            SET title = $1, {TOUCH_UPDATED_AT}
            WHERE id = $2
            RETURNING id, title, created_at, updated_at
            "#
        );
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(title)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::conversation_not_found(id))?;

        Ok(row.into())
    }

    async fn delete_conversation(&self, id: &str) -> StoreResult<()> {
        // Messages go with it via ON DELETE CASCADE, in the same statement.
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conversation_not_found(id));
        }
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        self.fetch_messages(conversation_id).await
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> StoreResult<Message> {
        let mut tx = self.pool.begin().await?;

        // Touch first: the row lock also keeps a concurrent delete from
        // slipping in between the existence check and the insert.
        let touch = format!("UPDATE conversations SET {TOUCH_UPDATED_AT} WHERE id = $1");
        let touched = sqlx::query(&touch)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::conversation_not_found(conversation_id));
        }

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, conversation_id, role, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, role, content, created_at
            "#,
        )
        .bind(new_id())
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Message::try_from(row)
    }
}
