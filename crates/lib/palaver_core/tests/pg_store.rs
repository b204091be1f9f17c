//! PostgreSQL store tests.
//!
//! Run against the database named by `DATABASE_URL`; skipped when it is unset.

use palaver_core::models::{DEFAULT_CONVERSATION_TITLE, MessageRole};
use palaver_core::store::{ConversationStore, PgConversationStore, StoreError};
use sqlx::PgPool;

async fn store() -> Option<PgConversationStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL store test");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect to PostgreSQL");
    palaver_core::migrate::migrate(&pool).await.expect("migrate");
    Some(PgConversationStore::new(pool))
}

#[tokio::test]
async fn conversation_lifecycle() {
    let Some(store) = store().await else { return };

    let conv = store.create_conversation(Some("   ")).await.unwrap();
    assert_eq!(conv.title, DEFAULT_CONVERSATION_TITLE);

    let renamed = store.rename_conversation(&conv.id, "Renamed").await.unwrap();
    assert_eq!(renamed.title, "Renamed");
    assert!(renamed.updated_at > conv.updated_at);

    let listed = store.list_conversations().await.unwrap();
    assert!(listed.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));
    assert!(listed.iter().any(|c| c.id == conv.id));

    store.delete_conversation(&conv.id).await.unwrap();
    assert!(matches!(
        store.get_conversation(&conv.id).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.rename_conversation(&conv.id, "again").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn messages_are_ordered_and_cascade() {
    let Some(store) = store().await else { return };

    let conv = store.create_conversation(None).await.unwrap();
    for i in 0..10 {
        let role = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        store
            .create_message(&conv.id, role, &format!("m{i}"))
            .await
            .unwrap();
    }

    let detail = store.get_conversation(&conv.id).await.unwrap();
    let contents: Vec<&str> = detail.messages.iter().map(|m| m.content.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("m{i}")).collect();
    assert_eq!(contents, expected);
    assert_eq!(detail.messages[1].role, MessageRole::Assistant);
    assert!(detail.conversation.updated_at > conv.updated_at);

    store.delete_conversation(&conv.id).await.unwrap();
    assert!(store.list_messages(&conv.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn message_for_missing_conversation_is_not_found() {
    let Some(store) = store().await else { return };

    let err = store
        .create_message("no-such-conversation", MessageRole::User, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(
        store
            .list_messages("no-such-conversation")
            .await
            .unwrap()
            .is_empty()
    );
}
