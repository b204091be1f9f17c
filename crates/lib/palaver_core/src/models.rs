//! Conversation domain models.
//!
//! These serialize straight to the public JSON shape (camelCase keys,
//! RFC 3339 timestamps), so handlers return them without a mapping layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to conversations created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }

    /// Lenient conversion for request bodies: anything that is not one of the
    /// three role strings becomes [`MessageRole::User`].
    pub fn from_loose(value: Option<&serde_json::Value>) -> Self {
        value
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for MessageRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Conversation summary, as listed and as returned by create/rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single role-tagged entry in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Conversation with its messages in ascending creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Resolve the title for a new conversation: trimmed, or the default when
/// absent or blank.
pub fn conversation_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_CONVERSATION_TITLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn roles_parse_from_wire_names() {
        assert_eq!("user".parse::<MessageRole>(), Ok(MessageRole::User));
        assert_eq!("assistant".parse::<MessageRole>(), Ok(MessageRole::Assistant));
        assert_eq!("system".parse::<MessageRole>(), Ok(MessageRole::System));
        assert!("User".parse::<MessageRole>().is_err());
        assert!("tool".parse::<MessageRole>().is_err());
    }

    #[test]
    fn loose_role_falls_back_to_user() {
        assert_eq!(MessageRole::from_loose(None), MessageRole::User);
        assert_eq!(MessageRole::from_loose(Some(&json!("robot"))), MessageRole::User);
        assert_eq!(MessageRole::from_loose(Some(&json!(42))), MessageRole::User);
        assert_eq!(
            MessageRole::from_loose(Some(&json!("assistant"))),
            MessageRole::Assistant
        );
    }

    #[test]
    fn blank_titles_get_the_default() {
        assert_eq!(conversation_title(None), DEFAULT_CONVERSATION_TITLE);
        assert_eq!(conversation_title(Some("")), DEFAULT_CONVERSATION_TITLE);
        assert_eq!(conversation_title(Some("  \t\n")), DEFAULT_CONVERSATION_TITLE);
        assert_eq!(conversation_title(Some("  Trip plans ")), "Trip plans");
    }

    #[test]
    fn conversation_detail_serializes_flat_with_messages() {
        let now = Utc::now();
        let detail = ConversationWithMessages {
            conversation: Conversation {
                id: "c1".into(),
                title: "Hello".into(),
                created_at: now,
                updated_at: now,
            },
            messages: vec![Message {
                id: "m1".into(),
                conversation_id: "c1".into(),
                role: MessageRole::Assistant,
                content: "hi".into(),
                created_at: now,
            }],
        };

        let value = serde_json::to_value(&detail).expect("serialize");
        assert_eq!(value["id"], "c1");
        assert!(value["createdAt"].is_string());
        assert!(value["updatedAt"].is_string());
        assert_eq!(value["messages"][0]["conversationId"], "c1");
        assert_eq!(value["messages"][0]["role"], "assistant");
    }
}
