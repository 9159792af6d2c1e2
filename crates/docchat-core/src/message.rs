// Conversation log entries
//
// Messages are appended to the session log and never mutated. Assistant
// messages carry the remote message id so the turn driver can skip
// already-seen responses.

use serde::{Deserialize, Serialize};

/// Author of a conversation message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry in the ordered conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Remote message id (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            id: None,
        }
    }

    /// Create an assistant message with its remote id
    pub fn assistant(content: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            id: Some(id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert!(msg.id.is_none());
    }

    #[test]
    fn test_assistant_message() {
        let msg = ChatMessage::assistant("Hi there!", "msg_123");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.id.as_deref(), Some("msg_123"));
    }
}
