// Session state
//
// One SessionState per user session, passed by mutable reference into the
// components that need it. Multi-session hosts must give each session its
// own instance; nothing here is shared across sessions.

use crate::document::{DocumentStore, FileMetadata};
use crate::message::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counts of resources released by a session reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedResources {
    pub documents: usize,
    pub messages: usize,
}

/// All mutable state owned by one user session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Handle to the remote conversation; created once and reused while valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Processed documents available as conversation context
    #[serde(default)]
    pub documents: DocumentStore,

    /// Ordered conversation log (append-only)
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Remote file id → metadata, used for citation resolution
    #[serde(default)]
    pub file_metadata: HashMap<String, FileMetadata>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the conversation log
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Whether an assistant message with this remote id is already in the log
    pub fn has_seen_message(&self, id: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.id.as_deref() == Some(id))
    }

    /// Drop a document from the context by display name
    pub fn remove_document(&mut self, name: &str) -> bool {
        self.documents.remove(name).is_some()
    }

    /// Reset the session, keeping the thread handle
    ///
    /// Returns counts of what was released so the presentation layer can
    /// report the result.
    pub fn clear(&mut self) -> ClearedResources {
        let cleared = ClearedResources {
            documents: self.documents.len(),
            messages: self.messages.len(),
        };
        self.documents.clear();
        self.messages.clear();
        self.file_metadata.clear();
        tracing::info!(
            documents = cleared.documents,
            messages = cleared.messages,
            "session cleared"
        );
        cleared
    }
}
