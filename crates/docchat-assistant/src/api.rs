// Conversation API seam
//
// The turn driver depends on this narrow trait rather than on a concrete
// HTTP client, so polling and recovery logic is testable with a scripted
// implementation. The wire types mirror the remote assistants API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// Handle to a remote conversation thread
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Status vocabulary of a remote run
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunStatus {
    /// Whether the run has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Error details the remote side attaches to a failed run
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One remote execution of the assistant against a thread
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Inline citation marker within assistant text
#[derive(Debug, Clone, Deserialize)]
pub struct Annotation {
    /// The literal text span the annotation replaces
    pub text: String,
    #[serde(default)]
    pub file_citation: Option<FileCitation>,
}

/// File reference carried by an annotation
#[derive(Debug, Clone, Deserialize)]
pub struct FileCitation {
    pub file_id: String,
}

/// Text block of a thread message
#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// One content part of a thread message
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum MessageContent {
    #[serde(rename = "text")]
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

/// A message stored on a remote thread
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Plain text message for tests and fixtures
    pub fn text(id: impl Into<String>, role: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: value.into(),
                    annotations: Vec::new(),
                },
            }],
        }
    }
}

/// The five-plus-one operations the turn driver needs from the remote
/// conversation service
#[async_trait]
pub trait ThreadsApi: Send + Sync {
    /// Create a new conversation thread
    async fn create_thread(&self) -> Result<Thread>;

    /// Fetch an existing thread (used to verify creation)
    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread>;

    /// Append a message to a thread
    async fn create_message(&self, thread_id: &str, role: &str, content: &str)
        -> Result<ThreadMessage>;

    /// Launch a run of the assistant against a thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List a thread's messages, newest first
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;
}
