// docchat-assistant: conversation orchestration
//
// Talks to the remote assistants service: thread lifecycle, run polling
// under a wall-clock budget, and citation resolution for replies.

pub mod api;
pub mod citations;
pub mod client;
pub mod error;
pub mod turn;

pub use api::{Run, RunStatus, Thread, ThreadMessage, ThreadsApi};
pub use citations::process_message_with_citations;
pub use client::OpenAiThreadsClient;
pub use error::{AssistantError, Result};
pub use turn::{TurnDriver, TurnOptions};
