// Conversation turn driver
//
// Drives one remote exchange to completion: enrich the prompt with document
// context, post the user message, launch a run, poll it under a wall-clock
// budget, and pick up the newest unseen assistant message. Every failure is
// caught, logged, and reported through the status sink; the caller only ever
// sees an Option.

use std::time::{Duration, Instant};

use docchat_core::context::build_prompt;
use docchat_core::document::DocumentStore;
use docchat_core::message::ChatMessage;
use docchat_core::session::SessionState;
use docchat_core::status::{Phase, StatusSink};

use crate::api::{Run, RunStatus, ThreadsApi};
use crate::citations::process_message_with_citations;
use crate::error::Result;

/// Timing knobs for one turn; defaults match the production cadence
#[derive(Debug, Clone)]
pub struct TurnOptions {
    /// Pause between poll ticks
    pub poll_interval: Duration,
    /// Remote status is re-fetched every this many ticks
    pub status_refresh_every: u32,
    /// Wall-clock budget for the whole run
    pub run_budget: Duration,
    /// Pause before the single retry of message/run creation
    pub create_retry_pause: Duration,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            status_refresh_every: 2,
            run_budget: Duration::from_secs(120),
            create_retry_pause: Duration::from_secs(2),
        }
    }
}

/// Executes conversation turns against a [`ThreadsApi`]
pub struct TurnDriver<A> {
    api: A,
    options: TurnOptions,
}

impl<A: ThreadsApi> TurnDriver<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            options: TurnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }

    /// Create a conversation thread and verify it can be fetched back
    pub async fn initialize_thread(&self) -> Result<String> {
        let thread = self.api.create_thread().await?;
        tracing::info!(thread_id = %thread.id, "thread created");

        // A thread we cannot retrieve is useless; fail early
        let verified = self.api.retrieve_thread(&thread.id).await?;
        Ok(verified.id)
    }

    /// Execute one conversation turn
    ///
    /// Returns the assistant's reply, or None on any failure or timeout.
    /// The session's document store is updated with `new_docs` before the
    /// prompt is built, so later turns see cumulative context.
    pub async fn send_turn(
        &self,
        session: &mut SessionState,
        assistant_id: &str,
        prompt: &str,
        new_docs: &DocumentStore,
        status: &dyn StatusSink,
    ) -> Option<ChatMessage> {
        let full_prompt = build_prompt(prompt, &mut session.documents, new_docs);

        let thread_id = match &session.thread_id {
            Some(id) => id.clone(),
            None => match self.initialize_thread().await {
                Ok(id) => {
                    session.thread_id = Some(id.clone());
                    id
                }
                Err(e) => {
                    tracing::error!("could not initialize conversation thread: {e}");
                    status.update(Phase::Error, "Could not start the conversation");
                    return None;
                }
            },
        };

        if self
            .create_message_with_retry(&thread_id, &full_prompt)
            .await
            .is_none()
        {
            status.update(Phase::Error, "Could not send the message");
            return None;
        }

        let run = match self.create_run_with_retry(&thread_id, assistant_id).await {
            Some(run) => run,
            None => {
                status.update(Phase::Error, "Could not start the assistant run");
                return None;
            }
        };

        let run = match self.poll_run(&thread_id, run, status).await {
            Some(run) => run,
            None => return None,
        };

        if run.status != RunStatus::Completed {
            status.update(Phase::Error, &format!("Final run state: {}", run.status));
            return None;
        }
        status.update(Phase::Complete, "Analysis complete");

        self.newest_unseen_reply(&thread_id, session).await
    }

    async fn create_message_with_retry(&self, thread_id: &str, content: &str) -> Option<()> {
        for attempt in 0..2 {
            match self.api.create_message(thread_id, "user", content).await {
                Ok(_) => return Some(()),
                Err(e) if attempt == 0 => {
                    tracing::warn!("error creating message (attempt 1): {e}, retrying");
                    tokio::time::sleep(self.options.create_retry_pause).await;
                }
                Err(e) => {
                    tracing::error!("error creating message: {e}");
                }
            }
        }
        None
    }

    async fn create_run_with_retry(&self, thread_id: &str, assistant_id: &str) -> Option<Run> {
        for attempt in 0..2 {
            match self.api.create_run(thread_id, assistant_id).await {
                Ok(run) => return Some(run),
                Err(e) if attempt == 0 => {
                    tracing::warn!("error creating run (attempt 1): {e}, retrying");
                    tokio::time::sleep(self.options.create_retry_pause).await;
                }
                Err(e) => {
                    tracing::error!("error creating run: {e}");
                }
            }
        }
        None
    }

    /// Poll the run until it is terminal or the wall-clock budget runs out
    ///
    /// No cancellation is issued on timeout; the remote run is left in
    /// whatever state it was last observed.
    async fn poll_run(&self, thread_id: &str, mut run: Run, status: &dyn StatusSink) -> Option<Run> {
        let start = Instant::now();
        let mut tick: u32 = 0;

        while !run.status.is_terminal() {
            tick += 1;
            tokio::time::sleep(self.options.poll_interval).await;

            if start.elapsed() > self.options.run_budget {
                tracing::error!(
                    budget_secs = self.options.run_budget.as_secs(),
                    "timed out waiting for run completion"
                );
                status.update(
                    Phase::Error,
                    "The operation is taking too long. Please try again.",
                );
                return None;
            }

            // Refresh from the remote side only every Nth tick to bound
            // request volume; a transient fetch failure keeps the last
            // observed status
            if tick % self.options.status_refresh_every == 0 {
                match self.api.retrieve_run(thread_id, &run.id).await {
                    Ok(updated) => run = updated,
                    Err(e) => {
                        tracing::warn!("error refreshing run status: {e}");
                    }
                }
            }

            match run.status {
                RunStatus::InProgress => {
                    status.update(Phase::Running, "Processing the query...");
                }
                RunStatus::RequiresAction => {
                    status.update(Phase::Running, "Performing required actions...");
                }
                _ => {}
            }

            if run.status == RunStatus::Failed {
                let detail = run
                    .last_error
                    .as_ref()
                    .and_then(|e| e.message.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::error!("run failed: {detail}");
                status.update(Phase::Error, "Error while processing");
                return None;
            }
        }

        Some(run)
    }

    /// Newest assistant message not yet present in the local log
    async fn newest_unseen_reply(
        &self,
        thread_id: &str,
        session: &SessionState,
    ) -> Option<ChatMessage> {
        let messages = match self.api.list_messages(thread_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!("error listing thread messages: {e}");
                return None;
            }
        };

        for message in &messages {
            if message.role == "assistant" && !session.has_seen_message(&message.id) {
                let content = process_message_with_citations(message, &session.file_metadata);
                return Some(ChatMessage::assistant(content, message.id.clone()));
            }
        }

        tracing::warn!("no new assistant messages found after completed run");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Thread, ThreadMessage};
    use crate::error::AssistantError;
    use async_trait::async_trait;
    use docchat_core::status::NullStatusSink;
    use std::sync::Mutex;

    /// Scripted ThreadsApi: run statuses pop off a list, message/run
    /// creation can be made to fail N times
    struct MockApi {
        statuses: Mutex<Vec<RunStatus>>,
        messages: Vec<ThreadMessage>,
        fail_message_creates: Mutex<u32>,
        fail_run_creates: Mutex<u32>,
    }

    impl MockApi {
        fn new(statuses: Vec<RunStatus>, messages: Vec<ThreadMessage>) -> Self {
            let mut statuses = statuses;
            statuses.reverse();
            Self {
                statuses: Mutex::new(statuses),
                messages,
                fail_message_creates: Mutex::new(0),
                fail_run_creates: Mutex::new(0),
            }
        }

        fn failing_message_creates(mut self, n: u32) -> Self {
            self.fail_message_creates = Mutex::new(n);
            self
        }

        fn failing_run_creates(mut self, n: u32) -> Self {
            self.fail_run_creates = Mutex::new(n);
            self
        }

        fn api_error() -> AssistantError {
            AssistantError::Api {
                status: 500,
                message: "boom".to_string(),
            }
        }
    }

    #[async_trait]
    impl ThreadsApi for MockApi {
        async fn create_thread(&self) -> Result<Thread> {
            Ok(Thread {
                id: "thread_1".to_string(),
            })
        }

        async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread> {
            Ok(Thread {
                id: thread_id.to_string(),
            })
        }

        async fn create_message(
            &self,
            _thread_id: &str,
            role: &str,
            content: &str,
        ) -> Result<ThreadMessage> {
            let mut failures = self.fail_message_creates.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Self::api_error());
            }
            Ok(ThreadMessage::text("msg_user", role, content))
        }

        async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run> {
            let mut failures = self.fail_run_creates.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Self::api_error());
            }
            Ok(Run {
                id: "run_1".to_string(),
                status: RunStatus::Queued,
                last_error: None,
            })
        }

        async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.pop().unwrap()
            } else {
                *statuses.last().expect("no scripted statuses")
            };
            Ok(Run {
                id: run_id.to_string(),
                status,
                last_error: None,
            })
        }

        async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>> {
            Ok(self.messages.clone())
        }
    }

    fn fast_options() -> TurnOptions {
        TurnOptions {
            poll_interval: Duration::from_millis(1),
            status_refresh_every: 2,
            run_budget: Duration::from_millis(100),
            create_retry_pause: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_happy_path_returns_assistant_reply() {
        let api = MockApi::new(
            vec![RunStatus::InProgress, RunStatus::Completed],
            vec![
                ThreadMessage::text("msg_2", "assistant", "the answer"),
                ThreadMessage::text("msg_1", "user", "the question"),
            ],
        );
        let driver = TurnDriver::new(api).with_options(fast_options());
        let mut session = SessionState::new();

        let reply = driver
            .send_turn(
                &mut session,
                "asst_1",
                "the question",
                &DocumentStore::new(),
                &NullStatusSink,
            )
            .await
            .expect("expected a reply");
        assert_eq!(reply.content, "the answer");
        assert_eq!(reply.id.as_deref(), Some("msg_2"));
        assert_eq!(session.thread_id.as_deref(), Some("thread_1"));
    }

    #[tokio::test]
    async fn test_stuck_run_times_out_and_returns_none() {
        let api = MockApi::new(vec![RunStatus::InProgress], vec![]);
        let driver = TurnDriver::new(api).with_options(TurnOptions {
            run_budget: Duration::from_millis(10),
            poll_interval: Duration::from_millis(1),
            ..fast_options()
        });
        let mut session = SessionState::new();

        let reply = driver
            .send_turn(
                &mut session,
                "asst_1",
                "hi",
                &DocumentStore::new(),
                &NullStatusSink,
            )
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_failed_run_returns_none() {
        let api = MockApi::new(vec![RunStatus::InProgress, RunStatus::Failed], vec![]);
        let driver = TurnDriver::new(api).with_options(fast_options());
        let mut session = SessionState::new();

        let reply = driver
            .send_turn(
                &mut session,
                "asst_1",
                "hi",
                &DocumentStore::new(),
                &NullStatusSink,
            )
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_message_create_recovers_after_one_failure() {
        let api = MockApi::new(
            vec![RunStatus::Completed],
            vec![ThreadMessage::text("msg_2", "assistant", "ok")],
        )
        .failing_message_creates(1);
        let driver = TurnDriver::new(api).with_options(fast_options());
        let mut session = SessionState::new();

        let reply = driver
            .send_turn(
                &mut session,
                "asst_1",
                "hi",
                &DocumentStore::new(),
                &NullStatusSink,
            )
            .await;
        assert!(reply.is_some());
    }

    #[tokio::test]
    async fn test_message_create_twice_failed_is_terminal() {
        let api = MockApi::new(vec![RunStatus::Completed], vec![]).failing_message_creates(2);
        let driver = TurnDriver::new(api).with_options(fast_options());
        let mut session = SessionState::new();

        let reply = driver
            .send_turn(
                &mut session,
                "asst_1",
                "hi",
                &DocumentStore::new(),
                &NullStatusSink,
            )
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_run_create_twice_failed_is_terminal() {
        let api = MockApi::new(vec![RunStatus::Completed], vec![]).failing_run_creates(2);
        let driver = TurnDriver::new(api).with_options(fast_options());
        let mut session = SessionState::new();

        let reply = driver
            .send_turn(
                &mut session,
                "asst_1",
                "hi",
                &DocumentStore::new(),
                &NullStatusSink,
            )
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_already_seen_reply_is_skipped() {
        let api = MockApi::new(
            vec![RunStatus::Completed],
            vec![ThreadMessage::text("msg_old", "assistant", "stale")],
        );
        let driver = TurnDriver::new(api).with_options(fast_options());
        let mut session = SessionState::new();
        session.push_message(ChatMessage::assistant("stale", "msg_old"));

        let reply = driver
            .send_turn(
                &mut session,
                "asst_1",
                "hi",
                &DocumentStore::new(),
                &NullStatusSink,
            )
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_document_context_written_back_to_session() {
        use docchat_core::document::{ExtractedDocument, ExtractedFormat};

        let api = MockApi::new(
            vec![RunStatus::Completed],
            vec![ThreadMessage::text("msg_2", "assistant", "ok")],
        );
        let driver = TurnDriver::new(api).with_options(fast_options());
        let mut session = SessionState::new();
        let new_docs = DocumentStore::from([(
            "notes.txt".to_string(),
            ExtractedDocument::new("contents", ExtractedFormat::Text),
        )]);

        driver
            .send_turn(&mut session, "asst_1", "hi", &new_docs, &NullStatusSink)
            .await;
        assert!(session.documents.contains_key("notes.txt"));
    }
}
