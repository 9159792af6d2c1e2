// HTTP implementation of the conversation API
//
// Bearer-token client against the remote assistants endpoints. Every call
// checks the status code and surfaces the response body on failure; the
// retry and recovery policy lives in the turn driver, not here.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::{Run, Thread, ThreadMessage, ThreadsApi};
use crate::error::{AssistantError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Wire shape of a message-list response
#[derive(Debug, serde::Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

/// reqwest-backed client for the assistants API
pub struct OpenAiThreadsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiThreadsClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?;
        Self::handle(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .json(&body)
            .send()
            .await?;
        Self::handle(response).await
    }

    async fn handle<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ThreadsApi for OpenAiThreadsClient {
    async fn create_thread(&self) -> Result<Thread> {
        self.post("/threads", json!({})).await
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread> {
        self.get(&format!("/threads/{thread_id}")).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<ThreadMessage> {
        self.post(
            &format!("/threads/{thread_id}/messages"),
            json!({ "role": role, "content": content }),
        )
        .await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        self.post(
            &format!("/threads/{thread_id}/runs"),
            json!({ "assistant_id": assistant_id }),
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.get(&format!("/threads/{thread_id}/runs/{run_id}")).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let list: MessageList = self.get(&format!("/threads/{thread_id}/messages")).await?;
        Ok(list.data)
    }
}
