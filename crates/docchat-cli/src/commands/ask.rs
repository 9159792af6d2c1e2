// One-shot question with optional attachments

use std::path::PathBuf;

use anyhow::{bail, Result};
use docchat_core::document::DocumentStore;
use docchat_core::message::ChatMessage;
use docchat_core::session::SessionState;

use crate::runtime::Runtime;
use crate::status::CliStatusSink;

pub async fn run(question: &str, files: &[PathBuf]) -> Result<()> {
    let runtime = Runtime::from_env()?;
    let mut session = SessionState::new();
    let status = CliStatusSink;

    let mut new_docs = DocumentStore::new();
    for path in files {
        super::attach_file(&runtime, &mut session, path, &mut new_docs, &status).await?;
    }

    session.push_message(ChatMessage::user(question));
    match runtime
        .driver
        .send_turn(
            &mut session,
            &runtime.config.assistant_id,
            question,
            &new_docs,
            &status,
        )
        .await
    {
        Some(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        None => bail!("no reply received; check the logs for details"),
    }
}
