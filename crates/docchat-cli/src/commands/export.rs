// Offline transcript export
//
// Needs no credentials; works on a JSON transcript produced by
// `docchat chat --transcript` (a message list) or a full session dump.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docchat_core::message::ChatMessage;
use docchat_core::session::SessionState;
use docchat_export::{export_file_name, ChatExporter, ExportOptions};

pub fn run(transcript: &Path, out: Option<PathBuf>) -> Result<()> {
    let data = std::fs::read_to_string(transcript)
        .with_context(|| format!("could not read {}", transcript.display()))?;
    let messages: Vec<ChatMessage> = match serde_json::from_str(&data) {
        Ok(messages) => messages,
        Err(_) => {
            let session: SessionState = serde_json::from_str(&data)
                .context("transcript is neither a message list nor a session dump")?;
            session.messages
        }
    };

    let options = ExportOptions::default();
    let (bytes, format) = ChatExporter::new().export(&messages, &options);
    let path = out
        .unwrap_or_else(|| PathBuf::from(export_file_name(&options, format)))
        .with_extension(format.file_extension());
    std::fs::write(&path, &bytes)
        .with_context(|| format!("could not write {}", path.display()))?;
    println!("wrote {} ({})", path.display(), format.tag());
    Ok(())
}
