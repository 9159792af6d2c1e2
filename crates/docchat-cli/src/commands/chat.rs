// Interactive chat loop
//
// Lines starting with a colon are session commands; anything else is sent
// to the assistant with the accumulated document context.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docchat_core::document::DocumentStore;
use docchat_core::message::ChatMessage;
use docchat_core::session::SessionState;
use docchat_export::{export_file_name, ExportOptions};

use crate::runtime::Runtime;
use crate::status::CliStatusSink;

const HELP: &str = "\
Commands:
  :attach <path>   process a file and add it to the context
  :docs            list attached documents
  :drop <name>     remove a document from the context
  :export [path]   export the conversation (PDF, markdown on degradation)
  :clear           reset documents and history, keep the thread
  :help            show this help
  :quit            exit";

pub async fn run(transcript: Option<PathBuf>) -> Result<()> {
    let runtime = Runtime::from_env()?;
    let mut session = SessionState::new();
    let mut new_docs = DocumentStore::new();
    let status = CliStatusSink;

    println!("docchat interactive session. :help for commands, :quit to exit.");
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(rest) = input.strip_prefix(':') {
            let mut parts = rest.splitn(2, ' ');
            let command = parts.next().unwrap_or_default();
            let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());
            match (command, arg) {
                ("quit" | "q", _) => break,
                ("help", _) => println!("{HELP}"),
                ("attach", Some(path)) => {
                    let path = Path::new(path);
                    if let Err(e) =
                        super::attach_file(&runtime, &mut session, path, &mut new_docs, &status)
                            .await
                    {
                        eprintln!("attach failed: {e}");
                    } else {
                        println!("attached; the next question will include it");
                    }
                }
                ("attach", None) => println!("usage: :attach <path>"),
                ("docs", _) => list_documents(&session, &new_docs),
                ("drop", Some(name)) => {
                    let dropped = new_docs.remove(name).is_some() | session.remove_document(name);
                    if dropped {
                        session.file_metadata.remove(name);
                        println!("dropped {name}");
                    } else {
                        println!("no document named {name}");
                    }
                }
                ("drop", None) => println!("usage: :drop <name>"),
                ("export", path) => export_conversation(&runtime, &session, path),
                ("clear", _) => {
                    new_docs.clear();
                    let cleared = session.clear();
                    println!(
                        "cleared {} documents and {} messages",
                        cleared.documents, cleared.messages
                    );
                }
                (other, _) => println!("unknown command :{other} (:help lists commands)"),
            }
            continue;
        }

        session.push_message(ChatMessage::user(input));
        let reply = runtime
            .driver
            .send_turn(
                &mut session,
                &runtime.config.assistant_id,
                input,
                &new_docs,
                &status,
            )
            .await;
        // Pending documents are merged into the session by the turn
        new_docs.clear();
        match reply {
            Some(message) => {
                println!("\n{}\n", message.content);
                session.push_message(message);
            }
            None => println!("No reply received; check the logs for details."),
        }
    }

    if let Some(path) = transcript {
        let json = serde_json::to_string_pretty(&session.messages)?;
        std::fs::write(&path, json)
            .with_context(|| format!("could not write {}", path.display()))?;
        println!("transcript saved to {}", path.display());
    }
    Ok(())
}

fn list_documents(session: &SessionState, new_docs: &DocumentStore) {
    if session.documents.is_empty() && new_docs.is_empty() {
        println!("no documents attached");
        return;
    }
    for (name, doc) in session.documents.iter().chain(new_docs.iter()) {
        let kind = session.file_metadata.get(name).and_then(|m| m.kind);
        println!("  {}", super::describe_document(name, kind, doc.text.chars().count()));
    }
}

fn export_conversation(runtime: &Runtime, session: &SessionState, path: Option<&str>) {
    if session.messages.is_empty() {
        println!("nothing to export yet");
        return;
    }
    let options = ExportOptions::default();
    let (bytes, format) = runtime.exporter.export(&session.messages, &options);
    let path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(export_file_name(&options, format)))
        .with_extension(format.file_extension());
    match std::fs::write(&path, &bytes) {
        Ok(()) => println!("wrote {} ({})", path.display(), format.tag()),
        Err(e) => eprintln!("could not write {}: {e}", path.display()),
    }
}
