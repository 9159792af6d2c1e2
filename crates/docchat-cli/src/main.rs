// Docchat CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Interactive chat owns the session; one-shot `ask` and
// offline `export` are separate subcommands for scripting.

mod commands;
mod runtime;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Chat with your documents: OCR-backed ingestion plus assistant Q&A")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat session with document commands
    Chat {
        /// Save the conversation log as JSON on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Ask a single question, optionally attaching files first
    Ask {
        /// Question text
        question: String,

        /// Files to process and attach as context (repeatable)
        #[arg(long, short)]
        file: Vec<PathBuf>,
    },

    /// Export a saved transcript to PDF (markdown if all renderers fail)
    Export {
        /// JSON transcript: a message list or a session dump
        transcript: PathBuf,

        /// Output path; the extension follows the produced format
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docchat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Chat { transcript } => commands::chat::run(transcript).await,
        Commands::Ask { question, file } => commands::ask::run(&question, &file).await,
        Commands::Export { transcript, out } => commands::export::run(&transcript, out),
    }
}
