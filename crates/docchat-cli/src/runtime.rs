// Shared wiring for CLI commands

use anyhow::{Context, Result};
use docchat_assistant::{OpenAiThreadsClient, TurnDriver};
use docchat_core::config::Config;
use docchat_export::ChatExporter;
use docchat_ocr::{DocumentPipeline, HttpOcrTransport};

/// Everything a command needs to talk to the remote services
pub struct Runtime {
    pub config: Config,
    pub pipeline: DocumentPipeline<HttpOcrTransport>,
    pub driver: TurnDriver<OpenAiThreadsClient>,
    pub exporter: ChatExporter,
}

impl Runtime {
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env().context("configuration error")?;
        let pipeline = DocumentPipeline::new(
            config.ocr_api_key.clone(),
            config.ocr_base_url.as_deref(),
        )
        .context("could not create OCR client")?;
        let client = OpenAiThreadsClient::new(
            config.openai_api_key.clone(),
            config.openai_base_url.as_deref(),
        );
        Ok(Self {
            pipeline,
            driver: TurnDriver::new(client),
            exporter: ChatExporter::new(),
            config,
        })
    }
}
