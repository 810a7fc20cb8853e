//! The generate-report pipeline: checks, capture, model report, caption, photo reply.
//!
//! Every failure ends in a chat reply; nothing here returns an error to the polling loop.

use std::sync::Arc;

use crate::capture::ScreenCapturer;
use crate::channels::{ChatClient, ParseMode};
use crate::markup;
use crate::report::{ReportGenerator, ERROR_MARKER};
use crate::settings::SharedSettings;

pub const MISSING_KEY_MESSAGE: &str =
    "❌ Gemini API token not saved. Use the desktop app to save it.";
pub const MISSING_INSTRUCTION_MESSAGE: &str =
    "❌ Instruction not saved. Use the desktop app to save it.";
pub const PROGRESS_MESSAGE: &str = "🤖 Taking a screenshot and sending it to Gemini...";
pub const CAPTURE_FAILED_MESSAGE: &str = "❌ Error: failed to capture screenshot.";

/// Per-invocation inputs, fixed before the model is called.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub chat_id: i64,
    pub instruction: String,
    pub screenshot: Vec<u8>,
}

/// Capturer, generator and the live settings they read.
pub struct ReportPipeline {
    settings: SharedSettings,
    capturer: Arc<dyn ScreenCapturer>,
    generator: ReportGenerator,
}

impl ReportPipeline {
    pub fn new(
        settings: SharedSettings,
        capturer: Arc<dyn ScreenCapturer>,
        generator: ReportGenerator,
    ) -> Self {
        Self {
            settings,
            capturer,
            generator,
        }
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Run the whole pipeline for one chat.
    pub async fn run(&self, client: &dyn ChatClient, chat_id: i64) {
        let snapshot = self.settings.snapshot();
        let Some(api_key) = snapshot.model_key else {
            reply(client, chat_id, MISSING_KEY_MESSAGE).await;
            return;
        };
        let Some(instruction) = snapshot.instruction else {
            reply(client, chat_id, MISSING_INSTRUCTION_MESSAGE).await;
            return;
        };

        reply(client, chat_id, PROGRESS_MESSAGE).await;

        let Some(screenshot) = self.capture().await else {
            reply(client, chat_id, CAPTURE_FAILED_MESSAGE).await;
            return;
        };
        let request = ReportRequest {
            chat_id,
            instruction,
            screenshot,
        };
        self.deliver(client, &api_key, request).await;
    }

    async fn capture(&self) -> Option<Vec<u8>> {
        let capturer = Arc::clone(&self.capturer);
        match tokio::task::spawn_blocking(move || capturer.capture()).await {
            Ok(shot) => shot,
            Err(e) => {
                log::warn!("bot: capture task failed: {}", e);
                None
            }
        }
    }

    async fn deliver(&self, client: &dyn ChatClient, api_key: &str, request: ReportRequest) {
        let report = self
            .generator
            .generate(api_key, &request.screenshot, &request.instruction)
            .await;
        let caption = markup::caption_from_report(&report);
        let ReportRequest {
            chat_id,
            screenshot,
            ..
        } = request;
        if let Err(e) = client
            .send_photo(chat_id, screenshot, &caption, Some(ParseMode::MarkdownV2))
            .await
        {
            log::warn!("bot: sendPhoto to chat {} failed: {}", chat_id, e);
            let text = format!("{} Failed to send report: {}", ERROR_MARKER, e);
            reply(client, chat_id, &text).await;
        }
    }
}

/// Plain text reply; a failure here has nowhere left to go but the log.
pub(crate) async fn reply(client: &dyn ChatClient, chat_id: i64, text: &str) {
    if let Err(e) = client.send_text(chat_id, text, None).await {
        log::warn!("bot: sendMessage to chat {} failed: {}", chat_id, e);
    }
}
