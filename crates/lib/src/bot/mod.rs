//! Telegram bot: command dispatch, the report pipeline, the polling worker and its lifecycle.

mod dispatch;
mod lifecycle;
mod pipeline;
mod worker;

use std::sync::Arc;

use crate::capture::DisplayCapturer;
use crate::channels::TelegramConnector;
use crate::config::Config;
use crate::llm::GeminiClient;
use crate::report::ReportGenerator;
use crate::settings::SharedSettings;

pub use dispatch::{BotCommand, Dispatcher, REPORT_BUTTON};
pub use lifecycle::{BotController, BotState, LifecycleError, StopOutcome, DEFAULT_STOP_TIMEOUT};
pub use pipeline::{
    ReportPipeline, ReportRequest, CAPTURE_FAILED_MESSAGE, MISSING_INSTRUCTION_MESSAGE,
    MISSING_KEY_MESSAGE, PROGRESS_MESSAGE,
};
pub use worker::{spawn_worker, BotWorker, WorkerHandle, WELCOME_MESSAGE};

/// Controller wired to Telegram, Gemini and the local display.
pub fn build_controller(config: &Config, settings: SharedSettings) -> BotController {
    let model = Arc::new(GeminiClient::new(Some(config.model.api_base.clone())));
    let generator = ReportGenerator::new(model, config.model.name.clone());
    let pipeline = ReportPipeline::new(settings, Arc::new(DisplayCapturer), generator);
    BotController::new(
        Arc::new(TelegramConnector::new(&config.telegram)),
        Arc::new(pipeline),
    )
    .with_stop_timeout(config.bot.stop_timeout())
}
