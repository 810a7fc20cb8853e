//! Stub collaborators for pipeline and lifecycle tests: chat client, connector, capturer, model.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use lib::bot::ReportPipeline;
use lib::capture::ScreenCapturer;
use lib::channels::{
    ChannelError, ChatClient, ChatConnector, InboundMessage, ParseMode, ReplyKeyboard,
};
use lib::llm::{FragmentStream, LlmError, ModelClient, Part};
use lib::report::ReportGenerator;
use lib::settings::SharedSettings;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<ReplyKeyboard>,
    },
    Photo {
        chat_id: i64,
        photo: Vec<u8>,
        caption: String,
        parse_mode: Option<ParseMode>,
    },
}

impl Sent {
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Text { text, .. } => Some(text),
            Sent::Photo { .. } => None,
        }
    }

    pub fn is_photo(&self) -> bool {
        matches!(self, Sent::Photo { .. })
    }
}

/// Behavior of the clients a [`StubConnector`] hands out.
#[derive(Debug, Clone, Default)]
pub struct StubOptions {
    /// Batches returned by successive polls (first client only).
    pub batches: Vec<Vec<InboundMessage>>,
    /// How long each poll takes; not interrupted by stop.
    pub poll_delay: Duration,
    /// First poll fails with this API status.
    pub poll_error_status: Option<u16>,
    pub fail_photo: bool,
}

pub struct StubChat {
    pub token: String,
    events: Arc<Mutex<Vec<String>>>,
    sent: Mutex<Vec<Sent>>,
    polling: AtomicBool,
    inbox: Mutex<VecDeque<Vec<InboundMessage>>>,
    poll_error_status: Mutex<Option<u16>>,
    poll_delay: Duration,
    fail_photo: bool,
}

impl StubChat {
    pub fn new(token: &str, events: Arc<Mutex<Vec<String>>>, options: StubOptions) -> Self {
        Self {
            token: token.to_string(),
            events,
            sent: Mutex::new(Vec::new()),
            polling: AtomicBool::new(true),
            inbox: Mutex::new(options.batches.into_iter().collect()),
            poll_error_status: Mutex::new(options.poll_error_status),
            poll_delay: options.poll_delay,
            fail_photo: options.fail_photo,
        }
    }

    pub fn standalone() -> Self {
        Self::new("stub", Arc::new(Mutex::new(Vec::new())), StubOptions::default())
    }

    pub fn failing_photos() -> Self {
        Self::new(
            "stub",
            Arc::new(Mutex::new(Vec::new())),
            StubOptions {
                fail_photo: true,
                ..StubOptions::default()
            },
        )
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|s| s.text().map(str::to_string))
            .collect()
    }

    pub fn photos(&self) -> Vec<Sent> {
        self.sent().into_iter().filter(Sent::is_photo).collect()
    }
}

#[async_trait]
impl ChatClient for StubChat {
    async fn poll_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<InboundMessage>, Option<i64>), ChannelError> {
        let error_status = self.poll_error_status.lock().unwrap().take();
        if let Some(status) = error_status {
            return Err(ChannelError::Api {
                status,
                description: "getUpdates failed: stub".to_string(),
            });
        }
        let delay = if self.poll_delay.is_zero() {
            Duration::from_millis(5)
        } else {
            self.poll_delay
        };
        tokio::time::sleep(delay).await;
        let batch = self.inbox.lock().unwrap().pop_front().unwrap_or_default();
        let next = batch.iter().map(|m| m.update_id).max().map(|id| id + 1);
        Ok((batch, next.or(offset)))
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&ReplyKeyboard>,
    ) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        caption: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), ChannelError> {
        if self.fail_photo {
            return Err(ChannelError::Api {
                status: 400,
                description: "sendPhoto failed: Bad Request: can't parse entities".to_string(),
            });
        }
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            photo,
            caption: caption.to_string(),
            parse_mode,
        });
        Ok(())
    }

    fn stop_polling(&self) {
        self.events
            .lock()
            .unwrap()
            .push(format!("stop:{}", self.token));
        self.polling.store(false, Ordering::SeqCst);
    }

    fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }
}

/// Hands out [`StubChat`]s and records connect/stop order.
pub struct StubConnector {
    pub events: Arc<Mutex<Vec<String>>>,
    clients: Mutex<Vec<Arc<StubChat>>>,
    options: StubOptions,
}

impl StubConnector {
    pub fn new(options: StubOptions) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            clients: Mutex::new(Vec::new()),
            options,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clients(&self) -> Vec<Arc<StubChat>> {
        self.clients.lock().unwrap().clone()
    }
}

impl ChatConnector for StubConnector {
    fn connect(&self, token: &str) -> Result<Arc<dyn ChatClient>, ChannelError> {
        self.events.lock().unwrap().push(format!("connect:{}", token));
        let mut clients = self.clients.lock().unwrap();
        let options = if clients.is_empty() {
            self.options.clone()
        } else {
            StubOptions {
                batches: Vec::new(),
                ..self.options.clone()
            }
        };
        let client = Arc::new(StubChat::new(token, Arc::clone(&self.events), options));
        clients.push(Arc::clone(&client));
        let client: Arc<dyn ChatClient> = client;
        Ok(client)
    }
}

pub struct StubCapturer {
    shot: Option<Vec<u8>>,
    pub calls: AtomicUsize,
}

impl StubCapturer {
    pub fn returning(shot: Option<Vec<u8>>) -> Self {
        Self {
            shot,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScreenCapturer for StubCapturer {
    fn capture(&self) -> Option<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.shot.clone()
    }
}

/// Model that streams fixed fragments, optionally followed by an error.
pub struct StubModel {
    fragments: Vec<String>,
    error: Option<String>,
    pub instructions: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            error: None,
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fragments: Vec::new(),
            error: Some(message.to_string()),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.instructions.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for StubModel {
    async fn stream_generate(
        &self,
        _api_key: &str,
        _model: &str,
        parts: Vec<Part>,
    ) -> Result<FragmentStream, LlmError> {
        let instruction = parts
            .iter()
            .find_map(|p| match p {
                Part::Text(t) => Some(t.clone()),
                Part::Blob { .. } => None,
            })
            .unwrap_or_default();
        self.instructions.lock().unwrap().push(instruction);
        let mut items: Vec<Result<String, LlmError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        if let Some(e) = &self.error {
            items.push(Err(LlmError::Api(e.clone())));
        }
        Ok(stream::iter(items).boxed())
    }
}

pub fn settings(key: Option<&str>, instruction: Option<&str>) -> SharedSettings {
    SharedSettings::new(key.map(str::to_string), instruction.map(str::to_string))
}

pub fn pipeline(
    settings: SharedSettings,
    capturer: Arc<StubCapturer>,
    model: Arc<StubModel>,
) -> Arc<ReportPipeline> {
    Arc::new(ReportPipeline::new(
        settings,
        capturer,
        ReportGenerator::new(model, "gemini-2.0-flash"),
    ))
}

pub fn message(update_id: i64, chat_id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        update_id,
        chat_id,
        text: text.to_string(),
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}
