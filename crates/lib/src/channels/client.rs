//! Chat client trait: the operations the bot worker needs from a chat platform.

use async_trait::async_trait;
use std::sync::Arc;

use crate::channels::inbound::InboundMessage;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("telegram request failed: {0}")]
    Request(reqwest::Error),
    #[error("telegram api error: {status} {description}")]
    Api { status: u16, description: String },
    #[error("telegram bot token not configured")]
    MissingToken,
}

impl From<reqwest::Error> for ChannelError {
    /// The request URL embeds the bot token, so it is dropped from transport errors.
    fn from(e: reqwest::Error) -> Self {
        ChannelError::Request(e.without_url())
    }
}

impl ChannelError {
    /// Errors that retrying cannot fix: bad token (401/404) or another poller on the same token (409).
    pub fn is_fatal(&self) -> bool {
        match self {
            ChannelError::Api { status, .. } => matches!(status, 401 | 404 | 409),
            ChannelError::MissingToken => true,
            ChannelError::Request(_) => false,
        }
    }
}

/// Telegram message parse mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    MarkdownV2,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// Persistent reply keyboard shown under the input field (one button per row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub buttons: Vec<String>,
    pub resize: bool,
}

impl ReplyKeyboard {
    pub fn single(label: impl Into<String>) -> Self {
        Self {
            buttons: vec![label.into()],
            resize: true,
        }
    }

    /// Bot API `ReplyKeyboardMarkup` object.
    pub fn to_markup(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .buttons
            .iter()
            .map(|b| serde_json::json!([{ "text": b }]))
            .collect();
        serde_json::json!({
            "keyboard": rows,
            "resize_keyboard": self.resize,
            "is_persistent": true,
        })
    }
}

/// Connected chat client. One instance per bot session.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// One long-poll round. Returns the text messages received and the offset for the next call.
    /// Returns promptly with no messages once [`ChatClient::stop_polling`] has been called.
    async fn poll_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<InboundMessage>, Option<i64>), ChannelError>;

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&ReplyKeyboard>,
    ) -> Result<(), ChannelError>;

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        caption: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), ChannelError>;

    /// Signal the polling loop to end. Interrupts an in-flight long poll.
    fn stop_polling(&self);

    fn is_polling(&self) -> bool;
}

/// Creates a [`ChatClient`] for a bot token. Does not contact the platform.
pub trait ChatConnector: Send + Sync {
    fn connect(&self, token: &str) -> Result<Arc<dyn ChatClient>, ChannelError>;
}
