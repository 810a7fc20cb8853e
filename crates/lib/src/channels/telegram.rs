//! Telegram channel: long-poll getUpdates, sendMessage and sendPhoto via Bot API.

use crate::channels::client::{ChannelError, ChatClient, ChatConnector, ParseMode, ReplyKeyboard};
use crate::channels::inbound::InboundMessage;
use crate::config::TelegramConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::watch;

const PHOTO_FILE_NAME: &str = "screenshot.png";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Text messages in a getUpdates batch and the offset that acknowledges the whole batch.
fn collect_messages(updates: Vec<TelegramUpdate>) -> (Vec<InboundMessage>, Option<i64>) {
    let next_offset = updates.iter().map(|u| u.update_id).max().map(|id| id + 1);
    let messages = updates
        .into_iter()
        .filter_map(|u| {
            let msg = u.message?;
            let text = msg.text?;
            Some(InboundMessage {
                update_id: u.update_id,
                chat_id: msg.chat.id,
                text,
            })
        })
        .collect();
    (messages, next_offset)
}

/// Creates [`TelegramChannel`]s sharing one HTTP client.
pub struct TelegramConnector {
    api_base: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramConnector {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_timeout_secs: config.poll_timeout_secs,
            client: reqwest::Client::new(),
        }
    }
}

impl ChatConnector for TelegramConnector {
    fn connect(&self, token: &str) -> Result<Arc<dyn ChatClient>, ChannelError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ChannelError::MissingToken);
        }
        Ok(Arc::new(TelegramChannel::new(
            token.to_string(),
            self.api_base.clone(),
            self.poll_timeout_secs,
            self.client.clone(),
        )))
    }
}

/// Telegram bot connection: long-polls for updates and sends replies.
pub struct TelegramChannel {
    token: String,
    api_base: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
    polling: watch::Sender<bool>,
}

impl TelegramChannel {
    pub fn new(
        token: String,
        api_base: String,
        poll_timeout_secs: u64,
        client: reqwest::Client,
    ) -> Self {
        let (polling, _) = watch::channel(true);
        Self {
            token,
            api_base,
            poll_timeout_secs,
            client,
            polling,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Decode the Bot API envelope; non-2xx or `ok: false` becomes [`ChannelError::Api`].
    async fn read_response<T: serde::de::DeserializeOwned>(
        method: &str,
        res: reqwest::Response,
    ) -> Result<Option<T>, ChannelError> {
        let status = res.status();
        let body = res.text().await?;
        let parsed: Option<ApiResponse<T>> = serde_json::from_str(&body).ok();
        match parsed {
            Some(data) if status.is_success() && data.ok => Ok(data.result),
            Some(data) => Err(ChannelError::Api {
                status: data.error_code.unwrap_or(status.as_u16()),
                description: format!(
                    "{} failed: {}",
                    method,
                    data.description.unwrap_or_default()
                ),
            }),
            None => Err(ChannelError::Api {
                status: status.as_u16(),
                description: format!("{} failed: {}", method, body),
            }),
        }
    }

    /// Call Telegram getUpdates (long poll). Returns (messages, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<InboundMessage>, Option<i64>), ChannelError> {
        let url = format!(
            "{}?timeout={}",
            self.method_url("getUpdates"),
            self.poll_timeout_secs
        );
        let url = if let Some(off) = offset {
            format!("{}&offset={}", url, off)
        } else {
            url
        };
        let res = self.client.get(&url).send().await?;
        let updates: Vec<TelegramUpdate> = Self::read_response("getUpdates", res)
            .await?
            .unwrap_or_default();
        let (messages, next) = collect_messages(updates);
        Ok((messages, next.or(offset)))
    }
}

#[async_trait]
impl ChatClient for TelegramChannel {
    async fn poll_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<InboundMessage>, Option<i64>), ChannelError> {
        let mut polling = self.polling.subscribe();
        if !*polling.borrow_and_update() {
            return Ok((Vec::new(), offset));
        }
        tokio::select! {
            _ = polling.changed() => {
                log::debug!("telegram: long poll interrupted by stop");
                Ok((Vec::new(), offset))
            }
            res = self.get_updates(offset) => res,
        }
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&ReplyKeyboard>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": text });
        if let Some(k) = keyboard {
            body["reply_markup"] = k.to_markup();
        }
        let res = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;
        Self::read_response::<serde_json::Value>("sendMessage", res).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        caption: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), ChannelError> {
        let size = photo.len();
        let part = Part::bytes(photo)
            .file_name(PHOTO_FILE_NAME)
            .mime_str("image/png")?;
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", part)
            .text("caption", caption.to_string());
        if let Some(mode) = parse_mode {
            form = form.text("parse_mode", mode.as_str());
        }
        let res = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        Self::read_response::<serde_json::Value>("sendPhoto", res).await?;
        log::info!("telegram: photo sent to chat {} ({} bytes)", chat_id, size);
        Ok(())
    }

    fn stop_polling(&self) {
        self.polling.send_replace(false);
    }

    fn is_polling(&self) -> bool {
        *self.polling.borrow()
    }
}
