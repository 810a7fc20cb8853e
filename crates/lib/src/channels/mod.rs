//! Communication channels (Telegram).
//!
//! [`ChatClient`] is the seam between the bot worker and the chat platform; [`ChatConnector`]
//! creates a client for a token. The Telegram implementation long-polls getUpdates and sends
//! replies through the Bot API.

mod client;
mod inbound;
mod telegram;

pub use client::{ChannelError, ChatClient, ChatConnector, ParseMode, ReplyKeyboard};
pub use inbound::InboundMessage;
pub use telegram::{TelegramChannel, TelegramConnector, TelegramUpdate};
