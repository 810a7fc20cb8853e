//! Inbound message from a channel: one text message received in one chat.

/// A text message delivered to the bot, tagged with its chat and update id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: String,
}
