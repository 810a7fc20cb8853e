//! Lookout core library: screenshot reports delivered through a Telegram bot.
//!
//! The bot captures the screen, asks a vision model to describe it following a saved
//! instruction, and replies with the screenshot captioned by the report.

pub mod bot;
pub mod capture;
pub mod channels;
pub mod config;
pub mod credentials;
pub mod llm;
pub mod markup;
pub mod report;
pub mod settings;
