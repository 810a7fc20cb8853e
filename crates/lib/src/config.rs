//! Configuration types and loading.
//!
//! Config is loaded from `config.json` in the config directory (e.g. `~/.lookout/config.json`).
//! Every field has a default, so a missing file is a valid configuration. Credentials are not
//! stored here; see [`crate::credentials`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Vision model endpoint and model name.
    #[serde(default)]
    pub model: ModelConfig,

    /// Bot worker lifecycle settings.
    #[serde(default)]
    pub bot: BotConfig,
}

/// Telegram Bot API endpoint and long-poll settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot API base URL (default "https://api.telegram.org").
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Seconds Telegram holds a getUpdates request open (default 30).
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

/// Generative Language API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// API base URL (default "https://generativelanguage.googleapis.com").
    #[serde(default = "default_model_api_base")]
    pub api_base: String,

    /// Vision-capable model id (default "gemini-2.0-flash").
    #[serde(default = "default_model_name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Upper bound for waiting on the worker thread when stopping (default 5).
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_model_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model_name() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    5
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_model_api_base(),
            name: default_model_name(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl BotConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Resolve the config directory: env LOOKOUT_CONFIG_DIR, else `~/.lookout`, else the working directory.
pub fn default_config_dir() -> PathBuf {
    std::env::var("LOOKOUT_CONFIG_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".lookout"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
}

/// Path of `config.json` inside the given config directory.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join("config.json")
}

/// Load config from `config.json` in the given directory (or the default one). Missing file => default config.
/// Returns the config and the directory that was used (credentials live next to it).
pub fn load_config(config_dir: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let dir = config_dir.unwrap_or_else(default_config_dir);
    let path = config_path(&dir);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, dir))
}
