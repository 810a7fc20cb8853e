//! Credential persistence: one small JSON file per credential in the config directory.
//!
//! Layout: `instruction.json` holds `{"instruction": ...}`, `telegram_token.json` and
//! `gemini_token.json` hold `{"token": ...}`. A missing file means "not set".

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Which persisted value to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Telegram bot token.
    ChatToken,
    /// Gemini API key.
    ModelKey,
    /// Report instruction (prompt) sent with every screenshot.
    Instruction,
}

impl CredentialKind {
    pub fn file_name(self) -> &'static str {
        match self {
            CredentialKind::ChatToken => "telegram_token.json",
            CredentialKind::ModelKey => "gemini_token.json",
            CredentialKind::Instruction => "instruction.json",
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            CredentialKind::ChatToken | CredentialKind::ModelKey => "token",
            CredentialKind::Instruction => "instruction",
        }
    }

    /// Environment variable that overrides the stored value, if any.
    pub fn env_var(self) -> Option<&'static str> {
        match self {
            CredentialKind::ChatToken => Some("TELEGRAM_BOT_TOKEN"),
            CredentialKind::ModelKey => Some("GEMINI_API_KEY"),
            CredentialKind::Instruction => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: invalid json: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes credential files under one directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: CredentialKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Load the stored value. Missing file, missing field, or an empty string all yield `None`.
    pub fn load(&self, kind: CredentialKind) -> Result<Option<String>, CredentialError> {
        let path = self.path(kind);
        let s = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CredentialError::Io { path, source }),
        };
        let value: Value =
            serde_json::from_str(&s).map_err(|source| CredentialError::Json { path, source })?;
        Ok(value
            .get(kind.field())
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string))
    }

    /// Write `{"<field>": value}` as pretty JSON, creating the directory if needed.
    pub fn save(&self, kind: CredentialKind, value: &str) -> Result<(), CredentialError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CredentialError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(kind);
        let mut obj = Map::new();
        obj.insert(kind.field().to_string(), Value::String(value.to_string()));
        let body = serde_json::to_string_pretty(&Value::Object(obj)).map_err(|source| {
            CredentialError::Json {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, body).map_err(|source| CredentialError::Io { path, source })?;
        log::debug!("credentials: saved {}", kind.file_name());
        Ok(())
    }

    /// Remove the stored value. Clearing something that was never saved succeeds.
    pub fn clear(&self, kind: CredentialKind) -> Result<(), CredentialError> {
        let path = self.path(kind);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("credentials: cleared {}", kind.file_name());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CredentialError::Io { path, source }),
        }
    }

    /// Resolve a value for use: the environment override (when set and non-empty) wins over the file.
    /// Read errors are logged and treated as "not set".
    pub fn resolve(&self, kind: CredentialKind) -> Option<String> {
        kind.env_var()
            .and_then(|var| std::env::var(var).ok())
            .and_then(|s| {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            })
            .or_else(|| match self.load(kind) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("credentials: failed to load {}: {}", kind.file_name(), e);
                    None
                }
            })
    }
}
