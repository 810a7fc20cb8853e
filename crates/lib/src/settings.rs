//! Values shared between the configuration surface and the bot worker.
//!
//! The configuration surface writes; each report request reads one consistent snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use crate::credentials::{CredentialKind, CredentialStore};

/// Settings the report pipeline needs at request time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSettings {
    pub model_key: Option<String>,
    pub instruction: Option<String>,
}

/// Cloneable handle to the live [`ReportSettings`].
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<ReportSettings>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SharedSettings {
    pub fn new(model_key: Option<String>, instruction: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ReportSettings {
                model_key: non_empty(model_key),
                instruction: non_empty(instruction),
            })),
        }
    }

    /// Seed from the credential store (environment overrides included).
    pub fn from_store(store: &CredentialStore) -> Self {
        Self::new(
            store.resolve(CredentialKind::ModelKey),
            store.resolve(CredentialKind::Instruction),
        )
    }

    pub fn set_model_key(&self, key: Option<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .model_key = non_empty(key);
    }

    pub fn set_instruction(&self, instruction: Option<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .instruction = non_empty(instruction);
    }

    pub fn snapshot(&self) -> ReportSettings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
