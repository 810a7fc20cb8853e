//! Vision model abstraction and the Gemini client.
//!
//! A model call submits one multi-part request and yields the reply as a stream of text
//! fragments in arrival order.

mod gemini;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub use gemini::GeminiClient;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model api error: {0}")]
    Api(String),
}

/// One part of a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Binary payload tagged with its MIME type (e.g. a PNG screenshot).
    Blob { mime_type: String, data: Vec<u8> },
}

/// Incremental text fragments of a model reply. Finite; ends early on the first error.
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

/// A model vendor that accepts multi-part prompts and streams text back.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn stream_generate(
        &self,
        api_key: &str,
        model: &str,
        parts: Vec<Part>,
    ) -> Result<FragmentStream, LlmError>;
}
