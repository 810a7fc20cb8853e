//! Report generation: screenshot + instruction in, model text out.
//!
//! Failures never escape as errors. They come back as text starting with [`ERROR_MARKER`]
//! so the caller can forward them to the chat like any other report.

use futures_util::TryStreamExt;
use std::sync::Arc;

use crate::llm::{LlmError, ModelClient, Part};

/// Prefix of every user-visible error text.
pub const ERROR_MARKER: &str = "❌";

pub const SCREENSHOT_MIME: &str = "image/png";

/// Outcome of one generation attempt: report text or an error description, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportResult {
    Text(String),
    Error(String),
}

impl ReportResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ReportResult::Error(_))
    }

    /// Text to show the user; errors are prefixed with [`ERROR_MARKER`].
    pub fn into_text(self) -> String {
        match self {
            ReportResult::Text(text) => text,
            ReportResult::Error(description) => format!("{} {}", ERROR_MARKER, description),
        }
    }
}

/// Sends an instruction and a screenshot to a vision model and collects the streamed reply.
#[derive(Clone)]
pub struct ReportGenerator {
    client: Arc<dyn ModelClient>,
    model: String,
}

impl ReportGenerator {
    pub fn new(client: Arc<dyn ModelClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a report. An empty `api_key` means "not configured" and is reported, not sent.
    pub async fn try_generate(
        &self,
        api_key: &str,
        image: &[u8],
        instruction: &str,
    ) -> ReportResult {
        if api_key.trim().is_empty() {
            return ReportResult::Error("Error: Gemini API token not saved.".to_string());
        }
        match self.stream_report(api_key, image, instruction).await {
            Ok(text) => {
                log::info!("report: {} chars from {}", text.chars().count(), self.model);
                ReportResult::Text(text)
            }
            Err(e) => {
                log::warn!("report: model call failed: {}", e);
                ReportResult::Error(format!("Error contacting model API: {}", e))
            }
        }
    }

    /// Same as [`ReportGenerator::try_generate`], flattened to the text sent to the chat.
    pub async fn generate(&self, api_key: &str, image: &[u8], instruction: &str) -> String {
        self.try_generate(api_key, image, instruction)
            .await
            .into_text()
    }

    async fn stream_report(
        &self,
        api_key: &str,
        image: &[u8],
        instruction: &str,
    ) -> Result<String, LlmError> {
        let parts = vec![
            Part::Text(instruction.to_string()),
            Part::Blob {
                mime_type: SCREENSHOT_MIME.to_string(),
                data: image.to_vec(),
            },
        ];
        let fragments = self
            .client
            .stream_generate(api_key, &self.model, parts)
            .await?;
        fragments
            .try_fold(String::new(), |mut report, fragment| async move {
                report.push_str(&fragment);
                Ok(report)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FragmentStream;
    use async_trait::async_trait;
    use futures_util::stream::{self, StreamExt};
    use std::sync::Mutex;

    struct ScriptedModel {
        fragments: Vec<Result<String, String>>,
        calls: Mutex<Vec<(String, String, Vec<Part>)>>,
    }

    impl ScriptedModel {
        fn new(fragments: Vec<Result<String, String>>) -> Self {
            Self {
                fragments,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn stream_generate(
            &self,
            api_key: &str,
            model: &str,
            parts: Vec<Part>,
        ) -> Result<FragmentStream, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((api_key.to_string(), model.to_string(), parts));
            let items: Vec<Result<String, LlmError>> = self
                .fragments
                .iter()
                .cloned()
                .map(|r| r.map_err(LlmError::Api))
                .collect();
            Ok(stream::iter(items).boxed())
        }
    }

    #[tokio::test]
    async fn concatenates_fragments_in_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("Report: ".to_string()),
            Ok("50% ".to_string()),
            Ok("done.".to_string()),
        ]));
        let generator = ReportGenerator::new(model.clone(), "gemini-2.0-flash");
        let result = generator.try_generate("key", &[9, 9], "Summarize").await;
        assert_eq!(result, ReportResult::Text("Report: 50% done.".to_string()));

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (key, name, parts) = &calls[0];
        assert_eq!(key, "key");
        assert_eq!(name, "gemini-2.0-flash");
        assert_eq!(
            parts,
            &vec![
                Part::Text("Summarize".to_string()),
                Part::Blob {
                    mime_type: "image/png".to_string(),
                    data: vec![9, 9]
                }
            ]
        );
    }

    #[tokio::test]
    async fn missing_key_fails_closed_without_calling_model() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("never".to_string())]));
        let generator = ReportGenerator::new(model.clone(), "m");
        let text = generator.generate("", &[1], "Summarize").await;
        assert!(text.starts_with(ERROR_MARKER));
        assert!(text.contains("Gemini API token not saved"));
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_error_becomes_marked_text() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("partial".to_string()),
            Err("quota exceeded".to_string()),
        ]));
        let generator = ReportGenerator::new(model, "m");
        let text = generator.generate("key", &[1], "Summarize").await;
        assert_eq!(
            text,
            "❌ Error contacting model API: model api error: quota exceeded"
        );
    }
}
