use async_trait::async_trait;

/// A text-completion backend. One prompt in, one completion out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier shown in logs, e.g. `ollama:llama3.1`.
    fn model_id(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}
