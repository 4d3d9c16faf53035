use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use regdoc_core::config::LlmSettings;

use crate::provider::{LanguageModel, LlmError};

/// Ollama `/api/generate`, non-streaming.
pub struct OllamaModel {
    client: reqwest::Client,
    url: String,
    id: String,
    settings: LlmSettings,
}

impl OllamaModel {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        if settings.base_url.trim().is_empty() {
            return Err(LlmError::NotConfigured("llm.base_url is empty".into()));
        }
        if settings.model.trim().is_empty() {
            return Err(LlmError::NotConfigured("llm.model is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/api/generate", settings.base_url.trim_end_matches('/')),
            id: format!("ollama:{}", settings.model),
            settings: settings.clone(),
        })
    }

    pub fn request_body(&self, prompt: &str) -> Value {
        build_request_body(&self.settings, prompt)
    }
}

pub fn build_request_body(settings: &LlmSettings, prompt: &str) -> Value {
    json!({
        "model": settings.model,
        "prompt": prompt,
        "stream": false,
        "options": {
            "temperature": settings.temperature,
            "top_p": settings.top_p,
            "repeat_penalty": settings.repeat_penalty,
            "num_ctx": settings.context_window,
        },
    })
}

pub fn parse_generate_response(resp: &Value) -> Result<String, LlmError> {
    if let Some(err) = resp["error"].as_str() {
        return Err(LlmError::ParseError(format!("model reported error: {}", err)));
    }
    resp["response"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| LlmError::ParseError("missing response".into()))
}

#[async_trait]
impl LanguageModel for OllamaModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = self.request_body(prompt);
        debug!(url = %self.url, prompt_chars = prompt.chars().count(), "ollama request");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: Value = response.json().await?;
        parse_generate_response(&resp)
    }
}
