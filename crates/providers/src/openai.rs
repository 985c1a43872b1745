use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::{env_non_empty, parse_base_url, CompletionClient, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4";
const MAX_OUTPUT_TOKENS: u32 = 500;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Url,
}

impl OpenAiConfig {
    pub fn new(
        api_key: impl Into<String>,
        model: Option<String>,
        base_url: Option<&str>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: parse_base_url(base_url.unwrap_or(DEFAULT_BASE_URL))?,
        })
    }

    /// `None` when `TRIAGE_OPENAI_API_KEY` is unset.
    pub fn from_env() -> Result<Option<Self>, ProviderError> {
        let Some(api_key) = env_non_empty("TRIAGE_OPENAI_API_KEY") else {
            return Ok(None);
        };
        let model = env_non_empty("TRIAGE_OPENAI_MODEL");
        let base_url = env_non_empty("TRIAGE_OPENAI_BASE_URL");
        Self::new(api_key, model, base_url.as_deref()).map(Some)
    }
}

pub struct OpenAiCompletionClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiCompletionClient {
    pub fn new(http: Client, config: OpenAiConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, instructions: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = self.config.base_url.join("v1/responses")?;
        let payload = json!({
            "model": self.config.model,
            "max_output_tokens": MAX_OUTPUT_TOKENS,
            "input": [
                {
                    "role": "system",
                    "content": [
                        { "type": "input_text", "text": instructions }
                    ]
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "input_text", "text": prompt }
                    ]
                }
            ]
        });

        debug!(model = %self.config.model, "completion request");

        let response = self
            .http
            .post(url)
            .bearer_auth(self.config.api_key.as_str())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| ProviderError::Decode(error.to_string()))?;
        extract_output_text(&body)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ProviderError::Decode("completion output text missing".to_string()))
    }
}

/// Output text of a Responses API payload: `output_text` when present,
/// otherwise every `output_text` content item joined.
pub fn extract_output_text(payload: &Value) -> Option<String> {
    if let Some(value) = payload.get("output_text").and_then(|value| value.as_str()) {
        return Some(value.to_string());
    }
    let output = payload.get("output")?.as_array()?;
    let chunks = output
        .iter()
        .filter_map(|item| item.get("content").and_then(|value| value.as_array()))
        .flatten()
        .filter(|content| content.get("type").and_then(|value| value.as_str()) == Some("output_text"))
        .filter_map(|content| content.get("text").and_then(|value| value.as_str()))
        .map(str::to_string)
        .collect::<Vec<_>>();
    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n\n"))
    }
}
