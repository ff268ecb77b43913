use async_trait::async_trait;
use std::time::Duration;

use super::{BackendError, LanguageModel};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions endpoint (OpenAI, DeepSeek, ...)
pub struct OpenAiCompatBackend {
    base_url: String,
    model: String,
    api_key: String,
    system_prompt: Option<String>,
    label: String,
    http_client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(
        base_url: Option<String>,
        model: String,
        api_key: String,
        system_prompt: Option<String>,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            label: format!("openai:{}", model),
            model,
            api_key,
            system_prompt,
            http_client,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let mut request_messages = Vec::new();

        if let Some(system) = &self.system_prompt {
            request_messages.push(serde_json::json!({
                "role": "system",
                "content": system
            }));
        }
        request_messages.push(serde_json::json!({
            "role": "user",
            "content": prompt
        }));

        let request_body = serde_json::json!({
            "model": self.model,
            "messages": request_messages,
            "stream": false
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), error_text));
        }

        let response_json: serde_json::Value = response.json().await?;

        response_json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::InvalidResponse("Invalid chat completion format".to_string()))
    }
}
