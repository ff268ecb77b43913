use async_trait::async_trait;
use std::time::Duration;

use super::{BackendError, LanguageModel};

/// Local model served by Ollama's `/api/generate`
pub struct OllamaBackend {
    url: String,
    model: String,
    label: String,
    http_client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(url: String, model: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        OllamaBackend {
            label: format!("ollama:{}", model),
            url,
            model,
            http_client,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        tracing::debug!(model = %self.model, "thinking on local model");
        let response = self
            .http_client
            .post(&self.url)
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

        response_json["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::InvalidResponse("missing `response` field".to_string()))
    }
}
