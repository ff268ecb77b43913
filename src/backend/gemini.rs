use async_trait::async_trait;
use std::time::Duration;

use super::{BackendError, LanguageModel};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` REST endpoint
pub struct GeminiBackend {
    base_url: String,
    model: String,
    api_key: String,
    label: String,
    http_client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(base_url: Option<String>, model: String, api_key: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            label: format!("gemini:{}", model),
            model,
            api_key,
            http_client,
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request_body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self
            .http_client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), error_text));
        }

        let response_json: serde_json::Value = response.json().await?;

        response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::InvalidResponse("Invalid Gemini response format".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_reads_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "42"}]}}]
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(
            Some(server.uri()),
            "gemini-2.0-flash".to_string(),
            "k".to_string(),
        );
        assert_eq!(backend.generate("answer?").await.unwrap(), "42");
    }
}
