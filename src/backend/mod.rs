use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AiMode, CloudKind, Config};

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod retry;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiCompatBackend;
pub use retry::RetryPolicy;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("backend not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, BackendError::RateLimited(_))
    }

    /// Map a failed HTTP exchange onto the taxonomy
    pub fn from_status(code: u16, body: String) -> Self {
        if code == 429 {
            BackendError::RateLimited(body)
        } else {
            BackendError::Status { code, body }
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return BackendError::from_status(status.as_u16(), e.to_string());
        }
        if e.is_decode() {
            BackendError::InvalidResponse(e.to_string())
        } else {
            // connect, timeout, request building
            BackendError::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short label used in logs ("ollama:llama3")
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// The configured primary backend plus the local fallback
#[derive(Clone)]
pub struct Backends {
    pub cloud: Option<Arc<dyn LanguageModel>>,
    pub local: Arc<dyn LanguageModel>,
}

impl Backends {
    pub fn new(cloud: Option<Arc<dyn LanguageModel>>, local: Arc<dyn LanguageModel>) -> Self {
        Self { cloud, local }
    }

    pub fn from_config(config: &Config) -> Self {
        let local: Arc<dyn LanguageModel> = Arc::new(OllamaBackend::new(
            config.local.url.clone(),
            config.local.model.clone(),
            config.local_timeout(),
        ));

        let cloud = match (config.ai_mode, config.cloud.as_ref()) {
            (AiMode::Cloud, Some(cloud)) => match cloud.api_key.clone() {
                Some(api_key) => {
                    let backend: Arc<dyn LanguageModel> = match cloud.kind {
                        CloudKind::OpenAi => Arc::new(OpenAiCompatBackend::new(
                            cloud.base_url.clone(),
                            cloud.model.clone(),
                            api_key,
                            Some(format!("You are {}, a helpful assistant.", config.assistant.name)),
                        )),
                        CloudKind::Gemini => Arc::new(GeminiBackend::new(
                            cloud.base_url.clone(),
                            cloud.model.clone(),
                            api_key,
                        )),
                    };
                    tracing::info!(backend = backend.name(), "connected cloud backend");
                    Some(backend)
                }
                None => {
                    tracing::warn!("cloud mode selected but no API key found, using local model only");
                    None
                }
            },
            (AiMode::Cloud, None) => {
                tracing::warn!("cloud mode selected without a cloud provider block");
                None
            }
            (AiMode::Local, _) => None,
        };

        Self { cloud, local }
    }

    /// Cloud when configured, otherwise local
    pub fn primary(&self) -> &Arc<dyn LanguageModel> {
        self.cloud.as_ref().unwrap_or(&self.local)
    }

    pub fn has_cloud(&self) -> bool {
        self.cloud.is_some()
    }
}
