use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::Persona;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    /// Ollama on this machine
    #[default]
    Local,
    /// Hosted provider, with the local model as fallback
    Cloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudKind {
    /// Any OpenAI-compatible chat completions endpoint (OpenAI, DeepSeek, ...)
    OpenAi,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub kind: CloudKind,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl CloudConfig {
    fn key_env_var(&self) -> &'static str {
        match self.kind {
            CloudKind::OpenAi => {
                if self.base_url.as_deref().map_or(false, |u| u.contains("deepseek")) {
                    "DEEPSEEK_API_KEY"
                } else {
                    "OPENAI_API_KEY"
                }
            }
            CloudKind::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Fill an empty key from the environment
    fn resolve_api_key(&mut self) {
        if self.api_key.as_ref().map_or(true, |key| key.is_empty()) {
            self.api_key = std::env::var("SAMI_API_KEY")
                .or_else(|_| std::env::var(self.key_env_var()))
                .ok()
                .filter(|key| !key.is_empty());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub model: String,
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-r1:1.5b".to_string(),
            url: "http://localhost:11434/api/generate".to_string(),
            timeout_secs: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub name: String,
    pub full_name: String,
    pub wake_word: String,
    pub default_language: String,
    pub continuous_mode: bool,
    pub continuous_timeout_secs: u64,
    pub listen_timeout_secs: u64,
    pub quick_response_mode: bool,
    pub persona: Persona,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "SAMi".to_string(),
            full_name: "Smart Artificial Mind Interface".to_string(),
            wake_word: "hey sami".to_string(),
            default_language: "en-in".to_string(),
            continuous_mode: true,
            continuous_timeout_secs: 8,
            listen_timeout_secs: 10,
            quick_response_mode: true,
            persona: Persona::Professional,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Professional persona instruction
    pub system: String,
    pub friendly: String,
    pub quick: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: "Identity: Your name is SAMi (Smart Artificial Mind Interface), an integrated \
                     desktop assistant with planning skills and system-level execution.\n\
                     Break goals into steps and check your own work before answering.\n\
                     Remember the user's preferences and past interactions.\n\
                     Tone: professional, highly efficient, slightly futuristic, yet human."
                .to_string(),
            friendly: "Identity: You are SAMi, my intelligent and friendly AI companion.\n\
                       Personality: warm, empathetic, humorous and conversational.\n\
                       Speak naturally, like a friend. Always ask a relevant follow-up question.\n\
                       You still have full access to system tools, but use them casually."
                .to_string(),
            quick: "You are SAMi (Smart Artificial Mind Interface).\n\
                    Role: efficient, fast-response AI assistant.\n\
                    Rules:\n\
                    1. Be concise but informative, 1-2 sentences of context at most.\n\
                    2. Avoid flowery language.\n\
                    3. If you can answer directly, do it.\n\
                    4. Tools available: search, music, apps, system control. Output JSON for tools."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base: f64,
    pub max_jitter_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: 2.0,
            max_jitter_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub ai_mode: AiMode,
    #[serde(default)]
    pub cloud: Option<CloudConfig>,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Spoken language name to recognizer language code
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, String>,
}

impl Config {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(Self::default_data_dir);

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join("config.json");

        if config_path.exists() {
            let config_str =
                std::fs::read_to_string(&config_path).context("Failed to read config.json")?;

            if config_str.trim().is_empty() {
                tracing::warn!("config file is empty, recreating defaults");
            } else {
                match serde_json::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        config.data_dir = data_dir;
                        if let Some(cloud) = config.cloud.as_mut() {
                            cloud.resolve_api_key();
                        }
                        return Ok(config);
                    }
                    Err(e) => {
                        // keep the user's file untouched so it can be fixed by hand
                        tracing::warn!(error = %e, path = %config_path.display(), "failed to parse config.json, using defaults");
                        return Ok(Self::default_config(data_dir));
                    }
                }
            }
        }

        let config = Self::default_config(data_dir);
        config.save()?;
        Ok(config)
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sami")
    }

    pub fn save(&self) -> Result<()> {
        let json_str =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(self.config_file(), json_str).context("Failed to write config.json")?;
        Ok(())
    }

    pub fn default_config(data_dir: PathBuf) -> Self {
        Config {
            data_dir,
            ai_mode: AiMode::Local,
            cloud: None,
            local: LocalConfig::default(),
            assistant: AssistantConfig::default(),
            prompts: PromptConfig::default(),
            retry: RetryConfig::default(),
            languages: default_languages(),
        }
    }

    /// Look up a language code by its spoken name ("hindi" -> "hi-in")
    pub fn language_code(&self, name: &str) -> Option<&str> {
        self.languages.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn local_timeout(&self) -> Duration {
        Duration::from_secs(self.local.timeout_secs)
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn memory_db_file(&self) -> PathBuf {
        self.data_dir.join("sami_memory.db")
    }

    pub fn legacy_memory_file(&self) -> PathBuf {
        self.data_dir.join("memory.json")
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.data_dir.join("screenshots")
    }
}

fn default_languages() -> BTreeMap<String, String> {
    [
        ("english", "en-in"),
        ("hindi", "hi-in"),
        ("marathi", "mr-in"),
        ("kannada", "kn-in"),
        ("tamil", "ta-in"),
        ("telugu", "te-in"),
        ("bengali", "bn-in"),
        ("gujarati", "gu-in"),
        ("malayalam", "ml-in"),
        ("urdu", "ur-in"),
        ("american english", "en-us"),
        ("spanish", "es-es"),
        ("french", "fr-fr"),
        ("german", "de-de"),
        ("italian", "it-it"),
        ("japanese", "ja-jp"),
        ("mandarin", "zh-cn"),
        ("russian", "ru-ru"),
        ("portuguese", "pt-br"),
        ("korean", "ko-kr"),
        ("arabic", "ar-sa"),
        ("turkish", "tr-tr"),
        ("dutch", "nl-nl"),
    ]
    .into_iter()
    .map(|(name, code)| (name.to_string(), code.to_string()))
    .collect()
}
