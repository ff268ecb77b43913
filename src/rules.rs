use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

use crate::action::{ToolAction, ToolArgs};
use crate::backend::LanguageModel;
use crate::config::AssistantConfig;
use crate::state::{Persona, StateHandle};
use crate::tools::ToolRegistry;

pub const GREETINGS: &[&str] = &[
    "Hello! I am listening.",
    "Hi there! How can I help?",
    "Greetings. Systems online.",
];

pub const CONVERSATION_STARTERS: &[&str] = &[
    "If you could travel anywhere right now, where would you go?",
    "Seen any good movies lately?",
    "What's the best thing that happened to you today?",
    "Do you believe in aliens?",
    "If you had a superpower, what would it be?",
    "What's your favorite song at the moment?",
    "Pizza or burgers? We need to settle this.",
];

const SHORT_COMMAND_LEN: usize = 20;

const IMAGE_PROMPT_REWRITE: &str =
    "Rewrite this image prompt to be highly detailed and artistic. Keep it under 50 words. Prompt:";

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern"));

static IMAGE_TRIGGERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(generate|create|make|image|picture|drawing|of|an|a)\b")
        .expect("image trigger pattern")
});

/// Text answer, optionally with an image URL for display surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(text: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: Some(image.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    Matched(Reply),
    Unmatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    QuickOn,
    QuickOff,
    DeepOn,
    DeepOff,
    Friendly,
    Professional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Say(String),
    Greeting,
    ConversationStarter,
    Identity,
    Mode(ModeChange),
    Tool(ToolAction),
    Image { prompt: String },
}

fn has_word(command: &str, words: &[&str]) -> bool {
    command
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| words.contains(&w))
}

fn switch_direction(command: &str) -> Option<bool> {
    if has_word(command, &["off", "disable", "stop", "deactivate"]) {
        Some(false)
    } else if has_word(command, &["on", "enable", "start", "activate"]) {
        Some(true)
    } else {
        None
    }
}

/// All unsigned integers in order of appearance
pub fn integers(command: &str) -> Vec<u64> {
    DIGITS
        .find_iter(command)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

fn strip_words(command: &str, words: &[&str]) -> String {
    let mut out = command.to_string();
    for word in words {
        out = out.replace(word, "");
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tool(name: &str, args: ToolArgs) -> Option<Intent> {
    Some(Intent::Tool(ToolAction::new(name, args)))
}

/// First rule that applies to a lower-cased command
pub fn classify(command: &str) -> Option<Intent> {
    let c = command.trim();
    if c.is_empty() {
        return None;
    }

    if ["hello", "hi", "hey", "hello sami", "hi sami", "hey sami"].contains(&c) {
        return Some(Intent::Greeting);
    }
    if ["how are you", "how are you doing", "what's up"].contains(&c) {
        return Some(Intent::Say(
            "I am functioning at peak efficiency. Ready for your command.".into(),
        ));
    }
    if ["thank you", "thanks", "cool", "nice", "good job"].contains(&c) {
        return Some(Intent::Say("You're welcome.".into()));
    }
    if ["who made you", "who created you"].contains(&c) {
        return Some(Intent::Say("I was created by you.".into()));
    }

    if c.contains("fast mode") || c.contains("quick mode") {
        match switch_direction(c) {
            Some(true) => return Some(Intent::Mode(ModeChange::QuickOn)),
            Some(false) => return Some(Intent::Mode(ModeChange::QuickOff)),
            None => {}
        }
    }
    if c.contains("deep mode") || c.contains("advanced thinking") || c.contains("reasoning") {
        match switch_direction(c) {
            Some(true) => return Some(Intent::Mode(ModeChange::DeepOn)),
            Some(false) => return Some(Intent::Mode(ModeChange::DeepOff)),
            None => {}
        }
    }

    if has_word(c, &["friend", "friendly", "casual"]) {
        return Some(Intent::Mode(ModeChange::Friendly));
    }
    if c.contains("professional") || c.contains("jarvis") || c.contains("serious") {
        return Some(Intent::Mode(ModeChange::Professional));
    }

    if c.contains("bored") || (c.contains("talk") && (c.contains("let's") || c.contains("can we"))) {
        return Some(Intent::ConversationStarter);
    }
    if c.contains("who are you") || c.contains("what is your name") {
        return Some(Intent::Identity);
    }

    if c.contains("what is") && c.contains("plus") {
        if let [a, b] = integers(c).as_slice() {
            let sum = u128::from(*a) + u128::from(*b);
            return Some(Intent::Say(format!("The answer is {sum}.")));
        }
    }

    if c.contains("capital of") {
        if c.contains("india") {
            return Some(Intent::Say("New Delhi is the capital of India.".into()));
        }
        if c.contains("france") {
            return Some(Intent::Say("Paris is the capital of France.".into()));
        }
        if c.contains("usa") {
            return Some(Intent::Say(
                "Washington D.C. is the capital of the United States.".into(),
            ));
        }
    }

    if c.contains("time") && c.len() < SHORT_COMMAND_LEN {
        return tool("get_time", ToolArgs::None);
    }
    if c.contains("date") && c.len() < SHORT_COMMAND_LEN {
        return tool("get_date", ToolArgs::None);
    }

    if c.contains("play") && (c.contains("youtube") || c.contains("song")) {
        let song = strip_words(c, &["play", "youtube"]);
        let song = song.strip_suffix(" on").unwrap_or(&song).trim().to_string();
        return tool("play_youtube", ToolArgs::One(song));
    }
    if c.contains("pause")
        || c.contains("stop song")
        || c.contains("stop music")
        || c.contains("resume")
        || c.contains("next song")
    {
        let action = if c.contains("pause") {
            "pause"
        } else if c.contains("stop") {
            "stop"
        } else if c.contains("resume") {
            "play"
        } else {
            "next"
        };
        return tool("media_control", ToolArgs::one(action));
    }

    if c.contains("screenshot") {
        return tool("take_screenshot", ToolArgs::None);
    }

    if c.contains("open") {
        let target = strip_words(c, &["open"]);
        return match target.as_str() {
            "youtube" => tool("open_website", ToolArgs::one("youtube.com")),
            "google" => tool("open_website", ToolArgs::one("google.com")),
            "whatsapp" => tool("open_website", ToolArgs::one("web.whatsapp.com")),
            "instagram" => tool("open_website", ToolArgs::one("instagram.com")),
            "facebook" => tool("open_website", ToolArgs::one("facebook.com")),
            t if t.contains('.') && !t.contains(' ') => tool("open_website", ToolArgs::one(t)),
            t => tool("open_app", ToolArgs::one(t)),
        };
    }
    if has_word(c, &["close"]) {
        return tool("close_app", ToolArgs::One(strip_words(c, &["close"])));
    }

    if has_word(c, &["shutdown", "restart", "lock"]) {
        return tool("system_control", ToolArgs::one(c));
    }

    if c.contains("volume") {
        let amount = integers(c).first().copied();
        let action = if c.contains("mute") {
            "mute"
        } else if c.contains("set") || (has_word(c, &["to"]) && amount.is_some()) {
            "set"
        } else if c.contains("up") || c.contains("increase") {
            "up"
        } else if c.contains("down") || c.contains("decrease") {
            "down"
        } else if amount.is_some() {
            "set"
        } else {
            "unknown"
        };
        let args = match amount {
            Some(n) => ToolArgs::many([action.to_string(), n.to_string()]),
            None => ToolArgs::one(action),
        };
        return tool("volume_control", args);
    }

    if c.contains("research") {
        return tool("conduct_research", ToolArgs::One(strip_words(c, &["research"])));
    }
    if c.contains("wikipedia") {
        return tool(
            "search_wikipedia",
            ToolArgs::One(strip_words(c, &["wikipedia", "search"])),
        );
    }
    if c.contains("google") || c.contains("search") {
        return tool(
            "google_search",
            ToolArgs::One(strip_words(c, &["search", "google"])),
        );
    }

    if c.contains("generate") && (c.contains("image") || c.contains("picture") || c.contains("drawing")) {
        return Some(Intent::Image {
            prompt: image_prompt(c),
        });
    }

    if c.contains("routine") || ["good morning", "good night", "start work"].contains(&c) {
        return tool("execute_routine", ToolArgs::one(c));
    }

    None
}

/// Drop trigger words so only the subject of the picture remains
pub fn image_prompt(command: &str) -> String {
    IMAGE_TRIGGERS
        .replace_all(command, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn image_url(prompt: &str, seed: u32) -> String {
    format!(
        "https://image.pollinations.ai/prompt/{}?seed={seed}&nologo=true",
        urlencoding::encode(prompt)
    )
}

pub struct RuleMatcher {
    registry: Arc<ToolRegistry>,
    state: StateHandle,
    name: String,
    full_name: String,
    prompt_model: Option<Arc<dyn LanguageModel>>,
}

impl RuleMatcher {
    pub fn new(registry: Arc<ToolRegistry>, state: StateHandle, assistant: &AssistantConfig) -> Self {
        Self {
            registry,
            state,
            name: assistant.name.clone(),
            full_name: assistant.full_name.clone(),
            prompt_model: None,
        }
    }

    /// Model used to embellish image prompts outside fast mode
    pub fn with_prompt_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.prompt_model = Some(model);
        self
    }

    pub async fn evaluate(&self, command: &str) -> RuleMatch {
        match classify(command) {
            Some(intent) => {
                tracing::debug!(?intent, "rule matched");
                RuleMatch::Matched(self.resolve(intent).await)
            }
            None => RuleMatch::Unmatched,
        }
    }

    async fn resolve(&self, intent: Intent) -> Reply {
        match intent {
            Intent::Say(text) => Reply::text(text),
            Intent::Greeting => Reply::text(pick(GREETINGS)),
            Intent::ConversationStarter => {
                self.state.update(|s| s.set_persona(Persona::Friendly));
                Reply::text(format!("Let's chat! {}", pick(CONVERSATION_STARTERS)))
            }
            Intent::Identity => Reply::text(format!("I am {}, your {}.", self.name, self.full_name)),
            Intent::Mode(change) => Reply::text(self.apply_mode(change)),
            Intent::Tool(action) => Reply::text(self.registry.invoke_or_report(&action).await),
            Intent::Image { prompt } => {
                let detailed = self.detailed_image_prompt(&prompt).await;
                let seed = rand::thread_rng().gen_range(1..=10_000);
                Reply::with_image(
                    format!("Here is the generated image of {prompt}."),
                    image_url(&detailed, seed),
                )
            }
        }
    }

    async fn detailed_image_prompt(&self, prompt: &str) -> String {
        let Some(model) = &self.prompt_model else {
            return prompt.to_string();
        };
        if self.state.snapshot().quick_response_mode() {
            return prompt.to_string();
        }

        match model.generate(&format!("{IMAGE_PROMPT_REWRITE} {prompt}")).await {
            Ok(text) => {
                let text = text.trim().trim_matches('"').trim();
                if text.is_empty() {
                    prompt.to_string()
                } else {
                    tracing::debug!(detailed = text, "image prompt rewritten");
                    text.to_string()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "image prompt enhancement failed");
                prompt.to_string()
            }
        }
    }

    fn apply_mode(&self, change: ModeChange) -> &'static str {
        let reply = self.state.update(|s| match change {
            ModeChange::QuickOn => {
                s.set_quick_response_mode(true);
                "Fast Mode activated. Responses will be concise."
            }
            ModeChange::QuickOff => {
                s.set_quick_response_mode(false);
                "Fast Mode deactivated."
            }
            ModeChange::DeepOn => {
                s.set_deep_think_mode(true);
                "Advanced Reasoning Mode activated. I will think carefully before answering."
            }
            ModeChange::DeepOff => {
                s.set_deep_think_mode(false);
                "Advanced Reasoning Mode deactivated."
            }
            ModeChange::Friendly => {
                s.set_persona(Persona::Friendly);
                "Friendly Mode activated. Hey! Let's chat."
            }
            ModeChange::Professional => {
                s.set_persona(Persona::Professional);
                "Professional Mode activated. Systems online."
            }
        });
        tracing::info!(?change, "mode changed");
        reply
    }
}

fn pick(pool: &[&str]) -> String {
    pool.choose(&mut rand::thread_rng())
        .map(|s| s.to_string())
        .unwrap_or_default()
}
