use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::{BackendError, Backends, RetryPolicy};
use crate::config::Config;
use crate::core::{store::USER_PROFILE, MemoryStore, Role};
use crate::driver::{build_prompt, PromptParts, ToolDriver};
use crate::notify::{Event, LogNotifier, Notifier};
use crate::nlu::autocorrect;
use crate::rules::{Reply, RuleMatch, RuleMatcher};
use crate::state::{AssistantState, Persona, StateHandle};
use crate::tier::{search_query, wants_live_data, Tier};
use crate::tools::{Desktop, Research, SystemDesktop, ToolRegistry, WebResearcher};

pub const WAKE_ACK: &str = "Yes, I am here. How can I help?";
pub const LOCAL_UNREACHABLE: &str =
    "I cannot connect to Ollama. Please ensure the Ollama app is running on your PC.";
const LOCAL_FALLBACK_HISTORY: usize = 10;

const DEEP_REASONING: &str = "You are in Deep Reasoning Mode.\n\
Goal: answer with high accuracy and depth.\n\
1. Check the request for lingering spelling errors or ambiguities.\n\
2. Think step by step and break the problem down.\n\
3. Critique your initial thoughts.\n\
4. Give the definitive answer.\n\
Format:\n[Thinking]\n...your reasoning...\n[Answer]\n...your final response...";

/// Tier output and whether a language model actually produced it
struct Answer {
    text: String,
    from_model: bool,
}

impl Answer {
    fn model(text: String) -> Self {
        Self { text, from_model: true }
    }

    fn fallback(text: String) -> Self {
        Self { text, from_model: false }
    }
}

/// External collaborators the engine drives
#[derive(Clone)]
pub struct Collaborators {
    pub desktop: Arc<dyn Desktop>,
    pub research: Arc<dyn Research>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Engine {
    config: Config,
    state: StateHandle,
    memory: Mutex<MemoryStore>,
    backends: Backends,
    research: Arc<dyn Research>,
    notifier: Arc<dyn Notifier>,
    rules: RuleMatcher,
    driver: ToolDriver,
}

impl Engine {
    pub fn new(
        config: Config,
        backends: Backends,
        memory: MemoryStore,
        collaborators: Collaborators,
    ) -> Self {
        let state = StateHandle::new(AssistantState::from_config(&config.assistant));
        let registry = Arc::new(ToolRegistry::standard(
            collaborators.desktop,
            collaborators.research.clone(),
        ));
        let rules = RuleMatcher::new(registry.clone(), state.clone(), &config.assistant)
            .with_prompt_model(backends.primary().clone());
        let driver = ToolDriver::new(registry, RetryPolicy::from_config(&config.retry));

        Self {
            config,
            state,
            memory: Mutex::new(memory),
            backends,
            research: collaborators.research,
            notifier: collaborators.notifier,
            rules,
            driver,
        }
    }

    /// Production wiring: on-disk memory, system desktop, web research
    pub fn from_config(config: Config, notifier: Option<Arc<dyn Notifier>>) -> Result<Self> {
        let memory = MemoryStore::new(config.memory_db_file())
            .context("Failed to open memory database")?;
        match memory.migrate_legacy_json(&config.legacy_memory_file()) {
            Ok(true) => tracing::info!("imported legacy memory.json"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "legacy memory import failed"),
        }

        let backends = Backends::from_config(&config);
        let collaborators = Collaborators {
            desktop: Arc::new(SystemDesktop::new(config.screenshot_dir())),
            research: Arc::new(WebResearcher::new(Some(backends.primary().clone()))),
            notifier: notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
        };

        Ok(Self::new(config, backends, memory, collaborators))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.driver.registry()
    }

    /// Lock the memory store. Never hold the guard across an await.
    pub fn memory(&self) -> MutexGuard<'_, MemoryStore> {
        self.memory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Handle one utterance. Returns `None` for empty input.
    pub async fn process(&self, command: &str, language: &str) -> Option<Reply> {
        let raw = command.trim();
        if raw.is_empty() {
            return None;
        }
        let span = tracing::info_span!("utterance", id = %Uuid::new_v4());
        self.handle(raw, language).instrument(span).await
    }

    async fn handle(&self, raw: &str, language: &str) -> Option<Reply> {
        let corrected = autocorrect(raw);
        if corrected != raw {
            tracing::debug!(from = raw, to = %corrected, "auto-corrected");
        }

        self.state.update(|s| s.touch());
        let modes_before = self.state.modes();
        self.notifier.notify(Event::status("Processing..."));

        let lower = corrected.to_lowercase();
        let wake = self.config.assistant.wake_word.to_lowercase();
        let (lower, text) = match lower.strip_prefix(wake.as_str()) {
            Some(rest) => (
                rest.trim().to_string(),
                corrected.get(wake.len()..).unwrap_or(rest).trim().to_string(),
            ),
            None => (lower.trim().to_string(), corrected.clone()),
        };

        let reply = if lower.is_empty() {
            Reply::text(WAKE_ACK)
        } else {
            match self.rules.evaluate(&lower).await {
                RuleMatch::Matched(reply) => reply,
                RuleMatch::Unmatched => {
                    let answer = self.think(&text, language).await;
                    if answer.from_model {
                        self.learn_from(&lower);
                    }
                    Reply::text(answer.text)
                }
            }
        };

        self.record(&corrected, &reply);

        let modes_after = self.state.modes();
        if modes_after != modes_before {
            self.notifier.notify(Event::Mode(modes_after));
        }
        self.notifier.notify(Event::status("Ready"));
        Some(reply)
    }

    async fn think(&self, command: &str, language: &str) -> Answer {
        let snapshot = self.state.snapshot();
        let tier = Tier::select(&snapshot);
        tracing::debug!(%tier, "no rule matched, escalating");

        match tier {
            Tier::Quick => self.quick(command, language, snapshot.persona).await,
            Tier::Standard => {
                let instruction = self.persona_instruction(snapshot.persona).to_string();
                self.with_tools(tier, &instruction, command, language, false)
                    .await
            }
            Tier::Deep => self.deep(command, language, snapshot.persona).await,
        }
    }

    async fn quick(&self, command: &str, language: &str, persona: Persona) -> Answer {
        if wants_live_data(command) {
            tracing::info!("live data requested, searching instead of asking the model");
            let found = self
                .research
                .search_and_summarize(&search_query(command), true)
                .await;
            return Answer::fallback(format!("Here is what I found:\n{found}"));
        }

        let instruction = match persona {
            Persona::Professional => self.config.prompts.quick.clone(),
            Persona::Friendly => self.config.prompts.friendly.clone(),
        };
        self.with_tools(Tier::Quick, &instruction, command, language, true)
            .await
    }

    async fn deep(&self, command: &str, language: &str, persona: Persona) -> Answer {
        let mut instruction = format!("{}\n\n{DEEP_REASONING}", self.persona_instruction(persona));
        if wants_live_data(command) {
            let found = self
                .research
                .search_and_summarize(&search_query(command), false)
                .await;
            instruction.push_str(&format!("\n\nWeb research results:\n{found}"));
        }
        self.with_tools(Tier::Deep, &instruction, command, language, false)
            .await
    }

    /// Primary backend through the driver, local model on failure
    async fn with_tools(
        &self,
        tier: Tier,
        instruction: &str,
        command: &str,
        language: &str,
        fast: bool,
    ) -> Answer {
        let (memory, history) = {
            let memory = self.memory();
            let summary = memory.context_summary().unwrap_or_default();
            let history = memory
                .recent_turns(tier.history_limit())
                .unwrap_or_default();
            (summary, history)
        };
        let tools = self.driver.registry().prompt_listing();

        let prompt = build_prompt(&PromptParts {
            instruction,
            memory: &memory,
            history: &history,
            tools: &tools,
            language,
            command,
        });

        let primary = self.backends.primary().clone();
        match self
            .driver
            .run(primary.as_ref(), &prompt, fast, tier.max_actions())
            .await
        {
            Ok(text) => Answer::model(text),
            Err(e) if self.backends.has_cloud() => {
                tracing::warn!(backend = primary.name(), error = %e, "cloud backend failed, switching to local model");
                self.local_fallback(tier, command).await
            }
            Err(e) => Answer::fallback(local_error_message(&e)),
        }
    }

    async fn local_fallback(&self, tier: Tier, command: &str) -> Answer {
        let prompt = if tier == Tier::Quick {
            format!("{}\nUser: {command}", self.config.prompts.quick)
        } else {
            let persona = self.state.snapshot().persona;
            let context = self
                .memory()
                .context_window(LOCAL_FALLBACK_HISTORY)
                .unwrap_or_default();
            format!(
                "{}\n\nContext:\n{context}\nUser: {command}",
                self.persona_instruction(persona)
            )
        };

        match self.backends.local.generate(&prompt).await {
            Ok(text) => Answer::model(text.trim().to_string()),
            Err(e) => Answer::fallback(local_error_message(&e)),
        }
    }

    fn persona_instruction(&self, persona: Persona) -> &str {
        match persona {
            Persona::Professional => &self.config.prompts.system,
            Persona::Friendly => &self.config.prompts.friendly,
        }
    }

    /// Remember the user's name when they state it to a model
    fn learn_from(&self, lower: &str) {
        let Some((_, rest)) = lower.rsplit_once("my name is") else {
            return;
        };
        let name = rest.trim().trim_end_matches(['.', '!']);
        if name.is_empty() {
            return;
        }
        if let Err(e) = self.memory().set_setting(USER_PROFILE, "name", name) {
            tracing::warn!(error = %e, "failed to store user name");
        } else {
            tracing::info!(name, "learned user name");
        }
    }

    fn record(&self, command: &str, reply: &Reply) {
        {
            let memory = self.memory();
            if let Err(e) = memory.add_turn(Role::User, command) {
                tracing::warn!(error = %e, "failed to log user turn");
            }
            if let Err(e) = memory.add_turn(Role::Assistant, &reply.text) {
                tracing::warn!(error = %e, "failed to log assistant turn");
            }
        }

        self.notifier.notify(Event::Conversation {
            role: Role::User,
            content: command.to_string(),
            image: None,
        });
        self.notifier.notify(Event::Conversation {
            role: Role::Assistant,
            content: reply.text.clone(),
            image: reply.image.clone(),
        });
    }
}

fn local_error_message(e: &BackendError) -> String {
    match e {
        BackendError::Unreachable(_) => LOCAL_UNREACHABLE.to_string(),
        BackendError::Status { code, .. } => {
            format!("My local brain disconnected. (Status: {code})")
        }
        BackendError::RateLimited(_) => {
            "I'm being rate limited right now. Please try again in a moment.".to_string()
        }
        BackendError::InvalidResponse(_) | BackendError::NotConfigured(_) => {
            "I encountered a local processing error.".to_string()
        }
    }
}
