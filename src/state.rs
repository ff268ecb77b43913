use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::config::AssistantConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Professional,
    Friendly,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persona::Professional => write!(f, "professional"),
            Persona::Friendly => write!(f, "friendly"),
        }
    }
}

/// Quick and deep modes are mutually exclusive, so they only change through
/// the setters
#[derive(Debug, Clone)]
pub struct AssistantState {
    quick_response_mode: bool,
    deep_think_mode: bool,
    pub persona: Persona,
    pub current_language: String,
    /// Awake after the wake word, asleep otherwise
    pub active: bool,
    pub last_interaction: Instant,
}

impl AssistantState {
    pub fn new(quick_response_mode: bool, persona: Persona, language: impl Into<String>) -> Self {
        Self {
            quick_response_mode,
            deep_think_mode: false,
            persona,
            current_language: language.into(),
            active: false,
            last_interaction: Instant::now(),
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(
            config.quick_response_mode,
            config.persona,
            config.default_language.clone(),
        )
    }

    pub fn quick_response_mode(&self) -> bool {
        self.quick_response_mode
    }

    pub fn deep_think_mode(&self) -> bool {
        self.deep_think_mode
    }

    pub fn set_quick_response_mode(&mut self, enabled: bool) {
        self.quick_response_mode = enabled;
        if enabled {
            self.deep_think_mode = false;
        }
    }

    pub fn set_deep_think_mode(&mut self, enabled: bool) {
        self.deep_think_mode = enabled;
        if enabled {
            self.quick_response_mode = false;
        }
    }

    /// Friendly conversations are never rushed through quick mode
    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = persona;
        if persona == Persona::Friendly {
            self.quick_response_mode = false;
        }
    }

    pub fn touch(&mut self) {
        self.last_interaction = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_interaction.elapsed()
    }

    pub fn modes(&self) -> ModeSnapshot {
        ModeSnapshot {
            quick_response_mode: self.quick_response_mode,
            deep_think_mode: self.deep_think_mode,
            persona: self.persona,
        }
    }
}

impl Default for AssistantState {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

/// Mode flags as published to notification sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSnapshot {
    pub quick_response_mode: bool,
    pub deep_think_mode: bool,
    pub persona: Persona,
}

/// Shared, lock-guarded owner of the assistant state.
///
/// The voice loop, text commands and the engine all hold clones of the same
/// handle; every read and write goes through the lock.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    inner: Arc<RwLock<AssistantState>>,
}

impl StateHandle {
    pub fn new(state: AssistantState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AssistantState {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut AssistantState) -> R) -> R {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn modes(&self) -> ModeSnapshot {
        self.snapshot().modes()
    }
}
