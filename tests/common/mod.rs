#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sami::backend::{BackendError, Backends, LanguageModel};
use sami::config::Config;
use sami::core::MemoryStore;
use sami::engine::{Collaborators, Engine};
use sami::notify::{Event, Notifier};
use sami::speech::{Speech, SpeechError};
use sami::tools::{Desktop, Research};

/// Backend that replays scripted results and records every prompt
pub struct ScriptedModel {
    name: String,
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    fallback: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn answering(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name: "scripted".to_string(),
            replies: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: fn() -> BackendError) -> Arc<Self> {
        let model = Self::answering("");
        {
            let mut replies = model.replies.lock().unwrap();
            for _ in 0..8 {
                replies.push_back(Err(error()));
            }
        }
        model
    }

    pub fn push(&self, reply: Result<String, BackendError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Desktop that records each call instead of touching the system
#[derive(Default)]
pub struct RecordingDesktop {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingDesktop {
    fn record(&self, call: String) -> String {
        self.calls.lock().unwrap().push(call.clone());
        format!("done: {call}")
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Desktop for RecordingDesktop {
    async fn open_app(&self, name: &str) -> String {
        self.record(format!("open_app {name}"))
    }
    async fn close_app(&self, name: &str) -> String {
        self.record(format!("close_app {name}"))
    }
    async fn open_website(&self, url: &str) -> String {
        self.record(format!("open_website {url}"))
    }
    async fn google_search(&self, query: &str) -> String {
        self.record(format!("google_search {query}"))
    }
    async fn play_youtube(&self, query: &str) -> String {
        self.record(format!("play_youtube {query}"))
    }
    async fn system_control(&self, command: &str) -> String {
        self.record(format!("system_control {command}"))
    }
    async fn take_screenshot(&self, name: Option<&str>) -> String {
        self.record(format!("take_screenshot {}", name.unwrap_or("-")))
    }
    async fn volume_control(&self, action: &str, amount: Option<u32>) -> String {
        self.record(format!("volume_control {action} {amount:?}"))
    }
    async fn media_control(&self, action: &str) -> String {
        self.record(format!("media_control {action}"))
    }
    async fn clipboard(&self, action: &str, text: Option<&str>) -> String {
        self.record(format!("clipboard {action} {}", text.unwrap_or("-")))
    }
    async fn file_operations(&self, action: &str, path: &str, content: Option<&str>) -> String {
        self.record(format!("file_operations {action} {path} {}", content.unwrap_or("-")))
    }
    async fn brightness_control(&self, level: u32) -> String {
        self.record(format!("brightness_control {level}"))
    }
}

/// Research stand-in with a canned answer
#[derive(Default)]
pub struct CannedResearch {
    pub queries: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl Research for CannedResearch {
    async fn search_and_summarize(&self, query: &str, quick: bool) -> String {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), quick));
        format!("summary of {query}")
    }

    async fn wikipedia_summary(&self, query: &str) -> String {
        format!("According to Wikipedia: {query} is a topic.")
    }
}

/// Keeps every event for later inspection
#[derive(Default)]
pub struct CapturingNotifier {
    pub events: Mutex<Vec<Event>>,
}

impl CapturingNotifier {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for CapturingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub local: Arc<ScriptedModel>,
    pub cloud: Option<Arc<ScriptedModel>>,
    pub desktop: Arc<RecordingDesktop>,
    pub research: Arc<CannedResearch>,
    pub notifier: Arc<CapturingNotifier>,
    _dir: tempfile::TempDir,
}

pub fn harness(local: Arc<ScriptedModel>, cloud: Option<Arc<ScriptedModel>>) -> Harness {
    harness_with(local, cloud, |_| {})
}

pub fn harness_with(
    local: Arc<ScriptedModel>,
    cloud: Option<Arc<ScriptedModel>>,
    configure: impl FnOnce(&mut Config),
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default_config(dir.path().to_path_buf());
    configure(&mut config);

    let desktop = Arc::new(RecordingDesktop::default());
    let research = Arc::new(CannedResearch::default());
    let notifier = Arc::new(CapturingNotifier::default());

    let backends = Backends::new(
        cloud.clone().map(|c| c as Arc<dyn LanguageModel>),
        local.clone(),
    );
    let engine = Engine::new(
        config,
        backends,
        MemoryStore::in_memory().unwrap(),
        Collaborators {
            desktop: desktop.clone(),
            research: research.clone(),
            notifier: notifier.clone(),
        },
    );

    Harness {
        engine: Arc::new(engine),
        local,
        cloud,
        desktop,
        research,
        notifier,
        _dir: dir,
    }
}

/// Speech that hears a fixed script and records everything it says
pub struct ScriptedSpeech {
    heard: Mutex<VecDeque<Result<String, SpeechError>>>,
    pub spoken: Mutex<Vec<(String, String)>>,
}

impl ScriptedSpeech {
    pub fn new(lines: &[&str]) -> Arc<Self> {
        Self::with_results(lines.iter().map(|l| Ok(l.to_string())).collect())
    }

    /// Script that can also fail mid-way
    pub fn with_results(heard: Vec<Result<String, SpeechError>>) -> Arc<Self> {
        Arc::new(Self {
            heard: Mutex::new(heard.into()),
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn last_language(&self) -> Option<String> {
        self.spoken.lock().unwrap().last().map(|(_, lang)| lang.clone())
    }
}

#[async_trait]
impl Speech for ScriptedSpeech {
    async fn speak(&self, text: &str, language: &str) {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), language.to_string()));
    }

    async fn listen(&self, _language: &str) -> Result<String, SpeechError> {
        self.heard
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(SpeechError::InputClosed))
    }
}
