use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::notify::Event;
use crate::rules::Reply;
use crate::speech::{Speech, SpeechError};

pub const LISTENING_ACK: &str = "Yes? I'm listening.";
pub const SLEEP_ACK: &str = "Going to sleep.";
pub const ERROR_REPLY: &str = "I encountered an error.";
const EXIT_PHRASES: &[&str] = &["exit", "stop", "quit", "go to sleep"];
const MUTED_POLL: Duration = Duration::from_millis(500);

/// What one iteration of the loop did
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Microphone disabled, nothing heard
    Muted,
    /// Asleep and the wake word was not heard
    Standby,
    /// Woken by a bare wake word
    Woke,
    /// Active but nothing was said
    Silence,
    /// Continuous-mode idle timeout elapsed
    TimedOut,
    /// Deactivated by silence or an exit phrase
    Slept,
    LanguageSwitched(String),
    Replied(Reply),
}

/// True when the whole utterance is a request to stop listening
pub fn is_exit_phrase(command: &str) -> bool {
    let command = command
        .trim()
        .trim_end_matches(['.', '!'])
        .to_lowercase();
    EXIT_PHRASES.contains(&command.as_str())
}

pub struct VoiceLoop {
    engine: Arc<Engine>,
    speech: Arc<dyn Speech>,
    mic_enabled: AtomicBool,
}

impl VoiceLoop {
    pub fn new(engine: Arc<Engine>, speech: Arc<dyn Speech>) -> Self {
        Self {
            engine,
            speech,
            mic_enabled: AtomicBool::new(true),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn set_mic_enabled(&self, enabled: bool) {
        self.mic_enabled.store(enabled, Ordering::SeqCst);
        self.engine
            .notifier()
            .notify(Event::Mic { listening: enabled });
    }

    /// Greet, then step until input closes or Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let assistant = &self.engine.config().assistant;
        self.speech
            .speak(&format!("{} online.", assistant.name), &assistant.default_language)
            .await;
        self.engine
            .notifier()
            .notify(Event::status("Waiting for Wake Word"));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.speech
                        .speak("Shutting down manually.", &assistant.default_language)
                        .await;
                    break;
                }
                result = self.step() => match result {
                    Ok(step) => tracing::trace!(?step, "voice loop step"),
                    Err(SpeechError::InputClosed) => {
                        tracing::info!("speech input closed, stopping voice loop");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "voice loop iteration failed");
                        self.speech.speak(ERROR_REPLY, &assistant.default_language).await;
                        self.set_active(false);
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn step(&self) -> Result<Step, SpeechError> {
        if !self.mic_enabled.load(Ordering::SeqCst) {
            tokio::time::sleep(MUTED_POLL).await;
            return Ok(Step::Muted);
        }

        let assistant = &self.engine.config().assistant;
        let snapshot = self.engine.state().snapshot();

        let command = if !snapshot.active {
            self.engine.notifier().notify(Event::status("Standby..."));
            let heard = self.listen(&assistant.default_language).await?;
            let wake = assistant.wake_word.to_lowercase();
            let Some(pos) = heard.find(&wake) else {
                return Ok(Step::Standby);
            };

            self.engine.state().update(|s| {
                s.active = true;
                s.touch();
            });
            let rest = format!("{} {}", &heard[..pos], &heard[pos + wake.len()..])
                .trim()
                .to_string();
            if rest.is_empty() {
                self.speech
                    .speak(LISTENING_ACK, &assistant.default_language)
                    .await;
                return Ok(Step::Woke);
            }
            tracing::info!(command = %rest, "one-shot command after wake word");
            rest
        } else {
            let timeout = Duration::from_secs(assistant.continuous_timeout_secs);
            if assistant.continuous_mode && snapshot.idle_for() > timeout {
                tracing::info!("continuous mode timeout, returning to standby");
                self.set_active(false);
                self.engine.notifier().notify(Event::status("Standby..."));
                return Ok(Step::TimedOut);
            }

            let heard = self.listen(&snapshot.current_language).await?;
            if heard.is_empty() {
                if assistant.continuous_mode {
                    return Ok(Step::Silence);
                }
                self.set_active(false);
                return Ok(Step::Slept);
            }
            heard
        };

        self.handle(&command).await
    }

    async fn handle(&self, command: &str) -> Result<Step, SpeechError> {
        let state = self.engine.state();
        state.update(|s| s.touch());
        let language = state.snapshot().current_language;

        if is_exit_phrase(command) {
            self.speech.speak(SLEEP_ACK, &language).await;
            self.set_active(false);
            return Ok(Step::Slept);
        }

        if let Some((name, code)) = self.language_switch(command) {
            tracing::info!(language = %code, "switching speech language");
            state.update(|s| s.current_language = code.clone());
            self.speech
                .speak(&format!("Okay, switching to {name}."), &code)
                .await;
            return Ok(Step::LanguageSwitched(code));
        }

        match self.engine.process(command, &language).await {
            Some(reply) => {
                self.speech.speak(&reply.text, &language).await;
                state.update(|s| s.touch());
                Ok(Step::Replied(reply))
            }
            None => Ok(Step::Silence),
        }
    }

    fn language_switch(&self, command: &str) -> Option<(String, String)> {
        self.engine
            .config()
            .languages
            .iter()
            .find(|(name, _)| {
                command.contains(&format!("speak in {name}"))
                    || command.contains(&format!("change language to {name}"))
            })
            .map(|(name, code)| (name.clone(), code.clone()))
    }

    async fn listen(&self, language: &str) -> Result<String, SpeechError> {
        let notifier = self.engine.notifier();
        notifier.notify(Event::Mic { listening: true });
        let heard = self.speech.listen(language).await;
        notifier.notify(Event::Mic { listening: false });
        Ok(heard?.trim().to_lowercase())
    }

    fn set_active(&self, active: bool) {
        self.engine.state().update(|s| s.active = active);
    }
}
