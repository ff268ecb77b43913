use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::core::Role;
use crate::state::ModeSnapshot;
use crate::telemetry::SystemStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Status {
        text: String,
    },
    Conversation {
        role: Role,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<String>,
    },
    Mode(ModeSnapshot),
    Mic {
        listening: bool,
    },
    SystemStats(SystemStats),
}

impl Event {
    pub fn status(text: impl Into<String>) -> Self {
        Event::Status { text: text.into() }
    }
}

/// Must return promptly; implementations never wait on consumers.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Writes every event to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match &event {
            Event::SystemStats(_) => tracing::trace!(?event, "event"),
            _ => tracing::debug!(?event, "event"),
        }
    }
}

/// Fans events out to any number of subscribers.
///
/// Slow subscribers lose the oldest events; sending with nobody listening
/// is not an error.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<Event>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}
