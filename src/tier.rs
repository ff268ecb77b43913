use std::fmt;

use crate::state::AssistantState;

/// Keywords whose answers go stale after a model's training cutoff
pub const LIVE_DATA_KEYWORDS: &[&str] = &[
    "price",
    "cost",
    "buy",
    "latest",
    "news",
    "release date",
    "launch",
    "stock",
    "weather",
];

/// Language-model tier used once the rules have passed on a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Quick,
    Standard,
    Deep,
}

impl Tier {
    /// Quick mode wins over deep; the state never has both set
    pub fn select(state: &AssistantState) -> Self {
        if state.quick_response_mode() {
            Tier::Quick
        } else if state.deep_think_mode() {
            Tier::Deep
        } else {
            Tier::Standard
        }
    }

    /// Conversation turns included in the prompt
    pub fn history_limit(&self) -> usize {
        match self {
            Tier::Quick => 2,
            Tier::Standard | Tier::Deep => 5,
        }
    }

    /// Cap on executed tool actions per reply
    pub fn max_actions(&self) -> Option<usize> {
        match self {
            Tier::Quick => Some(1),
            Tier::Standard | Tier::Deep => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Quick => write!(f, "quick"),
            Tier::Standard => write!(f, "standard"),
            Tier::Deep => write!(f, "deep"),
        }
    }
}

pub fn wants_live_data(command: &str) -> bool {
    let lower = command.to_lowercase();
    LIVE_DATA_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Strip filler words before handing a command to web search
pub fn search_query(command: &str) -> String {
    let mut query = command.to_lowercase();
    for filler in ["price", "cost", "search"] {
        query = query.replace(filler, "");
    }
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}
