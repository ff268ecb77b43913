use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::StoreError;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            // older history files recorded replies under "model"
            "assistant" | "model" | "sami" => Ok(Role::Assistant),
            other => Err(StoreError::Parse(format!("unknown role: {}", other))),
        }
    }
}

/// A single entry of the append-only conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Row id; insertion order is the only ordering guarantee
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// `ROLE: content`, the form used inside prompts
    pub fn prompt_line(&self) -> String {
        format!("{}: {}", self.role.as_str().to_uppercase(), self.content)
    }
}

/// Durable profile/preference value keyed by `(category, key)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub category: String,
    pub key: String,
    pub value: String,
}
