use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::{Result, StoreError};
use super::memory::{ConversationTurn, Role, SettingEntry};

pub const USER_PROFILE: &str = "user_profile";
pub const PREFERENCES: &str = "preferences";

/// SQLite-backed conversation log and settings store
pub struct MemoryStore {
    conn: Connection,
}

impl MemoryStore {
    /// Open (or create) the store at the given database path
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// Volatile store, used by tests
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                category TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (category, key)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Append a turn. No size cap is enforced.
    pub fn add_turn(&self, role: Role, content: &str) -> Result<ConversationTurn> {
        let timestamp = Utc::now();
        self.conn.execute(
            "INSERT INTO history (role, content, timestamp) VALUES (?1, ?2, ?3)",
            params![role.as_str(), content, timestamp.to_rfc3339()],
        )?;

        Ok(ConversationTurn {
            id: self.conn.last_insert_rowid(),
            role,
            content: content.to_string(),
            timestamp,
        })
    }

    /// The most recent `limit` turns, oldest first
    pub fn recent_turns(&self, limit: usize) -> Result<Vec<ConversationTurn>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, role, content, timestamp FROM history ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let role: String = row.get(1)?;
                let timestamp: String = row.get(3)?;

                Ok(ConversationTurn {
                    id: row.get(0)?,
                    role: role.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    content: row.get(2)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                3,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().rev().collect())
    }

    pub fn turn_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Last write wins
    pub fn set_setting(&self, category: &str, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (category, key, value) VALUES (?1, ?2, ?3)",
            params![category, key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, category: &str, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE category = ?1 AND key = ?2",
                params![category, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// All entries of a category, ordered by key
    pub fn all_settings(&self, category: &str) -> Result<Vec<SettingEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, key, value FROM settings WHERE category = ?1 ORDER BY key",
        )?;

        let entries = stmt
            .query_map(params![category], |row| {
                Ok(SettingEntry {
                    category: row.get(0)?,
                    key: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Profile and preferences rendered for prompt injection
    pub fn context_summary(&self) -> Result<String> {
        let profile = self.all_settings(USER_PROFILE)?;
        let prefs = self.all_settings(PREFERENCES)?;

        let mut summary = String::from("Persistent Memory Context:\n");
        if !profile.is_empty() {
            summary.push_str("User Profile:\n");
            for entry in &profile {
                summary.push_str(&format!("- {}: {}\n", entry.key, entry.value));
            }
        }
        if !prefs.is_empty() {
            summary.push_str("Preferences:\n");
            for entry in &prefs {
                summary.push_str(&format!("- {}: {}\n", entry.key, entry.value));
            }
        }

        Ok(summary)
    }

    /// Recent turns as `ROLE: content` lines
    pub fn context_window(&self, limit: usize) -> Result<String> {
        let mut window = String::new();
        for turn in self.recent_turns(limit)? {
            window.push_str(&turn.prompt_line());
            window.push('\n');
        }
        Ok(window)
    }

    /// Import a legacy `memory.json` when the history table is still empty.
    ///
    /// Returns `true` when something was imported. The source file is renamed
    /// to `memory.json.bak` afterwards so the import never runs twice.
    pub fn migrate_legacy_json(&self, path: &Path) -> Result<bool> {
        if !path.exists() || self.turn_count()? > 0 {
            return Ok(false);
        }

        let data: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;

        for category in [USER_PROFILE, PREFERENCES] {
            if let Some(map) = data.get(category).and_then(Value::as_object) {
                let ordered: BTreeMap<_, _> = map.iter().collect();
                for (key, value) in ordered {
                    self.set_setting(category, key, &value_text(value))?;
                }
            }
        }

        if let Some(history) = data.get("history").and_then(Value::as_array) {
            for item in history {
                let role = item.get("role").and_then(Value::as_str).unwrap_or("user");
                let content = item.get("content").map(value_text).unwrap_or_default();
                self.add_turn(role.parse()?, &content)?;
            }
        }

        let mut backup = path.as_os_str().to_owned();
        backup.push(".bak");
        std::fs::rename(path, PathBuf::from(backup))?;

        Ok(true)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
