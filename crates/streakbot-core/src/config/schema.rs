//! Configuration schema.
//!
//! Hierarchy: `Config` → `JournalConfig`, `StoreConfig`, `ChannelsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.streakbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub journal: JournalConfig,
    pub store: StoreConfig,
    pub channels: ChannelsConfig,
}

// ─────────────────────────────────────────────
// Journal
// ─────────────────────────────────────────────

/// Command handling and day-boundary settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalConfig {
    /// Prefix for chat commands (`$logday`, `$getlogs`).
    pub command_prefix: String,
    /// How long `$logday` waits for the user's reply.
    pub reply_timeout_secs: u64,
    /// Entries shown by `$getlogs` when no count is given.
    pub default_log_count: usize,
    /// Fixed offset from UTC, in minutes, used to cut days. 0 = UTC midnight.
    pub utc_offset_minutes: i32,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            command_prefix: "$".to_string(),
            reply_timeout_secs: 30,
            default_log_count: 10,
            utc_offset_minutes: 0,
        }
    }
}

// ─────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────

/// Journal store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// SQLite database file. `~` is expanded.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.streakbot/journal.db".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────

/// All channel configurations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Discord channel config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl DiscordConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Telegram channel config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
