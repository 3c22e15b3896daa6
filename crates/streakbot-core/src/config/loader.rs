//! Config loader — reads `~/.streakbot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.streakbot/config.json`
//! 3. Environment variables `STREAKBOT_<SECTION>__<FIELD>` (override JSON)
//! 4. `DISCORD_TOKEN` / `TELEGRAM_TOKEN` when the channel token is still empty

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path (or `path`) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    apply_env_overrides(load_config_from_path(&config_path), |key| {
        std::env::var(key).ok()
    })
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `STREAKBOT_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `STREAKBOT_JOURNAL__COMMAND_PREFIX` → `journal.command_prefix`
/// - `STREAKBOT_JOURNAL__REPLY_TIMEOUT_SECS` → `journal.reply_timeout_secs`
/// - `STREAKBOT_JOURNAL__DEFAULT_LOG_COUNT` → `journal.default_log_count`
/// - `STREAKBOT_JOURNAL__UTC_OFFSET_MINUTES` → `journal.utc_offset_minutes`
/// - `STREAKBOT_STORE__PATH` → `store.path`
/// - `STREAKBOT_CHANNELS__DISCORD__TOKEN` → `channels.discord.token`
/// - `STREAKBOT_CHANNELS__TELEGRAM__TOKEN` → `channels.telegram.token`
fn apply_env_overrides<F>(mut config: Config, var: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // Journal
    if let Some(val) = var("STREAKBOT_JOURNAL__COMMAND_PREFIX") {
        if !val.is_empty() {
            config.journal.command_prefix = val;
        }
    }
    if let Some(val) = var("STREAKBOT_JOURNAL__REPLY_TIMEOUT_SECS") {
        match val.parse::<u64>() {
            Ok(n) => config.journal.reply_timeout_secs = n,
            Err(_) => warn!(value = %val, "ignoring invalid STREAKBOT_JOURNAL__REPLY_TIMEOUT_SECS"),
        }
    }
    if let Some(val) = var("STREAKBOT_JOURNAL__DEFAULT_LOG_COUNT") {
        match val.parse::<usize>() {
            Ok(n) => config.journal.default_log_count = n,
            Err(_) => warn!(value = %val, "ignoring invalid STREAKBOT_JOURNAL__DEFAULT_LOG_COUNT"),
        }
    }
    if let Some(val) = var("STREAKBOT_JOURNAL__UTC_OFFSET_MINUTES") {
        match val.parse::<i32>() {
            Ok(n) => config.journal.utc_offset_minutes = n,
            Err(_) => warn!(value = %val, "ignoring invalid STREAKBOT_JOURNAL__UTC_OFFSET_MINUTES"),
        }
    }

    // Store
    if let Some(val) = var("STREAKBOT_STORE__PATH") {
        config.store.path = val;
    }

    // Channels
    if let Some(val) = var("STREAKBOT_CHANNELS__DISCORD__TOKEN") {
        config.channels.discord.token = val;
    }
    if let Some(val) = var("STREAKBOT_CHANNELS__TELEGRAM__TOKEN") {
        config.channels.telegram.token = val;
    }

    // Plain token variables, as used by a `.env` file next to the bot
    if config.channels.discord.token.is_empty() {
        if let Some(val) = var("DISCORD_TOKEN") {
            config.channels.discord.token = val;
        }
    }
    if config.channels.telegram.token.is_empty() {
        if let Some(val) = var("TELEGRAM_TOKEN") {
            config.channels.telegram.token = val;
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn with_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.journal.reply_timeout_secs, 30);
        assert_eq!(config.journal.default_log_count, 10);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "journal": {
                "commandPrefix": "!",
                "defaultLogCount": 7
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.journal.command_prefix, "!");
        assert_eq!(config.journal.default_log_count, 7);
        // Default preserved
        assert_eq!(config.journal.reply_timeout_secs, 30);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.journal.command_prefix, "$");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.journal.utc_offset_minutes = 120;
        config.channels.discord.token = "discord-token".to_string();

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.journal.utc_offset_minutes, 120);
        assert_eq!(reloaded.channels.discord.token, "discord-token");
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(raw["journal"].get("commandPrefix").is_some());
        assert!(raw["journal"].get("command_prefix").is_none());
    }

    #[test]
    fn test_env_override_journal() {
        let config = apply_env_overrides(
            Config::default(),
            with_env(&[
                ("STREAKBOT_JOURNAL__COMMAND_PREFIX", "!"),
                ("STREAKBOT_JOURNAL__REPLY_TIMEOUT_SECS", "45"),
                ("STREAKBOT_JOURNAL__DEFAULT_LOG_COUNT", "3"),
                ("STREAKBOT_JOURNAL__UTC_OFFSET_MINUTES", "-480"),
            ]),
        );
        assert_eq!(config.journal.command_prefix, "!");
        assert_eq!(config.journal.reply_timeout_secs, 45);
        assert_eq!(config.journal.default_log_count, 3);
        assert_eq!(config.journal.utc_offset_minutes, -480);
    }

    #[test]
    fn test_env_override_invalid_number_ignored() {
        let config = apply_env_overrides(
            Config::default(),
            with_env(&[("STREAKBOT_JOURNAL__REPLY_TIMEOUT_SECS", "soon")]),
        );
        assert_eq!(config.journal.reply_timeout_secs, 30);
    }

    #[test]
    fn test_env_override_store_and_tokens() {
        let config = apply_env_overrides(
            Config::default(),
            with_env(&[
                ("STREAKBOT_STORE__PATH", "/data/journal.db"),
                ("STREAKBOT_CHANNELS__DISCORD__TOKEN", "dc-token"),
                ("STREAKBOT_CHANNELS__TELEGRAM__TOKEN", "tg-token"),
            ]),
        );
        assert_eq!(config.store.path, "/data/journal.db");
        assert_eq!(config.channels.discord.token, "dc-token");
        assert_eq!(config.channels.telegram.token, "tg-token");
    }

    #[test]
    fn test_plain_discord_token_fallback() {
        let config = apply_env_overrides(Config::default(), with_env(&[("DISCORD_TOKEN", "plain")]));
        assert_eq!(config.channels.discord.token, "plain");
    }

    #[test]
    fn test_plain_token_does_not_override_configured() {
        let mut base = Config::default();
        base.channels.discord.token = "from-file".into();

        let config = apply_env_overrides(base, with_env(&[("DISCORD_TOKEN", "plain")]));
        assert_eq!(config.channels.discord.token, "from-file");
    }
}
