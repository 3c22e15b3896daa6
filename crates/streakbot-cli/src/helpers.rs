//! Shared CLI helpers — store opening, banner, local user id.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use streakbot_core::config::Config;
use streakbot_core::utils::expand_home;
use streakbot_journal::{LogStore, MemoryStore, SqliteStore};

/// Open the journal store named in the config, or an in-memory one.
pub fn open_store(config: &Config, in_memory: bool) -> Result<Arc<dyn LogStore>> {
    if in_memory {
        return Ok(Arc::new(MemoryStore::new()));
    }

    let path = expand_home(&config.store.path);
    let store = SqliteStore::open(&path)
        .with_context(|| format!("failed to open journal store at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// User id for local commands when none is given.
pub fn default_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "local".to_string())
}

/// Print the banner shown at REPL and gateway start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🔥 Streakbot".yellow().bold(), version.dimmed());
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
