//! `streakbot onboard` — initialize configuration and data directories.
//!
//! - Creates `~/.streakbot/config.json` with defaults
//! - Creates the data and REPL history directories

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use streakbot_core::config::{save_config, Config};
use streakbot_core::utils::get_data_path;

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔥 Streakbot — Setup".yellow().bold());
    println!();

    onboard_into(&get_data_path())?;

    println!();
    println!(
        "{}",
        "  Setup complete! Add a bot token to config.json, then run `streakbot gateway`,".green()
    );
    println!("{}", "  or try it locally with `streakbot chat`.".green());
    println!();

    Ok(())
}

/// Create config and directories under `data_dir`, keeping anything that exists.
fn onboard_into(data_dir: &Path) -> Result<()> {
    let config_path = data_dir.join("config.json");

    if config_path.exists() {
        println!("  {} config already exists at {}", "✓".green(), config_path.display());
    } else {
        let mut config = Config::default();
        config.store.path = data_dir.join("journal.db").to_string_lossy().into_owned();
        save_config(&config, Some(&config_path))
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("  {} created config at {}", "✓".green(), config_path.display());
    }

    let history_dir = data_dir.join("history");
    std::fs::create_dir_all(&history_dir)
        .with_context(|| format!("failed to create {}", history_dir.display()))?;
    println!("  {} history dir at {}", "✓".green(), history_dir.display());

    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
