//! `streakbot status` — show configuration, store and channel status.

use anyhow::Result;
use colored::Colorize;

use streakbot_core::config::{get_config_path, load_config, Config};
use streakbot_core::utils::{expand_home, mask_secret};

use crate::helpers;

/// Run the status command.
pub async fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "🔥 Streakbot Status".yellow().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        found_mark(config_path.exists())
    );

    let store_path = expand_home(&config.store.path);
    println!(
        "  {:<18} {} {}",
        "Store:".bold(),
        store_path.display(),
        found_mark(store_path.exists())
    );

    if store_path.exists() {
        match helpers::open_store(&config, false) {
            Ok(store) => match store.count_entries().await {
                Ok(count) => println!("  {:<18} {}", "Entries:".bold(), count),
                Err(e) => println!("  {:<18} {}", "Entries:".bold(), format!("unreadable ({e})").red()),
            },
            Err(e) => println!("  {:<18} {}", "Entries:".bold(), format!("unreadable ({e})").red()),
        }
    }

    let journal = &config.journal;
    println!(
        "  {:<18} prefix {} | reply timeout {}s | default count {} | UTC{:+}m",
        "Journal:".bold(),
        journal.command_prefix,
        journal.reply_timeout_secs,
        journal.default_log_count,
        journal.utc_offset_minutes,
    );

    println!();
    println!("  {}", "Channels:".bold());
    for (name, line) in channel_lines(&config) {
        println!("    {:<20} {}", name, line);
    }
    println!();

    Ok(())
}

fn found_mark(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}

/// One status line per supported channel.
fn channel_lines(config: &Config) -> Vec<(&'static str, String)> {
    let channels = &config.channels;
    vec![
        (
            "Discord",
            channel_line(&channels.discord.token, channels.discord.allowed_users.len(), cfg!(feature = "discord")),
        ),
        (
            "Telegram",
            channel_line(&channels.telegram.token, channels.telegram.allowed_users.len(), cfg!(feature = "telegram")),
        ),
    ]
}

fn channel_line(token: &str, allowed: usize, compiled: bool) -> String {
    let mut line = if token.is_empty() {
        "· not configured".to_string()
    } else if allowed == 0 {
        format!("✓ token {} (everyone allowed)", mask_secret(token))
    } else {
        format!("✓ token {} ({allowed} allowed users)", mask_secret(token))
    };
    if !compiled {
        line.push_str(" [not compiled in]");
    }
    line
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
