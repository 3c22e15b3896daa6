//! Gateway command — runs the chat channels and the journal loop.
//!
//! Startup sequence:
//! 1. Load config
//! 2. Open the journal store
//! 3. Create message bus + journal loop
//! 4. Create channel manager, register configured channels
//! 5. Run: `tokio::select!` of journal loop + channel manager
//! 6. Handle Ctrl+C for graceful shutdown

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use streakbot_channels::ChannelManager;
use streakbot_core::bus::queue::MessageBus;
use streakbot_core::config::{get_config_path, load_config, Config};
use streakbot_journal::{JournalLoop, JournalSettings};

use crate::helpers;

/// Run the gateway — starts the journal loop + channel manager.
pub async fn run(in_memory: bool) -> Result<()> {
    helpers::print_banner();
    println!("  Mode: Gateway");
    println!();

    let config = load_config(None);
    let settings = JournalSettings::from_config(&config.journal);
    let store = helpers::open_store(&config, in_memory)?;
    let store_desc = store.describe();

    // Shared between the journal loop and the channels
    let bus = Arc::new(MessageBus::new(100));
    let prefix = settings.command_prefix.clone();
    let journal = JournalLoop::new(bus.clone(), store, settings);

    let channel_manager = build_channel_manager(&config, bus.clone());

    info!(
        store = %store_desc,
        prefix = %prefix,
        channels = ?channel_manager.channel_names(),
        "gateway starting"
    );

    println!("  Store:     {store_desc}");
    println!("  Commands:  {prefix}logday, {prefix}getlogs [n], {prefix}help");
    println!("  Channels:  {} registered", channel_manager.len());
    println!();

    if channel_manager.is_empty() {
        println!("  ⚠  No channels registered. Add a Discord or Telegram token to");
        println!("     {} and build with --features discord,telegram.", get_config_path().display());
        println!();
    }

    println!("  Ctrl+C to stop");
    println!();

    tokio::select! {
        _ = journal.run() => {
            info!("journal loop exited");
        }
        result = channel_manager.start_all() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "channel manager error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            info!("received Ctrl+C, shutting down");
            channel_manager.stop_all().await;
        }
    }

    println!("  Gateway stopped. Goodbye!");
    Ok(())
}

/// Register every channel that is both compiled in and configured.
fn build_channel_manager(config: &Config, bus: Arc<MessageBus>) -> ChannelManager {
    #[allow(unused_mut)]
    let mut channel_manager = ChannelManager::new(bus.clone());

    #[cfg(feature = "telegram")]
    {
        let tg = &config.channels.telegram;
        if tg.is_configured() {
            use streakbot_channels::telegram::TelegramChannel;
            let telegram = TelegramChannel::new(tg.token.clone(), bus.clone(), tg.allowed_users.clone());
            channel_manager.register(Arc::new(telegram));
        }
    }

    #[cfg(feature = "discord")]
    {
        let dc = &config.channels.discord;
        if dc.is_configured() {
            use streakbot_channels::discord::DiscordChannel;
            let discord = DiscordChannel::new(dc.token.clone(), bus.clone(), dc.allowed_users.clone());
            channel_manager.register(Arc::new(discord));
        }
    }

    #[cfg(not(any(feature = "telegram", feature = "discord")))]
    let _ = (config, bus);

    channel_manager
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
