//! Interactive REPL — a local "cli" channel on top of the journal loop.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Lines go onto the bus like any chat message; replies come back through
//! `CliChannel::send` and are printed as they arrive.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error};

use streakbot_channels::{Channel, ChannelManager};
use streakbot_core::bus::queue::MessageBus;
use streakbot_core::bus::types::{InboundMessage, OutboundMessage};
use streakbot_core::config::load_config;
use streakbot_core::utils::get_history_path;
use streakbot_journal::{JournalLoop, JournalSettings};

use crate::helpers;

/// Channel name for local messages.
const CLI_CHANNEL: &str = "cli";

/// Chat id of the single local conversation.
const CLI_CHAT_ID: &str = "local";

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

// ─────────────────────────────────────────────
// CliChannel
// ─────────────────────────────────────────────

/// Terminal channel. Input is fed by the REPL loop; `send` prints replies.
#[derive(Default)]
pub struct CliChannel {
    shutdown: Arc<Notify>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        CLI_CHANNEL
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.shutdown.notified().await;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.shutdown.notify_waiters();
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        let body = match &msg.report {
            Some(report) => report.render_text(),
            None => msg.content.clone(),
        };
        println!();
        println!("{}", "🔥 Streakbot".yellow().bold());
        println!("{body}");
        println!();
        Ok(())
    }
}

/// Wrap one REPL line as a bus message from `user`.
fn local_inbound(user: &str, line: &str) -> InboundMessage {
    let mut inbound = InboundMessage::new(CLI_CHANNEL, user, CLI_CHAT_ID, line);
    inbound.metadata.insert("username".into(), user.to_string());
    inbound
}

// ─────────────────────────────────────────────
// REPL loop
// ─────────────────────────────────────────────

/// Run the interactive REPL loop.
pub async fn run(user: &str, in_memory: bool) -> Result<()> {
    let config = load_config(None);
    let settings = JournalSettings::from_config(&config.journal);
    let prefix = settings.command_prefix.clone();
    let store = helpers::open_store(&config, in_memory)?;

    let bus = Arc::new(MessageBus::new(100));
    let journal = Arc::new(JournalLoop::new(bus.clone(), store, settings));
    let mut manager = ChannelManager::new(bus.clone());
    manager.register(Arc::new(CliChannel::new()));
    let manager = Arc::new(manager);

    let journal_task = {
        let journal = journal.clone();
        tokio::spawn(async move { journal.run().await })
    };
    let manager_task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.start_all().await })
    };

    helpers::print_banner();
    println!(
        "{}",
        format!("Logging as \"{user}\". Try {prefix}logday, {prefix}getlogs or {prefix}help; \"exit\" quits.").dimmed()
    );
    println!();

    // rustyline blocks, so it gets its own thread
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    let reader = std::thread::spawn(move || read_lines(line_tx));

    while let Some(line) = line_rx.recv().await {
        debug!(user = user, input = %line, "local input");
        if let Err(e) = bus.publish_inbound(local_inbound(user, &line)).await {
            error!(error = %e, "failed to publish local message");
            break;
        }
    }

    manager.stop_all().await;
    journal_task.abort();
    let _ = manager_task.await;
    let _ = reader.join();

    println!("\nGoodbye! 👋");
    Ok(())
}

/// Read lines until EOF, Ctrl-C or an exit command, forwarding each one.
fn read_lines(tx: mpsc::Sender<String>) {
    let mut editor = match create_editor() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Input error: {e}");
            return;
        }
    };

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            break;
        }

        let _ = editor.add_history_entry(&input);
        if tx.blocking_send(trimmed.to_string()).is_err() {
            break;
        }
    }

    save_history(&mut editor);
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    get_history_path().join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
