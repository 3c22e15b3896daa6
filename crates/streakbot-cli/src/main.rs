//! Streakbot CLI — entry point.
//!
//! # Commands
//!
//! - `streakbot gateway` — run every configured chat channel + the journal loop
//! - `streakbot chat [--user ID]` — local REPL speaking the same commands
//! - `streakbot history --user ID [--count N]` — print a log report from the store
//! - `streakbot status` — show configuration and store status
//! - `streakbot onboard` — initialize config + data directories

mod gateway;
mod helpers;
mod history_cmd;
mod onboard;
mod repl;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🔥 Streakbot — log one line a day, keep the streak alive
#[derive(Parser)]
#[command(name = "streakbot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway (all channels + journal loop)
    Gateway {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Keep logs in memory instead of the SQLite store
        #[arg(long, default_value_t = false)]
        memory: bool,
    },

    /// Talk to the journal from the terminal
    Chat {
        /// User id the entries are stored under (defaults to $USER)
        #[arg(short, long)]
        user: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Keep logs in memory instead of the SQLite store
        #[arg(long, default_value_t = false)]
        memory: bool,
    },

    /// Print a user's log report
    History {
        /// User id to report on
        #[arg(short, long)]
        user: String,

        /// Number of most recent entries to show (0 = all)
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Show configuration and store status
    Status,

    /// Initialize configuration and data directories
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Gateway { logs, memory } => {
            init_logging(logs);
            gateway::run(memory).await
        }
        Commands::Chat { user, logs, memory } => {
            init_logging(logs);
            let user = user.unwrap_or_else(helpers::default_user);
            repl::run(&user, memory).await
        }
        Commands::History { user, count } => {
            init_logging(false);
            history_cmd::run(&user, count).await
        }
        Commands::Status => {
            init_logging(false);
            status::run().await
        }
        Commands::Onboard => onboard::run(),
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("streakbot=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
