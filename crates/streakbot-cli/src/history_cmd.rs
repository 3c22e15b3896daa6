//! `streakbot history` — print a user's log report straight from the store.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use streakbot_core::config::load_config;
use streakbot_journal::{build_report, CommandParser, JournalSettings, LogStore, ReportSubject};

use crate::helpers;

/// Run the history command.
pub async fn run(user: &str, count: Option<usize>) -> Result<()> {
    let config = load_config(None);
    let settings = JournalSettings::from_config(&config.journal);
    let store = helpers::open_store(&config, false)?;

    let limit = count.unwrap_or(settings.default_log_count);
    let text = render_history(
        store.as_ref(),
        user,
        limit,
        settings.days.today(),
        &settings.command_prefix,
    )
    .await?;

    println!();
    println!("{text}");
    println!();
    Ok(())
}

/// Build the report text for `user`, or a hint when nothing is logged yet.
async fn render_history(
    store: &dyn LogStore,
    user: &str,
    limit: usize,
    today: NaiveDate,
    prefix: &str,
) -> Result<String> {
    let history = store
        .query_by_user(user)
        .await
        .with_context(|| format!("failed to read logs for {user}"))?;

    let log_command = CommandParser::new(prefix).spelled("logday");
    if history.is_empty() {
        return Ok(format!("No logs for {user} yet. Use {log_command} to start one."));
    }

    let subject = ReportSubject {
        display_name: user.to_string(),
        avatar_url: None,
    };
    let report = build_report(subject, &history, limit, today, &log_command);
    Ok(report.render_text())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
