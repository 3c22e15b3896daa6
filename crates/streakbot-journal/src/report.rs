//! Builds the read-side `LogReport` from a user's full history.

use chrono::NaiveDate;

use streakbot_core::types::{LogEntry, LogReport, ReportEntry};

use crate::streak::compute_streak;
use crate::window::select_window;

/// Who the report is for, as the channel knows them.
#[derive(Clone, Debug, Default)]
pub struct ReportSubject {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Window the history to `limit` entries and compute total and streak.
///
/// `history` must be the user's complete history, ascending. Day numbers are
/// positions in that complete history, so windowing never renumbers entries.
pub fn build_report(
    subject: ReportSubject,
    history: &[LogEntry],
    limit: usize,
    reference_day: NaiveDate,
    log_command: &str,
) -> LogReport {
    let dates: Vec<NaiveDate> = history.iter().map(|e| e.log_date).collect();
    let streak = compute_streak(&dates, reference_day);

    let window = select_window(history, limit);
    let first_number = history.len() - window.len() + 1;
    let entries = window
        .iter()
        .enumerate()
        .map(|(i, entry)| ReportEntry {
            day_number: first_number + i,
            log_date: entry.log_date,
            message: entry.message.clone(),
        })
        .collect();

    LogReport {
        display_name: subject.display_name,
        avatar_url: subject.avatar_url,
        entries,
        total: history.len(),
        streak,
        log_command: log_command.to_string(),
    }
}
