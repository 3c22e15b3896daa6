//! Journal data types shared between the journal core and the channels.
//!
//! `LogEntry` is the persisted record. `LogReport` is the read-side result
//! handed to channels for rendering; it is never stored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage format for `log_date`. ISO order equals calendar order.
pub const STORE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for dates in replies (e.g. `3/7/2024`).
pub const DISPLAY_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// One logged day for one user. At most one exists per `(user_id, log_date)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub user_id: String,
    pub log_date: NaiveDate,
    pub message: String,
}

impl LogEntry {
    pub fn new(user_id: impl Into<String>, log_date: NaiveDate, message: impl Into<String>) -> Self {
        LogEntry {
            user_id: user_id.into(),
            log_date,
            message: message.into(),
        }
    }
}

/// Format a date the way replies show it.
pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// A single row of a log report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// 1-based position in the user's full history (not in the window).
    pub day_number: usize,
    pub log_date: NaiveDate,
    pub message: String,
}

impl ReportEntry {
    /// Heading shown above the entry, e.g. `Day 3   |   3/7/2024`.
    pub fn heading(&self) -> String {
        format!("Day {}   |   {}", self.day_number, display_date(self.log_date))
    }
}

/// Read-side result of a history query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReport {
    /// Display name of the user the report belongs to.
    pub display_name: String,
    /// Avatar image URL, when the channel knows one.
    pub avatar_url: Option<String>,
    /// Windowed entries, oldest first.
    pub entries: Vec<ReportEntry>,
    /// Number of logged days in the full history.
    pub total: usize,
    /// Current consecutive-day streak ending on the reference day.
    pub streak: u32,
    /// Command that adds a new log, for the report footer.
    pub log_command: String,
}

impl LogReport {
    /// Report title.
    pub fn title(&self) -> String {
        format!("{} log report", self.display_name)
    }

    /// Summary line, e.g. `Showing 10 out of 42 logged days`.
    pub fn summary(&self) -> String {
        self.summary_showing(self.entries.len())
    }

    /// Summary line for renderers that can only show `shown` of the entries.
    pub fn summary_showing(&self, shown: usize) -> String {
        format!("Showing {} out of {} logged days", shown, self.total)
    }

    /// Footer hint.
    pub fn footer(&self) -> String {
        format!("Add a new log with `{}`", self.log_command)
    }

    /// Plain-text rendering, for channels without rich output.
    pub fn render_text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.title(), self.summary());
        for entry in &self.entries {
            out.push('\n');
            out.push_str(&entry.heading());
            out.push('\n');
            out.push_str(&entry.message);
            out.push('\n');
        }
        out.push_str(&format!(
            "\nDays completed: {}\nCurrent Streak: {}\n{}",
            self.total,
            self.streak,
            self.footer()
        ));
        out
    }
}
