//! Streakbot Journal — daily logs, streaks, and the chat command loop.
//!
//! This crate contains:
//! - **store**: `LogStore` trait with SQLite and in-memory backends
//! - **recorder**: once-per-day log recording
//! - **streak** / **window**: streak calculation and history windowing
//! - **command** / **collector**: command parsing and `$logday` reply collection
//! - **journal_loop**: the bus-driven dispatch loop

pub mod collector;
pub mod command;
pub mod day;
pub mod error;
pub mod journal_loop;
pub mod recorder;
pub mod report;
pub mod store;
pub mod streak;
pub mod window;

pub use command::{parse_command, ArgError, Command, CommandParser};
pub use day::DayBoundary;
pub use error::{JournalError, StoreError};
pub use journal_loop::{JournalLoop, JournalSettings};
pub use recorder::{LogRecorder, Saved};
pub use report::{build_report, ReportSubject};
pub use store::{LogStore, MemoryStore, PutOutcome, SqliteStore};
pub use streak::compute_streak;
pub use window::select_window;
