//! Display window over a user's history.

/// The most recent `limit` items, oldest first.
///
/// `limit == 0` and `limit >= history.len()` both return the whole history.
/// Only bounds what is displayed; streaks are computed on the full history.
pub fn select_window<T>(history: &[T], limit: usize) -> &[T] {
    if limit == 0 || limit >= history.len() {
        history
    } else {
        &history[history.len() - limit..]
    }
}
