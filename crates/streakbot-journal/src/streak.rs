//! Streak calculation over a user's logged days.

use chrono::{Days, NaiveDate};

/// Length of the unbroken run of consecutive days ending on `reference_day`.
///
/// `dates` must be ascending (oldest first), as the store returns them.
/// Walking from the most recent date, position `i` must equal
/// `reference_day - i` days; the first mismatch ends the run. A history whose
/// latest day is not `reference_day` has a streak of 0.
pub fn compute_streak(dates: &[NaiveDate], reference_day: NaiveDate) -> u32 {
    let mut count = 0;

    for (i, date) in dates.iter().rev().enumerate() {
        let expected = match reference_day.checked_sub_days(Days::new(i as u64)) {
            Some(day) => day,
            None => break,
        };
        if *date != expected {
            break;
        }
        count += 1;
    }

    count
}
