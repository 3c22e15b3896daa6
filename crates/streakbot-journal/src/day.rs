//! Day boundary — the single rule that turns an instant into a calendar day.
//!
//! Both the write path (which day a log belongs to) and the read path (which
//! day a streak must end on) go through the same `DayBoundary`, so a log and
//! the streak check made right after it always agree on "today".

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Cuts days at midnight of a fixed UTC offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayBoundary {
    offset: FixedOffset,
}

impl DayBoundary {
    /// Days cut at UTC midnight.
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Days cut at midnight of `minutes` east of UTC.
    ///
    /// Returns `None` when the offset is a day or more away from UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        let seconds = minutes.checked_mul(60)?;
        FixedOffset::east_opt(seconds).map(|offset| Self { offset })
    }

    /// The calendar day `instant` falls on.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// The calendar day right now.
    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self::utc()
    }
}
