//! Which trains are still worth showing.
//!
//! A train stays listed for a short grace period after departure so
//! stragglers can still find it, and nothing past the end of the current
//! calendar day is listed at all. The server uses the bounds to build its
//! store query; clients use [`VisibilityWindow::contains`] to re-derive their
//! board locally. Both go through this one type.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};

use crate::models::{Train, TrainStatus};

/// Minutes a train stays visible after its departure time.
pub const GRACE_PERIOD_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityWindow {
    /// Inclusive lower bound on departure time.
    pub from: DateTime<Utc>,
    /// Exclusive upper bound: the next local midnight.
    pub until: DateTime<Utc>,
}

impl VisibilityWindow {
    /// Window as seen at `now`, with "today" evaluated in `offset`.
    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let from = now - TimeDelta::minutes(GRACE_PERIOD_MINUTES);
        let until = now
            .with_timezone(&offset)
            .date_naive()
            .succ_opt()
            .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
            .and_then(|midnight| midnight.and_local_timezone(offset).single())
            .map(|midnight| midnight.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self { from, until }
    }

    pub fn contains_time(&self, departure_time: DateTime<Utc>) -> bool {
        self.from <= departure_time && departure_time < self.until
    }

    /// Active and departing inside the window.
    pub fn contains(&self, train: &Train) -> bool {
        train.status == TrainStatus::Active && self.contains_time(train.departure_time)
    }
}
