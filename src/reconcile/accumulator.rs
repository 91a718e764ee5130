//! One-pass per-code accumulator
//!
//! Each detour code gets one `Accumulator` that is folded over its events in
//! input order. No sub-group is materialized or re-scanned.

use chrono::NaiveDateTime;

use crate::types::{DetourAggregate, EventStatus, FinalStatus, ReviewFlag};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Accumulator {
    count: usize,
    seen_active: bool,
    seen_inactive: bool,
    /// Timestamp and status of the latest event so far.
    ///
    /// `Option<NaiveDateTime>` orders `None` before every `Some`, which is
    /// exactly "unparseable timestamps are earliest".
    latest: (Option<NaiveDateTime>, EventStatus),
}

impl Accumulator {
    pub(crate) fn new(timestamp: Option<NaiveDateTime>, status: EventStatus) -> Self {
        let mut acc = Self {
            count: 0,
            seen_active: false,
            seen_inactive: false,
            latest: (timestamp, status),
        };
        acc.push(timestamp, status);
        acc
    }

    /// Fold one more event of the same code.
    ///
    /// Equal timestamps resolve to the event seen later in input order.
    pub(crate) fn push(&mut self, timestamp: Option<NaiveDateTime>, status: EventStatus) {
        self.count += 1;
        match status {
            EventStatus::Active => self.seen_active = true,
            EventStatus::Inactive => self.seen_inactive = true,
        }
        if timestamp >= self.latest.0 {
            self.latest = (timestamp, status);
        }
    }

    pub(crate) fn most_recent_status(&self) -> EventStatus {
        self.latest.1
    }

    /// Reconciled status for the whole group.
    ///
    /// One or two events trust recency; three or more with both polarities
    /// are churn and surface as `Modified`.
    pub(crate) fn final_status(&self) -> FinalStatus {
        match self.count {
            0..=2 => self.latest.1.into(),
            _ if self.seen_active && self.seen_inactive => FinalStatus::Modified,
            _ if self.seen_active => FinalStatus::Active,
            _ => FinalStatus::Inactive,
        }
    }

    pub(crate) fn finish(&self) -> DetourAggregate {
        let most_recent_status = self.most_recent_status();
        DetourAggregate {
            final_status: self.final_status(),
            most_recent_status,
            occurrence_count: self.count,
            review: ReviewFlag::from(most_recent_status),
        }
    }
}
