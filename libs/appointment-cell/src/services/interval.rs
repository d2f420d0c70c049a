// libs/appointment-cell/src/services/interval.rs
use serde::{Deserialize, Serialize};

use crate::models::TimeOfDay;

/// Half-open `[start, end)` range of wall-clock minutes within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeInterval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// True when the interval covers at least one minute.
    pub fn is_non_empty(&self) -> bool {
        self.end.minutes() > self.start.minutes()
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }

    /// Two intervals overlap if start1 < end2 AND end1 > start2.
    /// Back-to-back intervals (end1 == start2) do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start.minutes() < other.end.minutes() && self.end.minutes() > other.start.minutes()
    }

    /// Length of the shared part of both intervals, zero when disjoint.
    pub fn overlap_minutes(&self, other: &TimeInterval) -> u16 {
        let start = self.start.minutes().max(other.start.minutes());
        let end = self.end.minutes().min(other.end.minutes());
        end.saturating_sub(start)
    }
}
