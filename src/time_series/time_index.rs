//! Sorted index from distinct timestamps to data-point positions.

use crate::time_series::types::Time;
use serde::{Deserialize, Serialize};

/// First position of a timestamp in a flat data-point sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeIndexRecord {
    pub time: Time,
    pub offset: usize,
}

/// Records strictly increasing in both `time` and `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeIndex {
    records: Vec<TimeIndexRecord>,
}

impl TimeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TimeIndexRecord] {
        &self.records
    }

    /// Number of distinct timestamps
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&TimeIndexRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&TimeIndexRecord> {
        self.records.last()
    }

    /// Record a point at `offset` stamped `time`. Adds a record only when
    /// `time` differs from the last one.
    ///
    /// # Panics
    /// If `time` is older than the last record.
    pub fn observe(&mut self, time: Time, offset: usize) {
        match self.records.last() {
            Some(last) if last.time == time => {},
            Some(last) => {
                assert!(
                    time > last.time,
                    "Data point timestamps must be non-decreasing: {time} after {}",
                    last.time
                );
                self.records.push(TimeIndexRecord { time, offset });
            },
            None => self.records.push(TimeIndexRecord { time, offset }),
        }
    }

    /// Position of the first point of record `i`; `total` for `i == len()`.
    pub fn offset_of(&self, i: usize, total: usize) -> usize {
        self.records.get(i).map_or(total, |r| r.offset)
    }

    /// Index of the first record with `time >= t`
    pub fn lower_bound(&self, t: Time) -> usize {
        self.records.partition_point(|r| r.time < t)
    }

    /// Index of the first record with `time > t`
    pub fn upper_bound(&self, t: Time) -> usize {
        self.records.partition_point(|r| r.time <= t)
    }

    /// Record closest to `time`. A tie between two neighbors resolves to the
    /// earlier one. `None` when empty.
    pub fn find_nearest(&self, time: Time) -> Option<usize> {
        if self.records.is_empty() {
            return None;
        }
        let i = self.lower_bound(time);
        if i == 0 {
            return Some(0);
        }
        if i == self.records.len() {
            return Some(i - 1);
        }
        let below = time - self.records[i - 1].time;
        let above = self.records[i].time - time;
        Some(if below <= above { i - 1 } else { i })
    }

    /// Drop the first `count` records and shift the remaining offsets down
    /// by `shift`.
    pub fn drop_front(&mut self, count: usize, shift: usize) {
        self.records.drain(..count.min(self.records.len()));
        for r in &mut self.records {
            r.offset -= shift;
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
