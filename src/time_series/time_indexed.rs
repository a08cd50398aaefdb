//! In-memory exporter answering time-range queries.

use crate::core::config::ExporterConfig;
use crate::core::Result;
use crate::export::json::data_points_to_json;
use crate::time_series::data_point::DataPoint;
use crate::time_series::exporter::Exporter;
use crate::time_series::time_index::TimeIndex;
use crate::time_series::types::Time;

/// Keeps received data points in arrival order with a [`TimeIndex`] over
/// them. With a non-zero capacity only the newest `capacity` distinct
/// timestamps are kept.
#[derive(Debug, Clone, Default)]
pub struct TimeIndexedExporter {
    points: Vec<DataPoint>,
    index: TimeIndex,
    /// Max distinct timestamps, 0 for unbounded
    capacity: usize,
}

impl TimeIndexedExporter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn from_config(config: &ExporterConfig) -> Self {
        Self::new(config.time_index_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting the oldest timestamps if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        if capacity > 0 && self.index.len() > capacity {
            self.evict(self.index.len() - capacity);
        }
    }

    /// Stored points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn distinct_times(&self) -> usize {
        self.index.len()
    }

    pub fn time_index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    /// Add a batch.
    ///
    /// # Panics
    /// If the batch's timestamps decrease, or start before the newest stored
    /// timestamp.
    pub fn receive(&mut self, batch: &[DataPoint]) {
        let Some(first) = batch.first() else {
            return;
        };
        if let Some(last) = self.index.last() {
            assert!(
                first.time() >= last.time,
                "Data point timestamps must be non-decreasing: {} after {}",
                first.time(),
                last.time
            );
        }
        for pair in batch.windows(2) {
            assert!(
                pair[1].time() >= pair[0].time(),
                "Data point timestamps must be non-decreasing: {} after {}",
                pair[1].time(),
                pair[0].time()
            );
        }

        let batch = if self.capacity > 0 {
            newest_distinct(batch, self.capacity)
        } else {
            batch
        };

        if self.capacity > 0 && !self.index.is_empty() {
            let mut incoming = distinct_count(batch);
            if self.index.last().map(|r| r.time) == Some(batch[0].time()) {
                incoming -= 1;
            }
            let total = self.index.len() + incoming;
            if total > self.capacity {
                self.evict(total - self.capacity);
            }
        }

        self.points.reserve(batch.len());
        for point in batch {
            self.index.observe(point.time(), self.points.len());
            self.points.push(point.clone());
        }
    }

    /// Drop the `count` oldest timestamps and their points.
    fn evict(&mut self, count: usize) {
        if count >= self.index.len() {
            self.clear();
            return;
        }
        let cut = self.index.records()[count].offset;
        self.points.drain(..cut);
        self.index.drop_front(count, cut);
        tracing::debug!(
            timestamps = count,
            points = cut,
            remaining = self.points.len(),
            "Evicted oldest data points"
        );
    }

    /// Index into [`TimeIndexedExporter::time_index`] of the timestamp
    /// closest to `time`; ties go to the earlier one.
    pub fn find_nearest(&self, time: Time) -> Option<usize> {
        self.index.find_nearest(time)
    }

    /// Points stamped at record `i` of the time index.
    pub fn points_at(&self, i: usize) -> &[DataPoint] {
        if i >= self.index.len() {
            return &[];
        }
        let total = self.points.len();
        &self.points[self.index.offset_of(i, total)..self.index.offset_of(i + 1, total)]
    }

    /// Points with `from <= time <= to`.
    pub fn get_range(&self, from: Time, to: Time) -> &[DataPoint] {
        if from > to || self.index.is_empty() {
            return &[];
        }
        let total = self.points.len();
        let start = self.index.offset_of(self.index.lower_bound(from), total);
        let end = self.index.offset_of(self.index.upper_bound(to), total);
        &self.points[start..end]
    }

    /// Points of the `n` newest distinct timestamps.
    pub fn latest(&self, n: usize) -> &[DataPoint] {
        if n == 0 {
            return &[];
        }
        let first = self.index.len().saturating_sub(n);
        &self.points[self.index.offset_of(first, self.points.len())..]
    }

    /// [`TimeIndexedExporter::get_range`] rendered as JSON.
    pub fn get_json(&self, from: Time, to: Time, slim: bool) -> Result<String> {
        Ok(serde_json::to_string(&data_points_to_json(
            self.get_range(from, to),
            slim,
        ))?)
    }

    /// [`TimeIndexedExporter::latest`] rendered as JSON.
    pub fn latest_json(&self, n: usize, slim: bool) -> Result<String> {
        Ok(serde_json::to_string(&data_points_to_json(self.latest(n), slim))?)
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.index.clear();
    }
}

impl Exporter for TimeIndexedExporter {
    fn receive_data_points(&mut self, batch: &[DataPoint]) -> Result<()> {
        self.receive(batch);
        Ok(())
    }
}

fn distinct_count(batch: &[DataPoint]) -> usize {
    if batch.is_empty() {
        return 0;
    }
    1 + batch
        .windows(2)
        .filter(|pair| pair[0].time() != pair[1].time())
        .count()
}

/// Tail of a sorted batch holding at most `keep` distinct timestamps.
fn newest_distinct(batch: &[DataPoint], keep: usize) -> &[DataPoint] {
    let mut seen = 0;
    let mut start = batch.len();
    while start > 0 {
        let time = batch[start - 1].time();
        if start == batch.len() || time != batch[start].time() {
            seen += 1;
            if seen > keep {
                break;
            }
        }
        start -= 1;
    }
    &batch[start..]
}
