//! Collects timestamped snapshots and hands them to exporters.

use crate::core::config::CollectorConfig;
use crate::core::Result;
use crate::time_series::data_point::DataPoint;
use crate::time_series::exporter::{deliver, Exporter};
use crate::time_series::types::{Aggregate, Time, DEFAULT_DELIMITER};
use ahash::AHashMap;
use std::sync::Arc;

/// Builds data points for one producer thread.
///
/// Points are kept in a pool across flushes: after a flush the next
/// `new_data_point` calls overwrite the old buffers instead of allocating.
/// The collector itself is not shared between threads; move batches across
/// with [`crate::time_series::handoff_queue`].
#[derive(Debug)]
pub struct TimeSeriesCollector {
    delimiter: char,
    aggregates: AHashMap<String, Arc<Aggregate>>,
    sink: Vec<DataPoint>,
    /// Points in `sink` handed out since the last flush
    live: usize,
}

impl Default for TimeSeriesCollector {
    fn default() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }
}

impl TimeSeriesCollector {
    pub fn new(config: &CollectorConfig) -> Self {
        let mut collector = Self::with_delimiter(config.aggregate_delimiter);
        collector.sink.reserve(config.initial_capacity);
        collector
    }

    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            aggregates: AHashMap::new(),
            sink: Vec::new(),
            live: 0,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Shared aggregate for `path`. The same `Arc` is returned for the same
    /// path on every call.
    pub fn new_aggregate(&mut self, path: &str) -> Arc<Aggregate> {
        if let Some(existing) = self.aggregates.get(path) {
            return Arc::clone(existing);
        }
        let aggregate = Arc::new(Aggregate::new(path, self.delimiter));
        self.aggregates.insert(path.to_string(), Arc::clone(&aggregate));
        aggregate
    }

    /// Start a new data point and return its `size` metric bytes, zeroed,
    /// for the caller to fill. The timestamp is already written.
    pub fn new_data_point(
        &mut self,
        aggregate: &Arc<Aggregate>,
        time: Time,
        size: usize,
    ) -> &mut [u8] {
        if self.live < self.sink.len() {
            self.sink[self.live].reuse(Some(aggregate), time, size);
        } else {
            self.sink.push(DataPoint::new(Arc::clone(aggregate), time, size));
        }
        self.live += 1;
        self.sink[self.live - 1].metrics_mut()
    }

    /// Points created since the last flush
    pub fn live_len(&self) -> usize {
        self.live
    }

    /// Points held, live or waiting for reuse
    pub fn pooled_len(&self) -> usize {
        self.sink.len()
    }

    pub fn live_points(&self) -> &[DataPoint] {
        &self.sink[..self.live]
    }

    /// Hand the live points to `f`, then mark them reusable.
    pub fn flush<R>(&mut self, f: impl FnOnce(&[DataPoint]) -> R) -> R {
        tracing::trace!(points = self.live, "Flushing collector");
        let result = f(&self.sink[..self.live]);
        self.live = 0;
        result
    }

    /// Deliver the live points to each exporter in order, then mark them
    /// reusable. The first exporter error is returned; the points are
    /// released either way.
    pub fn flush_to_exporters(&mut self, exporters: &mut [&mut dyn Exporter]) -> Result<()> {
        self.flush(|batch| deliver(exporters, batch))
    }

    /// Move the live points out as an owned batch, e.g. to push onto a
    /// handoff queue. Moved points leave the pool.
    pub fn take_batch(&mut self) -> Vec<DataPoint> {
        let batch: Vec<DataPoint> = self.sink.drain(..self.live).collect();
        self.live = 0;
        batch
    }

    /// Drop all pooled buffers.
    pub fn clear(&mut self) {
        self.sink = Vec::new();
        self.live = 0;
    }
}
