//! Timestamped, aggregate-tagged snapshots.

use crate::core::Result;
use crate::time_series::types::{Aggregate, Time, TIME_BYTES};
use crate::view::ViewIterator;
use std::sync::Arc;

/// One snapshot: timestamp followed by the metric bytes copied in by the
/// producer. The timestamp is stored little-endian, like the frame lengths
/// written by the binary sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    aggregate: Arc<Aggregate>,
    payload: Vec<u8>,
}

impl DataPoint {
    /// A point with `metrics_len` zeroed metric bytes.
    pub fn new(aggregate: Arc<Aggregate>, time: Time, metrics_len: usize) -> Self {
        let mut point = Self {
            aggregate,
            payload: Vec::new(),
        };
        point.reuse(None, time, metrics_len);
        point
    }

    /// A point carrying a copy of `metrics`.
    pub fn with_metrics(aggregate: Arc<Aggregate>, time: Time, metrics: &[u8]) -> Self {
        let mut point = Self::new(aggregate, time, metrics.len());
        point.metrics_mut().copy_from_slice(metrics);
        point
    }

    /// Rebuild a point from its encoded payload.
    pub(crate) fn from_payload(aggregate: Arc<Aggregate>, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() >= TIME_BYTES);
        Self { aggregate, payload }
    }

    /// Reset in place, keeping the payload allocation.
    pub(crate) fn reuse(
        &mut self,
        aggregate: Option<&Arc<Aggregate>>,
        time: Time,
        metrics_len: usize,
    ) {
        if let Some(aggregate) = aggregate {
            if !Arc::ptr_eq(&self.aggregate, aggregate) {
                self.aggregate = Arc::clone(aggregate);
            }
        }
        self.payload.clear();
        self.payload.resize(TIME_BYTES + metrics_len, 0);
        self.payload[..TIME_BYTES].copy_from_slice(&time.to_le_bytes());
    }

    pub fn time(&self) -> Time {
        let mut b = [0u8; TIME_BYTES];
        b.copy_from_slice(&self.payload[..TIME_BYTES]);
        Time::from_le_bytes(b)
    }

    pub fn aggregate(&self) -> &Arc<Aggregate> {
        &self.aggregate
    }

    /// Timestamp and metric bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Metric bytes after the timestamp
    pub fn metrics(&self) -> &[u8] {
        &self.payload[TIME_BYTES..]
    }

    pub fn metrics_mut(&mut self) -> &mut [u8] {
        &mut self.payload[TIME_BYTES..]
    }

    /// Views over the metric bytes, when they hold whole storage copies.
    pub fn views(&self) -> Result<ViewIterator<'_>> {
        ViewIterator::new(self.metrics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::codec::U64;
    use crate::metrics::descriptor::MetricDescriptor;
    use crate::metrics::kind::{Value, ValueKind};
    use crate::metrics::store::MetricsStore;

    fn aggregate() -> Arc<Aggregate> {
        Arc::new(Aggregate::new("a|b", '|'))
    }

    #[test]
    fn test_time_prefix() {
        let point = DataPoint::new(aggregate(), 1_700_000_000_123, 4);
        assert_eq!(point.time(), 1_700_000_000_123);
        assert_eq!(point.payload().len(), TIME_BYTES + 4);
        assert_eq!(point.metrics(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_time_is_little_endian() {
        let point = DataPoint::new(aggregate(), 0x0102_0304_0506_0708, 0);
        assert_eq!(point.payload(), &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_reuse_keeps_capacity() {
        let mut point = DataPoint::with_metrics(aggregate(), 1, &[7; 64]);
        let capacity = point.payload.capacity();
        let other = Arc::new(Aggregate::new("c", '|'));
        point.reuse(Some(&other), 2, 16);
        assert_eq!(point.time(), 2);
        assert_eq!(point.metrics(), &[0; 16]);
        assert_eq!(point.aggregate().path(), "c");
        assert_eq!(point.payload.capacity(), capacity);
    }

    #[test]
    fn test_views_over_storage() {
        let mut store =
            MetricsStore::new(vec![MetricDescriptor::counter("n", "", ValueKind::U64)]).unwrap();
        store.initialize_metric::<U64>("n").set(5);
        let point = DataPoint::with_metrics(aggregate(), 9, &store.storage_snapshot());

        let views: Vec<_> = point.views().unwrap().collect();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].value_by_name("n"), Some(Value::U64(5)));
    }
}
