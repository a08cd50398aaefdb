//! Tally - in-process metrics with a self-describing memory layout.
//!
//! Tally keeps counters, gauges and constants in one contiguous buffer per
//! store. The buffer describes itself, so a copy of it can be read anywhere
//! through a [`View`] without access to the process that wrote it.
//!
//! # Features
//!
//! - **Compact layout**: 8-byte kinds packed before 1-byte kinds, one flag
//!   byte per slot
//! - **Integrity check**: a FNV-1a sync value ties value records to their
//!   metadata
//! - **Time series**: timestamped snapshots, a wait-free SPSC handoff queue
//!   and a time-indexed in-memory exporter
//!
//! # Architecture
//!
//! - `metrics`: descriptors, layout, the store and typed handles
//! - `view`: read-only views over storage copies
//! - `time_series`: collector, handoff queue, exporters
//! - `export`: JSON encoders
//! - `core`: errors, configuration and logging
//!
//! # Example
//!
//! ```
//! use tally::metrics::{MetricDescriptor, MetricsStore, ValueKind, U64};
//! use tally::View;
//!
//! let mut store = MetricsStore::new(vec![
//!     MetricDescriptor::counter("requests", "Requests served", ValueKind::U64),
//! ])?;
//! let mut requests = store.initialize_metric::<U64>("requests");
//! requests += 3;
//!
//! let copy = store.storage_snapshot();
//! let mut view = View::new();
//! view.bind_storage(&copy)?;
//! assert_eq!(view.value_as::<U64>(0), Some(3));
//! # Ok::<(), tally::TallyError>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod core;
pub mod export;
pub mod metrics;
pub mod time_series;
pub mod view;

// Re-export core types for convenience
pub use crate::core::{Config, Result, TallyError};
pub use crate::metrics::{Metric, MetricDescriptor, MetricsStore, Value, ValueKind};
pub use crate::time_series::{
    handoff_queue, DataPoint, Exporter, TimeIndexedExporter, TimeSeriesCollector,
};
pub use crate::view::{View, ViewIterator};
