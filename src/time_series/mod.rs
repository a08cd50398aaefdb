//! Time-series collection and export.
//!
//! A producer thread snapshots metric storage into [`DataPoint`]s through a
//! [`TimeSeriesCollector`]. Batches go to [`Exporter`]s either inline, or
//! through a [`handoff_queue`] drained on a second thread. The
//! [`TimeIndexedExporter`] keeps points in memory for range queries.

pub mod collector;
pub mod data_point;
pub mod drain;
pub mod exporter;
pub mod queue;
pub mod sinks;
pub mod time_index;
pub mod time_indexed;
pub mod types;

pub use collector::TimeSeriesCollector;
pub use data_point::DataPoint;
pub use drain::DrainLoop;
pub use exporter::{CollectingExporter, Exporter};
pub use queue::{handoff_queue, BatchConsumer, BatchProducer};
pub use sinks::{FileExporter, StreamExporter};
pub use time_index::{TimeIndex, TimeIndexRecord};
pub use time_indexed::TimeIndexedExporter;
pub use types::{Aggregate, Time};
