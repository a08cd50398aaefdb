//! Consumers of finished data-point batches.

use crate::core::Result;
use crate::time_series::data_point::DataPoint;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives batches of data points, in the order they were collected.
///
/// Errors are handed back to whoever delivered the batch; neither the
/// collector nor the handoff queue retries.
pub trait Exporter {
    fn receive_data_points(&mut self, batch: &[DataPoint]) -> Result<()>;
}

impl<E: Exporter + ?Sized> Exporter for Box<E> {
    fn receive_data_points(&mut self, batch: &[DataPoint]) -> Result<()> {
        (**self).receive_data_points(batch)
    }
}

/// Lets the draining thread feed an exporter that other threads query.
impl<E: Exporter> Exporter for Arc<Mutex<E>> {
    fn receive_data_points(&mut self, batch: &[DataPoint]) -> Result<()> {
        self.lock().receive_data_points(batch)
    }
}

/// Hand `batch` to every exporter in order, stopping at the first error.
pub fn deliver(exporters: &mut [&mut dyn Exporter], batch: &[DataPoint]) -> Result<()> {
    for exporter in exporters.iter_mut() {
        exporter.receive_data_points(batch)?;
    }
    Ok(())
}

/// Exporter that keeps every batch it receives. Handy for tests and for
/// callers that post-process batches themselves.
#[derive(Debug, Default, Clone)]
pub struct CollectingExporter {
    batches: Vec<Vec<DataPoint>>,
}

impl CollectingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[Vec<DataPoint>] {
        &self.batches
    }

    /// All received points, flattened in arrival order
    pub fn points(&self) -> impl Iterator<Item = &DataPoint> {
        self.batches.iter().flatten()
    }

    pub fn take(&mut self) -> Vec<Vec<DataPoint>> {
        std::mem::take(&mut self.batches)
    }
}

impl Exporter for CollectingExporter {
    fn receive_data_points(&mut self, batch: &[DataPoint]) -> Result<()> {
        self.batches.push(batch.to_vec());
        Ok(())
    }
}
