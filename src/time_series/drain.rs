//! Consumer-side loop draining a handoff queue into exporters.

use crate::core::config::DrainConfig;
use crate::core::Result;
use crate::time_series::exporter::Exporter;
use crate::time_series::queue::BatchConsumer;
use std::time::Duration;

/// Polls a [`BatchConsumer`] and feeds its batches to a fixed set of
/// exporters. There is no stop signal of its own: the loop runs while the
/// caller's predicate returns true.
pub struct DrainLoop {
    consumer: BatchConsumer,
    exporters: Vec<Box<dyn Exporter + Send>>,
    interval: Duration,
    delivered: u64,
}

impl DrainLoop {
    pub fn new(consumer: BatchConsumer, config: &DrainConfig) -> Self {
        Self {
            consumer,
            exporters: Vec::new(),
            interval: config.interval,
            delivered: 0,
        }
    }

    pub fn with_exporter(mut self, exporter: impl Exporter + Send + 'static) -> Self {
        self.exporters.push(Box::new(exporter));
        self
    }

    pub fn add_exporter(&mut self, exporter: Box<dyn Exporter + Send>) {
        self.exporters.push(exporter);
    }

    /// Batches delivered over the loop's lifetime
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Deliver whatever is queued right now.
    pub fn drain_once(&mut self) -> Result<usize> {
        let mut exporters: Vec<&mut dyn Exporter> = self
            .exporters
            .iter_mut()
            .map(|e| e.as_mut() as &mut dyn Exporter)
            .collect();
        let count = self.consumer.flush_to_exporters(&mut exporters)?;
        self.delivered += count as u64;
        Ok(count)
    }

    /// Drain until `keep_running` returns false, sleeping the configured
    /// interval whenever the queue was empty. One last drain runs after the
    /// predicate turns false so nothing pushed before that is left behind.
    pub fn run(&mut self, mut keep_running: impl FnMut() -> bool) -> Result<u64> {
        tracing::debug!(
            interval = ?self.interval,
            exporters = self.exporters.len(),
            "Drain loop started"
        );
        while keep_running() {
            if self.drain_once()? == 0 {
                std::thread::sleep(self.interval);
            }
        }
        self.drain_once()?;
        tracing::debug!(batches = self.delivered, "Drain loop stopped");
        Ok(self.delivered)
    }

    /// Give back the consumer and exporters.
    pub fn into_parts(self) -> (BatchConsumer, Vec<Box<dyn Exporter + Send>>) {
        (self.consumer, self.exporters)
    }
}
