//! Wait-free single-producer/single-consumer handoff of data-point batches.
//!
//! A singly linked list with three cursors:
//!
//! ```text
//! head -> .. -> divider -> .. -> tail
//! ```
//!
//! Nodes up to and including `divider` have been consumed; `divider.next`
//! through `tail` are waiting. The producer appends after `tail` and frees
//! nodes from `head` up to (not including) `divider`. The consumer only ever
//! moves `divider` forward. Neither side blocks or retries.

use crate::core::Result;
use crate::time_series::data_point::DataPoint;
use crate::time_series::exporter::{deliver, Exporter};
use crossbeam::utils::CachePadded;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

struct Node {
    batch: Vec<DataPoint>,
    next: AtomicPtr<Node>,
}

impl Node {
    fn alloc(batch: Vec<DataPoint>) -> *mut Node {
        Box::into_raw(Box::new(Node {
            batch,
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

struct Inner {
    /// Oldest node still allocated. Touched by the producer only.
    head: AtomicPtr<Node>,
    /// Last consumed node. Written by the consumer only.
    divider: CachePadded<AtomicPtr<Node>>,
    /// Last pushed node. Written by the producer only.
    tail: CachePadded<AtomicPtr<Node>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mut node = *self.head.get_mut();
        while !node.is_null() {
            // SAFETY: both endpoints are gone, so every node from head onwards
            // is exclusively ours; each was allocated by Node::alloc.
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next.load(Ordering::Relaxed);
        }
    }
}

/// Create a connected producer/consumer pair.
pub fn handoff_queue() -> (BatchProducer, BatchConsumer) {
    let stub = Node::alloc(Vec::new());
    let inner = Arc::new(Inner {
        head: AtomicPtr::new(stub),
        divider: CachePadded::new(AtomicPtr::new(stub)),
        tail: CachePadded::new(AtomicPtr::new(stub)),
    });
    (
        BatchProducer {
            inner: Arc::clone(&inner),
        },
        BatchConsumer { inner },
    )
}

/// Sending half. Exactly one thread may own it.
pub struct BatchProducer {
    inner: Arc<Inner>,
}

impl BatchProducer {
    /// Append a batch. Never blocks; also frees nodes the consumer is done with.
    pub fn push(&mut self, batch: Vec<DataPoint>) {
        let node = Node::alloc(batch);
        let tail = self.inner.tail.load(Ordering::Relaxed);
        // SAFETY: tail is never freed while it is tail; the consumer stops at
        // tail, and reclamation below stops at divider, which trails tail.
        unsafe { (*tail).next.store(node, Ordering::Release) };
        self.inner.tail.store(node, Ordering::Release);
        self.reclaim();
    }

    fn reclaim(&mut self) {
        let divider = self.inner.divider.load(Ordering::Acquire);
        let mut head = self.inner.head.load(Ordering::Relaxed);
        let mut freed = 0usize;
        while head != divider {
            // SAFETY: nodes before divider were fully consumed and the consumer
            // never walks backwards.
            let boxed = unsafe { Box::from_raw(head) };
            head = boxed.next.load(Ordering::Relaxed);
            freed += 1;
        }
        self.inner.head.store(head, Ordering::Relaxed);
        if freed > 0 {
            tracing::trace!(freed, "Reclaimed consumed queue nodes");
        }
    }
}

/// Receiving half. Exactly one thread may own it.
pub struct BatchConsumer {
    inner: Arc<Inner>,
}

impl BatchConsumer {
    /// Whether a pushed batch is waiting.
    pub fn has_pending(&self) -> bool {
        self.inner.divider.load(Ordering::Relaxed) != self.inner.tail.load(Ordering::Acquire)
    }

    /// Deliver every waiting batch to each exporter, in push order, and
    /// return how many batches were delivered.
    ///
    /// On an exporter error the failing batch counts as consumed and the
    /// error is returned; later batches stay queued.
    pub fn flush_to_exporters(&mut self, exporters: &mut [&mut dyn Exporter]) -> Result<usize> {
        self.consume(|batch| deliver(exporters, batch))
    }

    /// Run `f` on every waiting batch in push order.
    pub fn consume(&mut self, mut f: impl FnMut(&[DataPoint]) -> Result<()>) -> Result<usize> {
        let mut delivered = 0;
        let mut divider = self.inner.divider.load(Ordering::Relaxed);
        while divider != self.inner.tail.load(Ordering::Acquire) {
            // SAFETY: divider != tail, so its next was published by the
            // producer before tail moved past it. The producer frees only
            // nodes strictly before divider, so `next` stays alive until we
            // move divider past it.
            let next = unsafe { (*divider).next.load(Ordering::Acquire) };
            self.inner.divider.store(next, Ordering::Release);
            divider = next;
            delivered += 1;
            // SAFETY: see above; `next` is now divider and is not freed.
            f(unsafe { &(*next).batch })?;
        }
        if delivered > 0 {
            tracing::trace!(batches = delivered, "Delivered queued batches");
        }
        Ok(delivered)
    }
}
