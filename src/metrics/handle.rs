//! Typed write handles bound to one slot of a store.

use crate::metrics::codec::{read_slot, write_slot, Endianness, Kind, Numeric, SlotState};
use crate::metrics::store::SharedBuffer;
use std::marker::PhantomData;
use std::ops::{AddAssign, SubAssign};

/// Write handle for one metric slot.
///
/// The handle keeps its store's buffer alive, so it can never dangle. It is
/// neither `Send` nor `Clone`: exactly one writer per slot, on the store's
/// thread.
pub struct Metric<K: Kind> {
    buffer: SharedBuffer,
    slot: usize,
    _kind: PhantomData<K>,
}

impl<K: Kind> Metric<K> {
    pub(crate) fn new(buffer: SharedBuffer, slot: usize) -> Self {
        Self {
            buffer,
            slot,
            _kind: PhantomData,
        }
    }

    #[inline]
    fn slot_end(&self) -> usize {
        self.slot + K::width().slot_bytes()
    }

    /// Assign a value.
    ///
    /// # Panics
    /// If a float value is NaN or infinite.
    #[inline]
    pub fn set(&mut self, value: K::Value) {
        let end = self.slot_end();
        write_slot(
            K::into_value(value),
            Endianness::native(),
            &mut self.buffer.borrow_mut()[self.slot..end],
        );
    }

    /// Current value, `None` after [`Metric::reset`] or before the first
    /// assignment of an optional metric.
    #[inline]
    pub fn value(&self) -> Option<K::Value> {
        let buffer = self.buffer.borrow();
        read_slot(K::KIND, Endianness::native(), &buffer[self.slot..self.slot_end()])
            .and_then(K::from_value)
    }

    #[inline]
    pub fn has_value(&self) -> bool {
        SlotState::from_flag(self.buffer.borrow()[self.slot]) == SlotState::Value
    }

    /// Drop the value but stay initialized. The slot bytes are kept.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.borrow_mut()[self.slot] = SlotState::Empty as u8;
    }
}

impl<K: Numeric> Metric<K> {
    #[inline]
    fn current(&self) -> K::Value {
        match self.value() {
            Some(v) => v,
            None => panic!("Arithmetic on a {} metric that has no value", K::KIND),
        }
    }

    /// Add `by` to the current value.
    ///
    /// # Panics
    /// If the metric has no value, or a float result is not finite.
    #[inline]
    pub fn add(&mut self, by: K::Value) {
        let next = K::add(self.current(), by);
        self.set(next);
    }

    /// Subtract `by` from the current value.
    ///
    /// # Panics
    /// If the metric has no value, or a float result is not finite.
    #[inline]
    pub fn sub(&mut self, by: K::Value) {
        let next = K::sub(self.current(), by);
        self.set(next);
    }

    #[inline]
    pub fn increment(&mut self) {
        self.add(K::one());
    }

    #[inline]
    pub fn decrement(&mut self) {
        self.sub(K::one());
    }
}

impl<K: Numeric> AddAssign<K::Value> for Metric<K> {
    fn add_assign(&mut self, rhs: K::Value) {
        self.add(rhs);
    }
}

impl<K: Numeric> SubAssign<K::Value> for Metric<K> {
    fn sub_assign(&mut self, rhs: K::Value) {
        self.sub(rhs);
    }
}

impl<K: Kind> std::fmt::Debug for Metric<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metric")
            .field("kind", &K::KIND)
            .field("slot", &self.slot)
            .field("value", &self.value())
            .finish()
    }
}
