//! The metrics store: one contiguous buffer holding metadata and values.
//!
//! A store is owned by a single thread. Handles share its buffer through an
//! `Rc`, so neither the store nor its handles can cross threads; snapshots
//! taken with [`MetricsStore::copy_storage`] or [`MetricsStore::copy_values`]
//! are plain bytes and can.

use crate::core::{Result, TallyError};
use crate::metrics::codec::{read_slot, write_slot, Endianness, Kind, SlotState};
use crate::metrics::descriptor::MetricDescriptor;
use crate::metrics::handle::Metric;
use crate::metrics::kind::{Role, Value};
use crate::metrics::layout::{
    align8, encode_metadata, SlotLayout, MAX_METRICS, VALUE_HEADER_BYTES,
};
use ahash::AHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) type SharedBuffer = Rc<RefCell<Box<[u8]>>>;

/// Contiguous storage for a fixed set of named metrics.
pub struct MetricsStore {
    descriptors: Vec<MetricDescriptor>,
    index: AHashMap<String, usize>,
    /// Absolute offset of each metric's slot in `buffer`
    slots: Vec<usize>,
    initialized: Vec<bool>,
    buffer: SharedBuffer,
    metadata_bytes: usize,
    record_offset: usize,
    value_bytes: usize,
    sync_value: u32,
}

impl MetricsStore {
    /// Lay out storage for `descriptors`, in the given order.
    ///
    /// Fails on an empty list, a repeated name, more than 65535 metrics, or
    /// a descriptor that cannot be encoded.
    pub fn new(descriptors: impl IntoIterator<Item = MetricDescriptor>) -> Result<Self> {
        let descriptors: Vec<MetricDescriptor> = descriptors.into_iter().collect();
        if descriptors.is_empty() {
            return Err(TallyError::EmptyStore);
        }
        if descriptors.len() > MAX_METRICS {
            return Err(TallyError::TooManyMetrics {
                count: descriptors.len(),
                limit: MAX_METRICS,
            });
        }

        let mut index = AHashMap::with_capacity(descriptors.len());
        for (i, d) in descriptors.iter().enumerate() {
            d.validate()?;
            if index.insert(d.name.clone(), i).is_some() {
                return Err(TallyError::DuplicateMetric(d.name.clone()));
            }
        }

        let endian = Endianness::native();
        let metadata = encode_metadata(&descriptors, endian)?;
        let layout = SlotLayout::compute(descriptors.iter().map(|d| d.kind));

        let metadata_bytes = metadata.len();
        let record_offset = align8(metadata_bytes);
        let value_offset = record_offset + VALUE_HEADER_BYTES;
        let value_bytes = layout.value_bytes();
        let sync_value = endian.read_u32([
            metadata[metadata_bytes - 4],
            metadata[metadata_bytes - 3],
            metadata[metadata_bytes - 2],
            metadata[metadata_bytes - 1],
        ]);

        let mut buffer = vec![0u8; value_offset + value_bytes].into_boxed_slice();
        buffer[..metadata_bytes].copy_from_slice(&metadata);
        buffer[record_offset..record_offset + 4].copy_from_slice(&endian.u32_bytes(sync_value));

        let slots = layout.offsets.iter().map(|o| value_offset + o).collect();

        tracing::debug!(
            metrics = descriptors.len(),
            eight_byte = layout.eight_count,
            one_byte = layout.one_count,
            metadata_bytes,
            value_bytes,
            sync_value,
            "Created metrics store"
        );

        Ok(Self {
            initialized: vec![false; descriptors.len()],
            descriptors,
            index,
            slots,
            buffer: Rc::new(RefCell::new(buffer)),
            metadata_bytes,
            record_offset,
            value_bytes,
            sync_value,
        })
    }

    /// Number of metrics in the store
    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Option<&MetricDescriptor> {
        self.index_of(name).map(|i| &self.descriptors[i])
    }

    /// Declaration index of `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn sync_value(&self) -> u32 {
        self.sync_value
    }

    pub fn metadata_bytes(&self) -> usize {
        self.metadata_bytes
    }

    /// Length of the value block alone: 9 per 8-byte kind, 2 per 1-byte kind
    pub fn value_bytes(&self) -> usize {
        self.value_bytes
    }

    /// Length of the value record: sync header plus value block
    pub fn value_record_bytes(&self) -> usize {
        VALUE_HEADER_BYTES + self.value_bytes
    }

    /// Length of the whole storage buffer
    pub fn storage_bytes(&self) -> usize {
        self.record_offset + self.value_record_bytes()
    }

    /// Copy of the metadata block
    pub fn metadata(&self) -> Vec<u8> {
        self.buffer.borrow()[..self.metadata_bytes].to_vec()
    }

    /// Initialize `name` as a metric holding the default value of its kind.
    ///
    /// # Panics
    /// If the name is unknown, already initialized, a constant, or of a
    /// different kind than `K`.
    pub fn initialize_metric<K: Kind>(&mut self, name: &str) -> Metric<K> {
        let slot = self.claim::<K>(name, false);
        let mut metric = Metric::new(Rc::clone(&self.buffer), slot);
        metric.set(K::Value::default());
        metric
    }

    /// Initialize `name` as an optional metric: initialized, but holding no
    /// value until the first assignment.
    ///
    /// # Panics
    /// Same conditions as [`MetricsStore::initialize_metric`].
    pub fn initialize_optional_metric<K: Kind>(&mut self, name: &str) -> Metric<K> {
        let slot = self.claim::<K>(name, false);
        self.buffer.borrow_mut()[slot] = SlotState::Empty as u8;
        Metric::new(Rc::clone(&self.buffer), slot)
    }

    /// Write a constant once. No handle is returned, so it cannot change.
    ///
    /// # Panics
    /// If the name is unknown, already initialized, not a constant, of a
    /// different kind than `K`, or `value` is NaN/Inf.
    pub fn initialize_constant<K: Kind>(&mut self, name: &str, value: K::Value) {
        let slot = self.claim::<K>(name, true);
        let endian = Endianness::native();
        let width = K::width().slot_bytes();
        write_slot(
            K::into_value(value),
            endian,
            &mut self.buffer.borrow_mut()[slot..slot + width],
        );
    }

    fn claim<K: Kind>(&mut self, name: &str, constant: bool) -> usize {
        let Some(i) = self.index_of(name) else {
            panic!("Unknown metric '{name}'");
        };
        let d = &self.descriptors[i];
        assert_eq!(
            d.kind,
            K::KIND,
            "Metric '{name}' is {} but was initialized as {}",
            d.kind,
            K::KIND
        );
        if constant {
            assert_eq!(d.role, Role::Constant, "Metric '{name}' is not a constant");
        } else {
            assert_ne!(
                d.role,
                Role::Constant,
                "Metric '{name}' is a constant, use initialize_constant"
            );
        }
        assert!(!self.initialized[i], "Metric '{name}' is already initialized");
        self.initialized[i] = true;
        self.slots[i]
    }

    /// Whether every metric has been initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized.iter().all(|&i| i)
    }

    pub fn is_metric_initialized(&self, name: &str) -> bool {
        self.index_of(name).is_some_and(|i| self.initialized[i])
    }

    /// Current value of `name`, if it is initialized and holds one
    pub fn value(&self, name: &str) -> Option<Value> {
        let i = self.index_of(name)?;
        let slot = self.slots[i];
        let kind = self.descriptors[i].kind;
        let buffer = self.buffer.borrow();
        read_slot(
            kind,
            Endianness::native(),
            &buffer[slot..slot + kind.width().slot_bytes()],
        )
    }

    /// Byte-exact copy of metadata, padding and value record into `dst`.
    ///
    /// # Panics
    /// If `dst.len()` differs from [`MetricsStore::storage_bytes`].
    pub fn copy_storage(&self, dst: &mut [u8]) {
        assert_eq!(dst.len(), self.storage_bytes(), "Destination size mismatch");
        dst.copy_from_slice(&self.buffer.borrow());
    }

    /// Byte-exact copy of the value record (sync header and value block).
    ///
    /// # Panics
    /// If `dst.len()` differs from [`MetricsStore::value_record_bytes`].
    pub fn copy_values(&self, dst: &mut [u8]) {
        assert_eq!(dst.len(), self.value_record_bytes(), "Destination size mismatch");
        dst.copy_from_slice(&self.buffer.borrow()[self.record_offset..]);
    }

    /// Owned copy of the whole storage buffer
    pub fn storage_snapshot(&self) -> Vec<u8> {
        self.buffer.borrow().to_vec()
    }

    /// Run `f` over the live storage bytes without copying them.
    pub fn with_storage<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.buffer.borrow())
    }

    /// Zero the value of every initialized metric except constants. Slot
    /// flags are left as they are.
    pub fn reset_metrics(&mut self) {
        let mut buffer = self.buffer.borrow_mut();
        for (i, d) in self.descriptors.iter().enumerate() {
            if d.role == Role::Constant || !self.initialized[i] {
                continue;
            }
            let slot = self.slots[i];
            buffer[slot + 1..slot + d.kind.width().slot_bytes()].fill(0);
        }
    }
}

impl std::fmt::Debug for MetricsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsStore")
            .field("count", &self.count())
            .field("metadata_bytes", &self.metadata_bytes)
            .field("value_bytes", &self.value_bytes)
            .field("sync_value", &self.sync_value)
            .finish()
    }
}
