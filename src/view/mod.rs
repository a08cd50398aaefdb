//! Read-only views over metric memory owned by someone else.
//!
//! A [`View`] borrows a metadata block and, optionally, a value record. It
//! never copies values; binding only parses the metadata entries and checks
//! that the value record carries the metadata's sync value.

pub mod iterator;

pub use iterator::ViewIterator;

use crate::core::{Result, TallyError};
use crate::metrics::codec::{read_slot, Endianness, Kind, SlotState};
use crate::metrics::kind::{Role, Value, ValueKind};
use crate::metrics::layout::{EnumValueRef, Metadata, MetricInfo, VALUE_HEADER_BYTES};
use ahash::AHashMap;

/// Non-owning reader of a metrics storage layout.
#[derive(Debug, Clone, Default)]
pub struct View<'a> {
    metadata: Option<Metadata<'a>>,
    index: AHashMap<&'a str, usize>,
    values: Option<&'a [u8]>,
}

impl<'a> View<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a metadata block. Any bound values are released.
    ///
    /// `data` must hold exactly one metadata block.
    pub fn bind_metadata(&mut self, data: &'a [u8]) -> Result<()> {
        let metadata = Metadata::parse(data)?;
        if metadata.bytes != data.len() {
            return Err(TallyError::LengthMismatch {
                expected: metadata.bytes,
                found: data.len(),
            });
        }
        self.set_metadata(metadata);
        Ok(())
    }

    fn set_metadata(&mut self, metadata: Metadata<'a>) {
        self.index = metadata
            .metrics
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name, i))
            .collect();
        self.metadata = Some(metadata);
        self.values = None;
    }

    /// Bind a value record (sync header and value block) to the bound
    /// metadata. Can be called again for each new snapshot of the same layout.
    ///
    /// Fails without touching the current binding if the length or the sync
    /// value does not match.
    ///
    /// # Panics
    /// If no metadata is bound.
    pub fn bind_values(&mut self, record: &'a [u8]) -> Result<()> {
        let metadata = self.meta();
        let expected = metadata.record_bytes();
        if record.len() != expected {
            return Err(TallyError::LengthMismatch {
                expected,
                found: record.len(),
            });
        }
        let found = metadata
            .endianness
            .read_u32([record[0], record[1], record[2], record[3]]);
        if found != metadata.sync_value {
            return Err(TallyError::HashMismatch {
                expected: metadata.sync_value,
                found,
            });
        }
        self.values = Some(&record[VALUE_HEADER_BYTES..]);
        Ok(())
    }

    /// Bind a whole storage copy: metadata, padding and value record.
    pub fn bind_storage(&mut self, data: &'a [u8]) -> Result<()> {
        let consumed = self.bind_storage_prefix(data)?;
        if consumed != data.len() {
            self.unbind();
            return Err(TallyError::LengthMismatch {
                expected: consumed,
                found: data.len(),
            });
        }
        Ok(())
    }

    /// Bind the storage at the front of `data`, returning its size.
    pub(crate) fn bind_storage_prefix(&mut self, data: &'a [u8]) -> Result<usize> {
        let metadata = Metadata::parse(data)?;
        let start = metadata.record_offset();
        let end = metadata.storage_bytes();
        if data.len() < end {
            return Err(TallyError::Truncated {
                needed: end,
                available: data.len(),
            });
        }
        self.set_metadata(metadata);
        if let Err(e) = self.bind_values(&data[start..end]) {
            self.unbind();
            return Err(e);
        }
        Ok(end)
    }

    /// Forget both bindings
    pub fn unbind(&mut self) {
        self.metadata = None;
        self.index.clear();
        self.values = None;
    }

    pub fn is_bound(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn has_values(&self) -> bool {
        self.values.is_some()
    }

    fn meta(&self) -> &Metadata<'a> {
        match &self.metadata {
            Some(m) => m,
            None => panic!("View used before metadata was bound"),
        }
    }

    fn value_block(&self) -> &'a [u8] {
        match self.values {
            Some(v) => v,
            None => panic!("View used before values were bound"),
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.meta().endianness
    }

    pub fn protocol_version(&self) -> u8 {
        self.meta().protocol_version
    }

    pub fn sync_value(&self) -> u32 {
        self.meta().sync_value
    }

    pub fn metadata_bytes(&self) -> usize {
        self.meta().bytes
    }

    /// Length of the value block alone
    pub fn value_bytes(&self) -> usize {
        self.meta().value_bytes
    }

    /// Length of a storage buffer with this layout, as declared by the metadata
    pub fn storage_bytes(&self) -> usize {
        self.meta().storage_bytes()
    }

    /// Number of metrics described by the metadata
    pub fn count(&self) -> usize {
        self.meta().metrics.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.meta();
        self.index.get(name).copied()
    }

    /// Metadata entry at `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn info(&self, index: usize) -> &MetricInfo<'a> {
        let metrics = &self.meta().metrics;
        assert!(
            index < metrics.len(),
            "Metric index {index} out of range ({} metrics)",
            metrics.len()
        );
        &metrics[index]
    }

    pub fn infos(&self) -> &[MetricInfo<'a>] {
        &self.meta().metrics
    }

    pub fn name(&self, index: usize) -> &'a str {
        self.info(index).name
    }

    pub fn description(&self, index: usize) -> &'a str {
        self.info(index).description
    }

    pub fn unit(&self, index: usize) -> Option<&'a str> {
        self.info(index).unit
    }

    pub fn kind(&self, index: usize) -> ValueKind {
        self.info(index).kind
    }

    pub fn role(&self, index: usize) -> Role {
        self.info(index).role
    }

    pub fn min(&self, index: usize) -> Option<Value> {
        self.info(index).min
    }

    pub fn max(&self, index: usize) -> Option<Value> {
        self.info(index).max
    }

    pub fn enum_values(&self, index: usize) -> &[EnumValueRef<'a>] {
        &self.info(index).enum_values
    }

    fn slot(&self, index: usize) -> &'a [u8] {
        let info = self.info(index);
        let block = self.value_block();
        &block[info.offset..info.offset + info.kind.width().slot_bytes()]
    }

    /// Whether the slot was ever written by a handle.
    ///
    /// # Panics
    /// If values are not bound or `index` is out of range.
    pub fn is_initialized(&self, index: usize) -> bool {
        SlotState::from_flag(self.slot(index)[0]).is_initialized()
    }

    pub fn has_value(&self, index: usize) -> bool {
        SlotState::from_flag(self.slot(index)[0]) == SlotState::Value
    }

    /// Value at `index`, `None` when uninitialized or empty.
    pub fn value(&self, index: usize) -> Option<Value> {
        read_slot(self.kind(index), self.endianness(), self.slot(index))
    }

    pub fn value_by_name(&self, name: &str) -> Option<Value> {
        self.index_of(name).and_then(|i| self.value(i))
    }

    /// Typed value at `index`.
    ///
    /// # Panics
    /// If the metric is not of kind `K`.
    pub fn value_as<K: Kind>(&self, index: usize) -> Option<K::Value> {
        let kind = self.kind(index);
        assert_eq!(
            kind,
            K::KIND,
            "Metric '{}' is {kind}, not {}",
            self.name(index),
            K::KIND
        );
        self.value(index).and_then(K::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::codec::{write_slot, Enum8, F32, U64};
    use crate::metrics::descriptor::MetricDescriptor;
    use crate::metrics::layout::{align8, encode_metadata};
    use crate::metrics::store::MetricsStore;

    fn store() -> MetricsStore {
        MetricsStore::new(vec![
            MetricDescriptor::counter("rx", "Received", ValueKind::U64).with_unit("bytes"),
            MetricDescriptor::gauge("mode", "Mode", ValueKind::Enum8)
                .with_enum_value(0, "off", "")
                .with_enum_value(1, "on", "Running"),
            MetricDescriptor::gauge("load", "Load", ValueKind::F32)
                .with_min(Value::F32(0.0))
                .with_max(Value::F32(1.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_bind_metadata_and_values() {
        let mut store = store();
        let mut rx = store.initialize_metric::<U64>("rx");
        let mut mode = store.initialize_metric::<Enum8>("mode");
        rx.add(1500);
        mode.set(1);

        let metadata = store.metadata();
        let mut record = vec![0; store.value_record_bytes()];
        store.copy_values(&mut record);

        let mut view = View::new();
        view.bind_metadata(&metadata).unwrap();
        assert!(!view.has_values());
        view.bind_values(&record).unwrap();

        assert_eq!(view.count(), 3);
        assert_eq!(view.sync_value(), store.sync_value());
        assert_eq!(view.name(0), "rx");
        assert_eq!(view.unit(0), Some("bytes"));
        assert_eq!(view.role(0), Role::Counter);
        assert_eq!(view.value(0), Some(Value::U64(1500)));
        assert_eq!(view.value_as::<U64>(0), Some(1500));
        assert_eq!(view.enum_values(1)[1].name, "on");
        assert_eq!(view.value_as::<Enum8>(1), Some(1));
        assert!(!view.is_initialized(2));
        assert_eq!(view.value_as::<F32>(2), None);
        assert_eq!(view.max(2), Some(Value::F32(1.0)));
        assert_eq!(view.value_by_name("rx"), Some(Value::U64(1500)));
        assert_eq!(view.value_by_name("missing"), None);
    }

    #[test]
    fn test_rebind_to_new_snapshot() {
        let mut store = store();
        let mut rx = store.initialize_metric::<U64>("rx");
        let metadata = store.metadata();

        let mut first = vec![0; store.value_record_bytes()];
        store.copy_values(&mut first);
        rx.set(10);
        let mut second = vec![0; store.value_record_bytes()];
        store.copy_values(&mut second);

        let mut view = View::new();
        view.bind_metadata(&metadata).unwrap();
        view.bind_values(&first).unwrap();
        assert_eq!(view.value(0), Some(Value::U64(0)));
        view.bind_values(&second).unwrap();
        assert_eq!(view.value(0), Some(Value::U64(10)));
    }

    #[test]
    fn test_sync_mismatch_rejected() {
        let a = store();
        let b = MetricsStore::new(vec![
            MetricDescriptor::counter("tx", "Sent", ValueKind::U64),
            MetricDescriptor::gauge("mode", "Mode", ValueKind::Enum8),
            MetricDescriptor::gauge("load", "Load", ValueKind::F32),
        ])
        .unwrap();
        assert_eq!(a.value_record_bytes(), b.value_record_bytes());

        let metadata = a.metadata();
        let mut record = vec![0; b.value_record_bytes()];
        b.copy_values(&mut record);

        let mut view = View::new();
        view.bind_metadata(&metadata).unwrap();
        assert!(matches!(
            view.bind_values(&record),
            Err(TallyError::HashMismatch { .. })
        ));
        assert!(!view.has_values());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let store = store();
        let metadata = store.metadata();
        let record = vec![0; store.value_record_bytes() + 1];
        let mut view = View::new();
        view.bind_metadata(&metadata).unwrap();
        assert!(matches!(
            view.bind_values(&record),
            Err(TallyError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_bind_storage() {
        let mut store = store();
        let mut rx = store.initialize_metric::<U64>("rx");
        rx.set(3);
        let storage = store.storage_snapshot();

        let mut view = View::new();
        view.bind_storage(&storage).unwrap();
        assert_eq!(view.storage_bytes(), storage.len());
        assert_eq!(view.value(0), Some(Value::U64(3)));

        let mut longer = storage.clone();
        longer.push(0);
        let mut view = View::new();
        assert!(view.bind_storage(&longer).is_err());
        assert!(!view.is_bound());
    }

    /// Storage written by hand in the given byte order, as a foreign host
    /// would produce it.
    fn foreign_storage(endian: Endianness) -> Vec<u8> {
        let descriptors = [
            MetricDescriptor::gauge("count", "", ValueKind::U32),
            MetricDescriptor::gauge("drift", "", ValueKind::I64),
            MetricDescriptor::gauge("up", "", ValueKind::Bool),
        ];
        let values = [Value::U32(0x0102_0304), Value::I64(-2), Value::Bool(true)];

        let metadata = encode_metadata(&descriptors, endian).unwrap();
        let meta = Metadata::parse(&metadata).unwrap();
        let record = align8(metadata.len());
        let block = record + VALUE_HEADER_BYTES;

        let mut storage = vec![0; block + meta.value_bytes];
        storage[..metadata.len()].copy_from_slice(&metadata);
        storage[record..record + 4].copy_from_slice(&endian.u32_bytes(meta.sync_value));
        for (info, value) in meta.metrics.iter().zip(values) {
            let start = block + info.offset;
            let end = start + info.kind.width().slot_bytes();
            write_slot(value, endian, &mut storage[start..end]);
        }
        storage
    }

    #[test]
    fn test_values_read_in_recorded_byte_order() {
        for endian in [Endianness::Big, Endianness::Little] {
            let storage = foreign_storage(endian);
            let mut view = View::new();
            view.bind_storage(&storage).unwrap();

            assert_eq!(view.endianness(), endian);
            assert_eq!(view.value(0), Some(Value::U32(0x0102_0304)));
            assert_eq!(view.value(1), Some(Value::I64(-2)));
            assert_eq!(view.value(2), Some(Value::Bool(true)));
        }
    }

    #[test]
    fn test_big_endian_slot_bytes() {
        let storage = foreign_storage(Endianness::Big);
        let mut view = View::new();
        view.bind_storage(&storage).unwrap();
        let block = storage.len() - view.value_bytes();
        // "count" is the first 8-byte slot: flag, then the u32 in the first 4 bytes
        assert_eq!(&storage[block..block + 9], &[1, 1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_metadata_with_trailing_bytes_rejected() {
        let store = store();
        let storage = store.storage_snapshot();
        let mut view = View::new();
        assert!(matches!(
            view.bind_metadata(&storage),
            Err(TallyError::LengthMismatch { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "before metadata was bound")]
    fn test_unbound_view_panics() {
        View::new().count();
    }

    #[test]
    #[should_panic(expected = "before values were bound")]
    fn test_unbound_values_panic() {
        let store = store();
        let metadata = store.metadata();
        let mut view = View::new();
        view.bind_metadata(&metadata).unwrap();
        view.value(0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_out_of_range_panics() {
        let store = store();
        let metadata = store.metadata();
        let mut view = View::new();
        view.bind_metadata(&metadata).unwrap();
        view.name(3);
    }

    #[test]
    #[should_panic(expected = "not u64")]
    fn test_value_as_wrong_kind_panics() {
        let store = store();
        let storage = store.storage_snapshot();
        let mut view = View::new();
        view.bind_storage(&storage).unwrap();
        view.value_as::<U64>(2);
    }
}
