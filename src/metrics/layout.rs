//! Binary layout of a metrics storage buffer.
//!
//! ```text
//! storage  = metadata | zero pad to 8 | value record
//! metadata = endianness u8 | version u8 | eight-count u16 | one-count u16
//!            | entry* | sync u32
//! entry    = u16 name len | name | u16 desc len | desc | kind u8 | flags u8
//!            | [u16 unit len | unit] | [min] | [max] | [enum values]
//! record   = sync u32 | 4 zero bytes | value block
//! block    = 8-byte-kind slots (9 bytes each) | 1-byte-kind slots (2 bytes each)
//! ```

use crate::core::{Result, TallyError};
use crate::metrics::codec::{decode_value, encode_value, Endianness};
use crate::metrics::descriptor::MetricDescriptor;
use crate::metrics::hash::fnv1a32;
use crate::metrics::kind::{Role, Value, ValueKind, WidthClass};

/// Version written into byte 1 of the metadata header
pub const PROTOCOL_VERSION: u8 = 2;
/// endianness + version + two u16 counts
pub const HEADER_BYTES: usize = 6;
pub const SYNC_BYTES: usize = 4;
/// Sync value plus padding, placed before the value block
pub const VALUE_HEADER_BYTES: usize = 8;
/// Slot counts are stored as u16
pub const MAX_METRICS: usize = u16::MAX as usize;

const ROLE_MASK: u8 = 0b0000_0011;
const FLAG_UNIT: u8 = 1 << 2;
const FLAG_MIN: u8 = 1 << 3;
const FLAG_MAX: u8 = 1 << 4;
const FLAG_ENUM: u8 = 1 << 5;

#[inline]
pub const fn align8(n: usize) -> usize {
    (n + 7) & !7
}

/// Slot placement computed from the declared kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLayout {
    /// Offset of each metric's slot inside the value block, in declaration order
    pub offsets: Vec<usize>,
    pub eight_count: usize,
    pub one_count: usize,
}

impl SlotLayout {
    /// Pack all 8-byte kinds first, then all 1-byte kinds. Declaration order
    /// is kept within each width class.
    pub fn compute(kinds: impl IntoIterator<Item = ValueKind> + Clone) -> Self {
        let eight_count = kinds
            .clone()
            .into_iter()
            .filter(|k| k.width() == WidthClass::Eight)
            .count();

        let mut next_eight = 0;
        let mut next_one = eight_count * WidthClass::Eight.slot_bytes();
        let mut one_count = 0;
        let offsets = kinds
            .into_iter()
            .map(|kind| match kind.width() {
                WidthClass::Eight => {
                    let offset = next_eight;
                    next_eight += WidthClass::Eight.slot_bytes();
                    offset
                },
                WidthClass::One => {
                    let offset = next_one;
                    next_one += WidthClass::One.slot_bytes();
                    one_count += 1;
                    offset
                },
            })
            .collect();

        Self {
            offsets,
            eight_count,
            one_count,
        }
    }

    /// Length of the value block: 9 per 8-byte kind plus 2 per 1-byte kind
    pub fn value_bytes(&self) -> usize {
        self.eight_count * WidthClass::Eight.slot_bytes()
            + self.one_count * WidthClass::One.slot_bytes()
    }
}

/// Encode the metadata block, trailing sync value included.
///
/// Fails if there are more than 65535 descriptors or one of them has a
/// field too long for its u16 length prefix.
pub fn encode_metadata(descriptors: &[MetricDescriptor], endian: Endianness) -> Result<Vec<u8>> {
    if descriptors.len() > MAX_METRICS {
        return Err(TallyError::TooManyMetrics {
            count: descriptors.len(),
            limit: MAX_METRICS,
        });
    }
    for d in descriptors {
        d.validate()?;
    }

    let layout = SlotLayout::compute(descriptors.iter().map(|d| d.kind));
    let mut out = Vec::with_capacity(HEADER_BYTES + descriptors.len() * 32 + SYNC_BYTES);

    out.push(endian.tag());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&endian.u16_bytes(layout.eight_count as u16));
    out.extend_from_slice(&endian.u16_bytes(layout.one_count as u16));

    for d in descriptors {
        put_str(&mut out, endian, &d.name);
        put_str(&mut out, endian, &d.description);
        out.push(d.kind.tag());

        let mut flags = d.role.bits();
        if d.unit.is_some() {
            flags |= FLAG_UNIT;
        }
        if d.min.is_some() {
            flags |= FLAG_MIN;
        }
        if d.max.is_some() {
            flags |= FLAG_MAX;
        }
        if !d.enum_values.is_empty() {
            flags |= FLAG_ENUM;
        }
        out.push(flags);

        if let Some(unit) = &d.unit {
            put_str(&mut out, endian, unit);
        }
        for bound in [d.min, d.max].into_iter().flatten() {
            let start = out.len();
            out.resize(start + d.kind.width().value_bytes(), 0);
            encode_value(bound, endian, &mut out[start..]);
        }
        if !d.enum_values.is_empty() {
            out.extend_from_slice(&endian.u16_bytes(d.enum_values.len() as u16));
            for (key, value) in &d.enum_values {
                out.push(*key);
                put_str(&mut out, endian, &value.name);
                put_str(&mut out, endian, &value.description);
            }
        }
    }

    let sync = fnv1a32(&out);
    out.extend_from_slice(&endian.u32_bytes(sync));
    Ok(out)
}

/// Lengths were checked by `MetricDescriptor::validate`
fn put_str(out: &mut Vec<u8>, endian: Endianness, s: &str) {
    let len = u16::try_from(s.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&endian.u16_bytes(len));
    out.extend_from_slice(s.as_bytes());
}

/// One enum value as it appears in a metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValueRef<'a> {
    pub key: u8,
    pub name: &'a str,
    pub description: &'a str,
}

/// One metric entry borrowed from a metadata block.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricInfo<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub kind: ValueKind,
    pub role: Role,
    pub unit: Option<&'a str>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub enum_values: Vec<EnumValueRef<'a>>,
    /// Offset of the slot inside the value block
    pub offset: usize,
}

/// A parsed and hash-checked metadata block.
#[derive(Debug, Clone)]
pub struct Metadata<'a> {
    pub endianness: Endianness,
    pub protocol_version: u8,
    pub metrics: Vec<MetricInfo<'a>>,
    pub sync_value: u32,
    /// Bytes consumed by the metadata block
    pub bytes: usize,
    pub value_bytes: usize,
}

impl<'a> Metadata<'a> {
    /// Parse a metadata block from the front of `data`. Trailing bytes are
    /// left alone; `bytes` reports where the block ends.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < HEADER_BYTES {
            return Err(TallyError::Truncated {
                needed: HEADER_BYTES,
                available: data.len(),
            });
        }
        let endianness =
            Endianness::from_tag(data[0]).ok_or(TallyError::InvalidEndianness(data[0]))?;
        let protocol_version = data[1];
        if protocol_version != PROTOCOL_VERSION {
            return Err(TallyError::UnsupportedProtocol {
                found: protocol_version,
                expected: PROTOCOL_VERSION,
            });
        }

        let mut rdr = Reader {
            data,
            pos: 2,
            endian: endianness,
        };
        let eight_count = usize::from(rdr.u16()?);
        let one_count = usize::from(rdr.u16()?);

        let mut metrics = Vec::with_capacity(eight_count + one_count);
        for _ in 0..eight_count + one_count {
            metrics.push(rdr.entry()?);
        }

        let declared = metrics
            .iter()
            .filter(|m| m.kind.width() == WidthClass::Eight)
            .count();
        if declared != eight_count {
            return Err(TallyError::malformed(format!(
                "header declares {eight_count} 8-byte metrics, entries hold {declared}"
            )));
        }

        let hashed = rdr.pos;
        let sync_value = rdr.u32()?;
        let computed = fnv1a32(&data[..hashed]);
        if computed != sync_value {
            return Err(TallyError::HashMismatch {
                expected: sync_value,
                found: computed,
            });
        }

        let layout = SlotLayout::compute(metrics.iter().map(|m| m.kind));
        for (metric, offset) in metrics.iter_mut().zip(&layout.offsets) {
            metric.offset = *offset;
        }

        Ok(Self {
            endianness,
            protocol_version,
            metrics,
            sync_value,
            bytes: rdr.pos,
            value_bytes: layout.value_bytes(),
        })
    }

    /// Offset of the value record when the metadata heads a storage buffer
    pub fn record_offset(&self) -> usize {
        align8(self.bytes)
    }

    pub fn record_bytes(&self) -> usize {
        VALUE_HEADER_BYTES + self.value_bytes
    }

    /// Size of a full storage buffer laid out around this metadata
    pub fn storage_bytes(&self) -> usize {
        self.record_offset() + self.record_bytes()
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endianness,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(TallyError::Truncated {
                needed: end,
                available: self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(self.endian.read_u16([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(self.endian.read_u32([b[0], b[1], b[2], b[3]]))
    }

    fn str(&mut self) -> Result<&'a str> {
        let len = usize::from(self.u16()?);
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map_err(|e| TallyError::malformed(format!("invalid UTF-8 at byte {}: {e}", self.pos)))
    }

    fn entry(&mut self) -> Result<MetricInfo<'a>> {
        let name = self.str()?;
        let description = self.str()?;
        let tag = self.u8()?;
        let kind = ValueKind::from_tag(tag).ok_or(TallyError::InvalidKind(tag))?;
        let flags = self.u8()?;
        let role = Role::from_bits(flags & ROLE_MASK)
            .ok_or_else(|| TallyError::malformed(format!("invalid role bits in '{name}'")))?;

        let unit = if flags & FLAG_UNIT != 0 {
            Some(self.str()?)
        } else {
            None
        };
        let width = kind.width().value_bytes();
        let min = if flags & FLAG_MIN != 0 {
            Some(decode_value(kind, self.endian, self.take(width)?))
        } else {
            None
        };
        let max = if flags & FLAG_MAX != 0 {
            Some(decode_value(kind, self.endian, self.take(width)?))
        } else {
            None
        };

        let mut enum_values = Vec::new();
        if flags & FLAG_ENUM != 0 {
            let count = self.u16()?;
            for _ in 0..count {
                enum_values.push(EnumValueRef {
                    key: self.u8()?,
                    name: self.str()?,
                    description: self.str()?,
                });
            }
        }

        Ok(MetricInfo {
            name,
            description,
            kind,
            role,
            unit,
            min,
            max,
            enum_values,
            offset: 0,
        })
    }
}
