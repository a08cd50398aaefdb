//! Slot codec: one flag byte followed by a fixed-width value.
//!
//! Values are written in the byte order recorded in the metadata header.
//! The live store always writes native order; views decode whatever order
//! the header declares.

use crate::metrics::kind::{Value, ValueKind, WidthClass};
use std::fmt::Debug;

/// Byte order tag stored in byte 0 of every metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    pub const fn tag(self) -> u8 {
        match self {
            Endianness::Little => 0,
            Endianness::Big => 1,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Endianness::Little),
            1 => Some(Endianness::Big),
            _ => None,
        }
    }

    #[inline]
    pub fn u16_bytes(self, v: u16) -> [u8; 2] {
        match self {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }

    #[inline]
    pub fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }

    #[inline]
    pub fn u64_bytes(self, v: u64) -> [u8; 8] {
        match self {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }

    #[inline]
    pub fn read_u16(self, b: [u8; 2]) -> u16 {
        match self {
            Endianness::Little => u16::from_le_bytes(b),
            Endianness::Big => u16::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn read_u32(self, b: [u8; 4]) -> u32 {
        match self {
            Endianness::Little => u32::from_le_bytes(b),
            Endianness::Big => u32::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn read_u64(self, b: [u8; 8]) -> u64 {
        match self {
            Endianness::Little => u64::from_le_bytes(b),
            Endianness::Big => u64::from_be_bytes(b),
        }
    }
}

/// State held in the leading flag byte of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// All-zero slot, never touched by a handle
    Uninitialized = 0,
    /// Initialized and currently holding a value
    Value = 1,
    /// Initialized but holding no value (optional metric, or reset)
    Empty = 2,
}

impl SlotState {
    #[inline]
    pub const fn from_flag(flag: u8) -> Self {
        match flag {
            0 => SlotState::Uninitialized,
            1 => SlotState::Value,
            _ => SlotState::Empty,
        }
    }

    #[inline]
    pub const fn is_initialized(self) -> bool {
        !matches!(self, SlotState::Uninitialized)
    }
}

/// Encode `value` into the value part of a slot (`out.len()` equals the width).
///
/// 32-bit kinds fill the first four bytes of their 8-byte region and zero the rest.
pub fn encode_value(value: Value, endian: Endianness, out: &mut [u8]) {
    debug_assert_eq!(out.len(), value.kind().width().value_bytes());
    match value {
        Value::U64(v) => out.copy_from_slice(&endian.u64_bytes(v)),
        Value::I64(v) => out.copy_from_slice(&endian.u64_bytes(v as u64)),
        Value::F64(v) => out.copy_from_slice(&endian.u64_bytes(v.to_bits())),
        Value::U32(v) => encode_narrow(endian.u32_bytes(v), out),
        Value::I32(v) => encode_narrow(endian.u32_bytes(v as u32), out),
        Value::F32(v) => encode_narrow(endian.u32_bytes(v.to_bits()), out),
        Value::Bool(v) => out[0] = u8::from(v),
        Value::Enum8(v) => out[0] = v,
    }
}

fn encode_narrow(bytes: [u8; 4], out: &mut [u8]) {
    out[..4].copy_from_slice(&bytes);
    out[4..].fill(0);
}

/// Decode the value part of a slot of the given kind.
pub fn decode_value(kind: ValueKind, endian: Endianness, bytes: &[u8]) -> Value {
    debug_assert_eq!(bytes.len(), kind.width().value_bytes());
    match kind {
        ValueKind::U64 => Value::U64(endian.read_u64(wide(bytes))),
        ValueKind::I64 => Value::I64(endian.read_u64(wide(bytes)) as i64),
        ValueKind::F64 => Value::F64(f64::from_bits(endian.read_u64(wide(bytes)))),
        ValueKind::U32 => Value::U32(endian.read_u32(narrow(bytes))),
        ValueKind::I32 => Value::I32(endian.read_u32(narrow(bytes)) as i32),
        ValueKind::F32 => Value::F32(f32::from_bits(endian.read_u32(narrow(bytes)))),
        ValueKind::Bool => Value::Bool(bytes[0] != 0),
        ValueKind::Enum8 => Value::Enum8(bytes[0]),
    }
}

fn wide(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0; 8];
    out.copy_from_slice(&bytes[..8]);
    out
}

fn narrow(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0; 4];
    out.copy_from_slice(&bytes[..4]);
    out
}

/// Read a full slot: `None` unless the flag says a value is present.
pub fn read_slot(kind: ValueKind, endian: Endianness, slot: &[u8]) -> Option<Value> {
    match SlotState::from_flag(slot[0]) {
        SlotState::Value => Some(decode_value(kind, endian, &slot[1..])),
        _ => None,
    }
}

/// Write `value` into a full slot and mark it as holding a value.
pub fn write_slot(value: Value, endian: Endianness, slot: &mut [u8]) {
    assert!(value.is_finite(), "Cannot assign a NaN or Inf/-Inf value");
    slot[0] = SlotState::Value as u8;
    encode_value(value, endian, &mut slot[1..]);
}

mod sealed {
    pub trait Sealed {}
}

/// Compile-time value kind used to type metric handles.
pub trait Kind: sealed::Sealed + 'static {
    type Value: Copy + PartialEq + Debug + Default;
    const KIND: ValueKind;

    fn into_value(v: Self::Value) -> Value;
    fn from_value(v: Value) -> Option<Self::Value>;

    fn width() -> WidthClass {
        Self::KIND.width()
    }
}

/// Kinds supporting increment/decrement.
pub trait Numeric: Kind {
    fn one() -> Self::Value;
    fn add(a: Self::Value, b: Self::Value) -> Self::Value;
    fn sub(a: Self::Value, b: Self::Value) -> Self::Value;
}

macro_rules! kind_marker {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $variant:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl Kind for $name {
            type Value = $ty;
            const KIND: ValueKind = ValueKind::$variant;

            #[inline]
            fn into_value(v: $ty) -> Value {
                Value::$variant(v)
            }

            #[inline]
            fn from_value(v: Value) -> Option<$ty> {
                match v {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! integer_arith {
    ($name:ident) => {
        impl Numeric for $name {
            #[inline]
            fn one() -> Self::Value {
                1
            }

            #[inline]
            fn add(a: Self::Value, b: Self::Value) -> Self::Value {
                a.wrapping_add(b)
            }

            #[inline]
            fn sub(a: Self::Value, b: Self::Value) -> Self::Value {
                a.wrapping_sub(b)
            }
        }
    };
}

macro_rules! float_arith {
    ($name:ident) => {
        impl Numeric for $name {
            #[inline]
            fn one() -> Self::Value {
                1.0
            }

            #[inline]
            fn add(a: Self::Value, b: Self::Value) -> Self::Value {
                a + b
            }

            #[inline]
            fn sub(a: Self::Value, b: Self::Value) -> Self::Value {
                a - b
            }
        }
    };
}

kind_marker!(
    /// Unsigned 64-bit integer
    U64, u64, U64
);
kind_marker!(
    /// Signed 64-bit integer
    I64, i64, I64
);
kind_marker!(
    /// 64-bit float, always finite once stored
    F64, f64, F64
);
kind_marker!(
    /// Unsigned 32-bit integer
    U32, u32, U32
);
kind_marker!(
    /// Signed 32-bit integer
    I32, i32, I32
);
kind_marker!(
    /// 32-bit float, always finite once stored
    F32, f32, F32
);
kind_marker!(
    /// Boolean, assignment only
    Bool, bool, Bool
);
kind_marker!(
    /// One-byte enumeration, assignment only
    Enum8, u8, Enum8
);

integer_arith!(U64);
integer_arith!(I64);
integer_arith!(U32);
integer_arith!(I32);
float_arith!(F64);
float_arith!(F32);
