//! Value kinds, roles and the tagged value type shared by stores and views.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight storable value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    U64,
    I64,
    F64,
    U32,
    I32,
    F32,
    Bool,
    Enum8,
}

/// Width class of a slot. Every kind lands in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidthClass {
    /// 1 flag byte + 8 value bytes
    Eight,
    /// 1 flag byte + 1 value byte
    One,
}

impl WidthClass {
    /// Bytes used by the value part of a slot
    pub const fn value_bytes(self) -> usize {
        match self {
            WidthClass::Eight => 8,
            WidthClass::One => 1,
        }
    }

    /// Bytes used by a whole slot, flag included
    pub const fn slot_bytes(self) -> usize {
        self.value_bytes() + 1
    }
}

impl ValueKind {
    pub const ALL: [ValueKind; 8] = [
        ValueKind::U64,
        ValueKind::I64,
        ValueKind::F64,
        ValueKind::U32,
        ValueKind::I32,
        ValueKind::F32,
        ValueKind::Bool,
        ValueKind::Enum8,
    ];

    /// Type tag written into the metadata block
    pub const fn tag(self) -> u8 {
        match self {
            ValueKind::U64 => 1,
            ValueKind::I64 => 2,
            ValueKind::F64 => 3,
            ValueKind::U32 => 4,
            ValueKind::I32 => 5,
            ValueKind::F32 => 6,
            ValueKind::Bool => 7,
            ValueKind::Enum8 => 8,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ValueKind::U64),
            2 => Some(ValueKind::I64),
            3 => Some(ValueKind::F64),
            4 => Some(ValueKind::U32),
            5 => Some(ValueKind::I32),
            6 => Some(ValueKind::F32),
            7 => Some(ValueKind::Bool),
            8 => Some(ValueKind::Enum8),
            _ => None,
        }
    }

    pub const fn width(self) -> WidthClass {
        match self {
            ValueKind::Bool | ValueKind::Enum8 => WidthClass::One,
            _ => WidthClass::Eight,
        }
    }

    /// Whether increment/decrement are defined for this kind
    pub const fn is_numeric(self) -> bool {
        !matches!(self, ValueKind::Bool | ValueKind::Enum8)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ValueKind::F32 | ValueKind::F64)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ValueKind::U64 => "u64",
            ValueKind::I64 => "i64",
            ValueKind::F64 => "f64",
            ValueKind::U32 => "u32",
            ValueKind::I32 => "i32",
            ValueKind::F32 => "f32",
            ValueKind::Bool => "bool",
            ValueKind::Enum8 => "enum8",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive role of a metric. Only `Constant` is enforced (write-once).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Gauge,
    Counter,
    Constant,
}

impl Role {
    pub const fn bits(self) -> u8 {
        match self {
            Role::Gauge => 0,
            Role::Counter => 1,
            Role::Constant => 2,
        }
    }

    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Role::Gauge),
            1 => Some(Role::Counter),
            2 => Some(Role::Constant),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Gauge => "gauge",
            Role::Counter => "counter",
            Role::Constant => "constant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded value, tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    U64(u64),
    I64(i64),
    F64(f64),
    U32(u32),
    I32(i32),
    F32(f32),
    Bool(bool),
    Enum8(u8),
}

impl Value {
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::U64(_) => ValueKind::U64,
            Value::I64(_) => ValueKind::I64,
            Value::F64(_) => ValueKind::F64,
            Value::U32(_) => ValueKind::U32,
            Value::I32(_) => ValueKind::I32,
            Value::F32(_) => ValueKind::F32,
            Value::Bool(_) => ValueKind::Bool,
            Value::Enum8(_) => ValueKind::Enum8,
        }
    }

    /// Finite check; non-float values are always finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::F64(v) => v.is_finite(),
            Value::F32(v) => v.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Enum8(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ValueKind::from_tag(0), None);
        assert_eq!(ValueKind::from_tag(9), None);
    }

    #[test]
    fn test_width_classes() {
        let one: Vec<_> = ValueKind::ALL
            .iter()
            .filter(|k| k.width() == WidthClass::One)
            .collect();
        assert_eq!(one, vec![&ValueKind::Bool, &ValueKind::Enum8]);
        assert_eq!(WidthClass::Eight.slot_bytes(), 9);
        assert_eq!(WidthClass::One.slot_bytes(), 2);
    }

    #[test]
    fn test_role_bits() {
        for role in [Role::Gauge, Role::Counter, Role::Constant] {
            assert_eq!(Role::from_bits(role.bits()), Some(role));
        }
        assert_eq!(Role::from_bits(3), None);
    }

    #[test]
    fn test_value_finite() {
        assert!(Value::F64(1.5).is_finite());
        assert!(!Value::F32(f32::NAN).is_finite());
        assert!(Value::U64(u64::MAX).is_finite());
    }
}
