//! Metric descriptors: the immutable, declared shape of a store.

use crate::core::{Result, TallyError};
use crate::metrics::kind::{Role, Value, ValueKind};
use std::collections::BTreeMap;

/// Name and description of one Enum8 value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub description: String,
}

/// Declared shape of a single metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub description: String,
    pub kind: ValueKind,
    pub role: Role,
    pub unit: Option<String>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    /// Only meaningful for `ValueKind::Enum8`
    pub enum_values: BTreeMap<u8, EnumValue>,
}

impl MetricDescriptor {
    /// Create a gauge descriptor
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            role: Role::Gauge,
            unit: None,
            min: None,
            max: None,
            enum_values: BTreeMap::new(),
        }
    }

    pub fn counter(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        Self::new(name, description, kind).with_role(Role::Counter)
    }

    pub fn gauge(name: impl Into<String>, description: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(name, description, kind)
    }

    pub fn constant(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        Self::new(name, description, kind).with_role(Role::Constant)
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_min(mut self, min: Value) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: Value) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_enum_value(
        mut self,
        key: u8,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.enum_values.insert(
            key,
            EnumValue {
                name: name.into(),
                description: description.into(),
            },
        );
        self
    }

    /// Check the descriptor can be encoded into a metadata block.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TallyError::descriptor("", "name must not be empty"));
        }
        check_len(&self.name, "name", &self.name)?;
        check_len(&self.name, "description", &self.description)?;
        if let Some(unit) = &self.unit {
            check_len(&self.name, "unit", unit)?;
        }

        for (label, bound) in [("min", self.min), ("max", self.max)] {
            let Some(bound) = bound else { continue };
            if !self.kind.is_numeric() {
                return Err(TallyError::descriptor(
                    &self.name,
                    format!("{label} is only defined for numeric kinds, not {}", self.kind),
                ));
            }
            if bound.kind() != self.kind {
                return Err(TallyError::descriptor(
                    &self.name,
                    format!("{label} is {} but the metric is {}", bound.kind(), self.kind),
                ));
            }
            if !bound.is_finite() {
                return Err(TallyError::descriptor(&self.name, format!("{label} must be finite")));
            }
        }

        if !self.enum_values.is_empty() {
            if self.kind != ValueKind::Enum8 {
                return Err(TallyError::descriptor(
                    &self.name,
                    "enum values require the enum8 kind",
                ));
            }
            for value in self.enum_values.values() {
                check_len(&self.name, "enum value name", &value.name)?;
                check_len(&self.name, "enum value description", &value.description)?;
            }
        }
        Ok(())
    }
}

fn check_len(metric: &str, label: &str, text: &str) -> Result<()> {
    if text.len() > usize::from(u16::MAX) {
        return Err(TallyError::descriptor(
            metric,
            format!("{label} is {} bytes, limit is {}", text.len(), u16::MAX),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_helpers() {
        let d = MetricDescriptor::counter("packets", "Packets sent", ValueKind::U64)
            .with_unit("packets")
            .with_min(Value::U64(0))
            .with_max(Value::U64(1000));
        assert_eq!(d.role, Role::Counter);
        assert_eq!(d.unit.as_deref(), Some("packets"));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_min_must_match_kind() {
        let d = MetricDescriptor::gauge("temp", "", ValueKind::F64).with_min(Value::U64(0));
        assert!(matches!(d.validate(), Err(TallyError::InvalidDescriptor { .. })));
    }

    #[test]
    fn test_bool_has_no_bounds() {
        let d = MetricDescriptor::gauge("up", "", ValueKind::Bool).with_max(Value::Bool(true));
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_enum_values_need_enum_kind() {
        let d = MetricDescriptor::gauge("state", "", ValueKind::U32).with_enum_value(0, "idle", "");
        assert!(d.validate().is_err());

        let d = MetricDescriptor::gauge("state", "", ValueKind::Enum8)
            .with_enum_value(0, "idle", "Nothing to do")
            .with_enum_value(1, "busy", "");
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let d = MetricDescriptor::gauge("", "", ValueKind::U32);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_infinite_bound_rejected() {
        let d = MetricDescriptor::gauge("ratio", "", ValueKind::F32)
            .with_max(Value::F32(f32::INFINITY));
        assert!(d.validate().is_err());
    }
}
