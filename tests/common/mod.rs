//! Common test utilities and fixtures.

#![allow(dead_code)]

use std::sync::Arc;
use tally::metrics::{MetricDescriptor, Role, Value, ValueKind};
use tally::time_series::{Aggregate, DataPoint, Time};

/// Test fixture builder for descriptors with sensible defaults.
pub struct TestDescriptorBuilder {
    name: String,
    kind: ValueKind,
    role: Role,
    unit: Option<String>,
    bounded: bool,
}

impl TestDescriptorBuilder {
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            role: Role::Gauge,
            unit: None,
            bounded: false,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Attach min/max bounds matching the kind
    pub fn bounded(mut self) -> Self {
        self.bounded = true;
        self
    }

    pub fn build(self) -> MetricDescriptor {
        let description = format!("{} under test", self.name);
        let mut d = MetricDescriptor::new(self.name, description, self.kind).with_role(self.role);
        if let Some(unit) = self.unit {
            d = d.with_unit(unit);
        }
        if self.bounded && self.kind.is_numeric() {
            let (min, max) = bounds(self.kind);
            d = d.with_min(min).with_max(max);
        }
        if self.kind == ValueKind::Enum8 {
            d = d
                .with_enum_value(0, "off", "Stopped")
                .with_enum_value(1, "on", "Running");
        }
        d
    }
}

fn bounds(kind: ValueKind) -> (Value, Value) {
    match kind {
        ValueKind::U64 => (Value::U64(0), Value::U64(1_000)),
        ValueKind::I64 => (Value::I64(-1_000), Value::I64(1_000)),
        ValueKind::F64 => (Value::F64(-1.5), Value::F64(1.5)),
        ValueKind::U32 => (Value::U32(0), Value::U32(100)),
        ValueKind::I32 => (Value::I32(-100), Value::I32(100)),
        ValueKind::F32 => (Value::F32(0.0), Value::F32(1.0)),
        ValueKind::Bool | ValueKind::Enum8 => unreachable!("not numeric"),
    }
}

/// One metric of every kind, in declaration order that mixes width classes
pub fn mixed_descriptors() -> Vec<MetricDescriptor> {
    vec![
        TestDescriptorBuilder::new("up", ValueKind::Bool).build(),
        TestDescriptorBuilder::new("rx_bytes", ValueKind::U64)
            .role(Role::Counter)
            .unit("bytes")
            .build(),
        TestDescriptorBuilder::new("mode", ValueKind::Enum8).build(),
        TestDescriptorBuilder::new("drift", ValueKind::I64).bounded().build(),
        TestDescriptorBuilder::new("load", ValueKind::F64).bounded().unit("ratio").build(),
        TestDescriptorBuilder::new("queue", ValueKind::U32).bounded().build(),
        TestDescriptorBuilder::new("offset", ValueKind::I32).build(),
        TestDescriptorBuilder::new("temp", ValueKind::F32).unit("C").build(),
        TestDescriptorBuilder::new("node_id", ValueKind::U64)
            .role(Role::Constant)
            .build(),
    ]
}

/// `a` 8-byte-kind and `b` 1-byte-kind descriptors in a shuffled order
pub fn shuffled_descriptors(
    rng: &mut fastrand::Rng,
    a: usize,
    b: usize,
) -> Vec<MetricDescriptor> {
    const WIDE: [ValueKind; 6] = [
        ValueKind::U64,
        ValueKind::I64,
        ValueKind::F64,
        ValueKind::U32,
        ValueKind::I32,
        ValueKind::F32,
    ];
    let mut descriptors: Vec<MetricDescriptor> = (0..a)
        .map(|i| MetricDescriptor::gauge(format!("wide_{i}"), "", WIDE[rng.usize(..WIDE.len())]))
        .collect();
    for i in 0..b {
        let kind = if rng.bool() { ValueKind::Bool } else { ValueKind::Enum8 };
        descriptors.push(MetricDescriptor::gauge(format!("narrow_{i}"), "", kind));
    }
    rng.shuffle(&mut descriptors);
    descriptors
}

/// `per_tick` data points for each time in `times`, each with `size` metric bytes
pub fn ticks(
    times: impl IntoIterator<Item = Time>,
    per_tick: usize,
    size: usize,
) -> Vec<DataPoint> {
    let aggregate = Arc::new(Aggregate::new("test|node", '|'));
    times
        .into_iter()
        .flat_map(|t| std::iter::repeat(t).take(per_tick))
        .map(|t| DataPoint::new(Arc::clone(&aggregate), t, size))
        .collect()
}

pub fn times(points: &[DataPoint]) -> Vec<Time> {
    points.iter().map(DataPoint::time).collect()
}
