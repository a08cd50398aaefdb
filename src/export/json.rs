//! JSON rendering of views and data points.

use crate::core::Result;
use crate::metrics::kind::Value;
use crate::time_series::data_point::DataPoint;
use crate::view::View;
use serde_json::{json, Map};

/// Turns a bound view into bytes.
pub trait ViewSerializer {
    fn serialize(&self, view: &View<'_>) -> Result<Vec<u8>>;
}

/// JSON encoder for views.
///
/// The full form maps each name to
/// `{description, kind, role, unit, min, max, value}`; the slim form maps
/// each name straight to its value. Missing values are `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSerializer {
    pub slim: bool,
    pub pretty: bool,
}

impl JsonSerializer {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn slim() -> Self {
        Self {
            slim: true,
            pretty: false,
        }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn to_value(&self, view: &View<'_>) -> serde_json::Value {
        view_to_json(view, self.slim)
    }
}

impl ViewSerializer for JsonSerializer {
    fn serialize(&self, view: &View<'_>) -> Result<Vec<u8>> {
        let doc = self.to_value(view);
        Ok(if self.pretty {
            serde_json::to_vec_pretty(&doc)?
        } else {
            serde_json::to_vec(&doc)?
        })
    }
}

fn value_json(value: Option<Value>) -> serde_json::Value {
    match value {
        Some(Value::U64(v)) => json!(v),
        Some(Value::I64(v)) => json!(v),
        Some(Value::F64(v)) => json!(v),
        Some(Value::U32(v)) => json!(v),
        Some(Value::I32(v)) => json!(v),
        Some(Value::F32(v)) => json!(v),
        Some(Value::Bool(v)) => json!(v),
        Some(Value::Enum8(v)) => json!(v),
        None => serde_json::Value::Null,
    }
}

/// Render a view. Values are `null` when the view has no values bound.
pub fn view_to_json(view: &View<'_>, slim: bool) -> serde_json::Value {
    let mut doc = Map::new();
    for i in 0..view.count() {
        let value = if view.has_values() {
            value_json(view.value(i))
        } else {
            serde_json::Value::Null
        };
        let entry = if slim {
            value
        } else {
            let info = view.info(i);
            let mut entry = json!({
                "description": info.description,
                "kind": info.kind,
                "role": info.role.as_str(),
                "unit": info.unit,
                "min": value_json(info.min),
                "max": value_json(info.max),
                "value": value
            });
            if !info.enum_values.is_empty() {
                let names: Map<String, serde_json::Value> = info
                    .enum_values
                    .iter()
                    .map(|e| {
                        let named = json!({"name": e.name, "description": e.description});
                        (e.key.to_string(), named)
                    })
                    .collect();
                entry["enum_values"] = serde_json::Value::Object(names);
            }
            entry
        };
        doc.insert(view.name(i).to_string(), entry);
    }
    serde_json::Value::Object(doc)
}

/// Render a data point as `{time, aggregate, metrics}`, with one metrics
/// object per storage copy in its payload. A payload that does not parse as
/// storage copies renders `metrics` as `null`.
pub fn data_point_to_json(point: &DataPoint, slim: bool) -> serde_json::Value {
    let metrics = match point.views() {
        Ok(views) => serde_json::Value::Array(views.map(|v| view_to_json(&v, slim)).collect()),
        Err(e) => {
            tracing::warn!(
                time = point.time(),
                aggregate = %point.aggregate(),
                error = %e,
                "Data point metrics are not readable storage"
            );
            serde_json::Value::Null
        },
    };
    json!({
        "time": point.time(),
        "aggregate": point.aggregate().segments(),
        "metrics": metrics
    })
}

pub fn data_points_to_json(points: &[DataPoint], slim: bool) -> serde_json::Value {
    serde_json::Value::Array(points.iter().map(|p| data_point_to_json(p, slim)).collect())
}
