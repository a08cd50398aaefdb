//! Encoders turning views and data points into portable documents.

pub mod json;

pub use json::{data_point_to_json, data_points_to_json, JsonSerializer, ViewSerializer};

use serde::{Deserialize, Serialize};

/// Output format of the stream and file exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One JSON document per data point, newline separated
    #[default]
    Json,
    /// Length-prefixed binary frames
    Binary,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "binary" | "bin" => Ok(ExportFormat::Binary),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}
