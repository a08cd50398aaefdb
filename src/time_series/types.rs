//! Shared time-series primitives.

use std::fmt;

/// Timestamp of a data point. The unit is up to the caller; only ordering
/// matters to the collector and exporters.
pub type Time = u64;

/// Bytes the timestamp takes at the front of a data point payload
pub const TIME_BYTES: usize = std::mem::size_of::<Time>();

/// Default separator between aggregate path segments
pub const DEFAULT_DELIMITER: char = '|';

/// Immutable path of string segments naming where a data point came from,
/// e.g. `"node-1|eth0"`. Created once per path and shared by every data
/// point tagged with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregate {
    path: String,
    segments: Vec<String>,
}

impl Aggregate {
    /// Split `path` on `delimiter`. Empty segments are dropped.
    pub fn new(path: &str, delimiter: char) -> Self {
        Self {
            path: path.to_string(),
            segments: path
                .split(delimiter)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I, delimiter: char) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        let path = segments.join(&delimiter.to_string());
        Self { path, segments }
    }

    /// The path as it was given
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
