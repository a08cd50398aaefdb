//! Configuration for collectors, exporters and the drain loop.
//!
//! Loaded from YAML or built in code; every section has defaults so a
//! partial file is enough.

use crate::core::{Result, TallyError};
use crate::export::ExportFormat;
use crate::time_series::types::DEFAULT_DELIMITER;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time-series collector settings
    pub collector: CollectorConfig,
    /// Exporter settings
    pub exporter: ExporterConfig,
    /// Consumer-thread drain loop settings
    pub drain: DrainConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Collector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Separator between aggregate path segments
    pub aggregate_delimiter: char,
    /// Data points to reserve up front
    pub initial_capacity: usize,
}

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Distinct timestamps kept by the time-indexed exporter, 0 = unbounded
    pub time_index_capacity: usize,
    /// Stream/file output format
    pub format: ExportFormat,
    /// File the file exporter appends to
    pub output: Option<PathBuf>,
    /// Pretty-print JSON output
    pub pretty_json: bool,
}

/// Drain loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Sleep between polls of an empty queue
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Verbose compact format with targets, thread ids and line numbers
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            aggregate_delimiter: DEFAULT_DELIMITER,
            initial_capacity: 64,
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            time_index_capacity: 0,
            format: ExportFormat::Json,
            output: None,
            pretty_json: false,
        }
    }
}

impl Default for DrainConfig {
    fn default() -> Self {
        DrainConfig {
            interval: Duration::from_millis(10),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        ConfigBuilder::new().from_yaml(yaml)?.build()
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TallyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.collector.aggregate_delimiter.is_whitespace() {
            return Err(TallyError::config(format!(
                "aggregate_delimiter must not be whitespace, got {:?}",
                self.collector.aggregate_delimiter
            )));
        }

        if self.drain.interval.is_zero() {
            return Err(TallyError::config("drain interval must be greater than 0"));
        }

        if let Some(output) = &self.exporter.output {
            if output.as_os_str().is_empty() {
                return Err(TallyError::config("exporter output path is empty"));
            }
        }

        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| TallyError::config(format!("Failed to serialize config: {}", e)))
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| TallyError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    pub fn aggregate_delimiter(mut self, delimiter: char) -> Self {
        self.config.collector.aggregate_delimiter = delimiter;
        self
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.collector.initial_capacity = capacity;
        self
    }

    /// Distinct timestamps kept by the time-indexed exporter
    pub fn time_index_capacity(mut self, capacity: usize) -> Self {
        self.config.exporter.time_index_capacity = capacity;
        self
    }

    pub fn format(mut self, format: ExportFormat) -> Self {
        self.config.exporter.format = format;
        self
    }

    pub fn output(mut self, path: PathBuf) -> Self {
        self.config.exporter.output = Some(path);
        self
    }

    pub fn pretty_json(mut self, pretty: bool) -> Self {
        self.config.exporter.pretty_json = pretty;
        self
    }

    pub fn drain_interval(mut self, interval: Duration) -> Self {
        self.config.drain.interval = interval;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
