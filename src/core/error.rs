use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Duplicate metric name: {0}")]
    DuplicateMetric(String),

    #[error("A metrics store needs at least one metric")]
    EmptyStore,

    #[error("Too many metrics: {count} exceeds the limit of {limit}")]
    TooManyMetrics { count: usize, limit: usize },

    #[error("Invalid descriptor for '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    #[error("Buffer truncated: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Unsupported protocol version {found}, expected {expected}")]
    UnsupportedProtocol { found: u8, expected: u8 },

    #[error("Invalid endianness tag: {0}")]
    InvalidEndianness(u8),

    #[error("Invalid value kind tag: {0}")]
    InvalidKind(u8),

    #[error("Sync value mismatch: metadata {expected:#010x}, values {found:#010x}")]
    HashMismatch { expected: u32, found: u32 },

    #[error("Length mismatch: expected {expected} bytes, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Malformed buffer: {0}")]
    MalformedBuffer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for tally operations
pub type Result<T> = std::result::Result<T, TallyError>;

impl TallyError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new malformed buffer error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedBuffer(msg.into())
    }

    /// Creates a new invalid descriptor error
    pub fn descriptor<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidDescriptor {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the caller can retry or skip the offending input and
    /// carry on. Integrity failures only concern the buffer at hand.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::UnsupportedProtocol { .. }
                | Self::InvalidEndianness(_)
                | Self::InvalidKind(_)
                | Self::HashMismatch { .. }
                | Self::LengthMismatch { .. }
                | Self::MalformedBuffer(_)
                | Self::Io(_)
        )
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::DuplicateMetric(_)
            | Self::EmptyStore
            | Self::TooManyMetrics { .. }
            | Self::InvalidDescriptor { .. } => "descriptor",
            Self::Truncated { .. }
            | Self::UnsupportedProtocol { .. }
            | Self::InvalidEndianness(_)
            | Self::InvalidKind(_)
            | Self::MalformedBuffer(_) => "layout",
            Self::HashMismatch { .. } | Self::LengthMismatch { .. } => "integrity",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TallyError::config("bad delimiter");
        assert_eq!(err.to_string(), "Configuration error: bad delimiter");
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(TallyError::HashMismatch {
            expected: 1,
            found: 2
        }
        .is_recoverable());
        assert!(TallyError::malformed("short").is_recoverable());
        assert!(!TallyError::EmptyStore.is_recoverable());
        assert!(!TallyError::DuplicateMetric("a".into()).is_recoverable());
    }

    #[test]
    fn test_hash_mismatch_message() {
        let err = TallyError::HashMismatch {
            expected: 0xdead_beef,
            found: 0x1,
        };
        assert_eq!(
            err.to_string(),
            "Sync value mismatch: metadata 0xdeadbeef, values 0x00000001"
        );
        assert_eq!(err.category(), "integrity");
    }
}
