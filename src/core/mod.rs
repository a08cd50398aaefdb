//! Ambient pieces shared by every module: errors, configuration, logging.

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder};
pub use error::{Result, TallyError};
pub use logging::init_logging;
