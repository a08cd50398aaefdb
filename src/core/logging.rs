//! Tracing subscriber setup.

use crate::core::config::LoggingConfig;
use crate::core::{Result, TallyError};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable overriding the configured level
pub const LOG_ENV: &str = "TALLY_LOG";

/// Filter directive from `TALLY_LOG`, falling back to the configured level.
pub fn filter_directive(config: &LoggingConfig) -> String {
    std::env::var(LOG_ENV).unwrap_or_else(|_| config.level.as_str().to_string())
}

/// Build the subscriber `init_logging` installs, without installing it.
///
/// `structured` keeps the compact format and adds targets, thread ids and
/// line numbers.
pub fn subscriber(config: &LoggingConfig) -> Result<impl Subscriber + Send + Sync + 'static> {
    let filter = EnvFilter::try_new(filter_directive(config))
        .map_err(|e| TallyError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = if config.structured {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .compact()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).compact()
    };

    Ok(tracing_subscriber::registry().with(filter).with(fmt_layer))
}

/// Install a global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    subscriber(config)?
        .try_init()
        .map_err(|e| TallyError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(level = config.level.as_str(), "Logging initialized");
    Ok(())
}
