//! Logging setup for applications embedding the crate.
//!
//! The crate only emits `tracing` events; nothing is printed until the host
//! installs a subscriber, for example with [`init_logging`].
use crate::error::SheetIngestError;
use tracing::Level;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for everything outside this crate
    pub level: Level,
    /// Log level for `sheet_ingest` targets
    pub crate_level: Level,
    /// Whether to use JSON output format
    pub json_format: bool,
    /// Filter directives replacing the levels above
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            crate_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Debug output for the crate, plain text.
    pub fn development() -> Self {
        Self {
            level: Level::INFO,
            crate_level: Level::DEBUG,
            ..Self::default()
        }
    }

    /// JSON lines, crate events at INFO.
    pub fn production() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }

    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the filter directives string.
    pub fn env_filter(&self) -> String {
        match &self.env_filter {
            Some(filter) => filter.to_owned(),
            None => format!(
                "{},sheet_ingest={}",
                self.level.as_str().to_lowercase(),
                self.crate_level.as_str().to_lowercase()
            ),
        }
    }
}

/// Installs a global subscriber. `RUST_LOG` takes precedence over the config.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), SheetIngestError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|error| SheetIngestError::WithContextError(format!("Failed to initialize logging: {}", error)))
}
