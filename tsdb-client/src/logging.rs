//! Logging setup for applications using the client.
//!
//! The library only emits `tracing` events: one `debug` event per request
//! attempt and response, and a `warn` event before each retry. Credentials
//! and signatures are never logged. Binaries install a subscriber with
//! [`init_logging`].

use tracing::Level;

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for everything else
    pub level: Level,
    /// Log level for `tsdb_client` events
    pub client_level: Level,
    /// Whether to use JSON output format
    pub json_format: bool,
    /// Environment filter override
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            client_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration for production use.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            client_level: Level::WARN,
            json_format: true,
            env_filter: None,
        }
    }

    /// Creates a configuration that shows every request.
    pub fn development() -> Self {
        Self {
            level: Level::INFO,
            client_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_client_level(mut self, level: Level) -> Self {
        self.client_level = level;
        self
    }

    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        if let Some(ref filter) = self.env_filter {
            filter.clone()
        } else {
            format!(
                "{},tsdb_client={}",
                self.level.as_str().to_lowercase(),
                self.client_level.as_str().to_lowercase()
            )
        }
    }
}

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
///
/// # Examples
///
/// ```rust,no_run
/// use tsdb_client::logging::{init_logging, LoggingConfig};
///
/// init_logging(LoggingConfig::development()).unwrap();
/// ```
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(LoggingConfig::default().env_filter(), "info,tsdb_client=info");
        assert_eq!(
            LoggingConfig::development().env_filter(),
            "info,tsdb_client=debug"
        );
    }

    #[test]
    fn test_filter_override() {
        let config = LoggingConfig::production().with_env_filter("tsdb_client=trace");
        assert_eq!(config.env_filter(), "tsdb_client=trace");
        assert!(config.json_format);
    }

    #[test]
    fn test_builder_levels() {
        let config = LoggingConfig::default()
            .with_level(Level::ERROR)
            .with_client_level(Level::TRACE)
            .with_json_format(true);
        assert_eq!(config.env_filter(), "error,tsdb_client=trace");
    }
}
