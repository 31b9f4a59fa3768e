//! Structured logging setup
//!
//! The engine itself only emits `tracing` events; hosts that do not already
//! install a subscriber can use these helpers. Initialization is guarded so
//! repeated calls (for example from multiple embedding points) are harmless.
//!
//! # Example
//!
//! ```no_run
//! use opname::util::logging;
//!
//! // Honors RUST_LOG, falls back to info
//! logging::init_from_env();
//! ```

use std::env;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Subscriber configuration for hosts without their own logging stack
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level to display
    pub level: Level,
    /// JSON output instead of human-readable console lines
    pub use_json: bool,
    /// Include the module target (e.g. `opname::pipeline`) in events
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Initialize the global subscriber with the given configuration
///
/// `RUST_LOG` overrides the configured level when set. Only the first call
/// installs a subscriber.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_lowercase()));

        if config.use_json {
            let layer = fmt::layer().json().with_target(config.include_target);
            tracing_subscriber::registry().with(filter).with(layer).init();
        } else {
            let layer = fmt::layer().with_target(config.include_target);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

/// Initialize with defaults (info level, console output)
pub fn init_default() {
    init_logging(&LoggingConfig::default());
}

/// Initialize from the environment: `RUST_LOG` filter, `LOG_FORMAT=json`
/// switches to JSON output
pub fn init_from_env() {
    let use_json = env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    init_logging(&LoggingConfig {
        use_json,
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_initialization_is_harmless() {
        init_default();
        init_default();
        init_from_env();
    }

    #[test]
    fn test_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
    }
}
