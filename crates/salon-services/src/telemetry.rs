//! # Tracing Setup
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=salon_db=trace` - Trace the persistence adapters only
//! - Otherwise: `[logging] level` for everything, `debug` for the salon
//!   crates, `warn` for sqlx

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Directive string used when `RUST_LOG` is not set.
pub fn default_directives(config: &LoggingConfig) -> String {
    format!("{},salon=debug,sqlx=warn", config.level.trim())
}

/// Installs the global subscriber.
///
/// Returns `false` when a subscriber was already installed (tests, or an
/// embedding application that set up its own).
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_follow_level() {
        let config = LoggingConfig {
            level: "warn".into(),
            json: false,
        };
        assert_eq!(default_directives(&config), "warn,salon=debug,sqlx=warn");
        assert_eq!(
            default_directives(&LoggingConfig::default()),
            "info,salon=debug,sqlx=warn"
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
