//! Test utilities for the content engine.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite. Provides logging initialisation, a fully wired in-memory
//! [`Services`] fixture and data source test doubles.

pub mod fixtures;

pub use fixtures::{CountingDataSource, CountingFactory, StaticPlugin, services_with_factory};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{GlobalConfig, SiteConfig};
use crate::services::Services;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Configuration used by every fixture.
pub fn test_config() -> GlobalConfig {
    GlobalConfig {
        site: SiteConfig {
            fullname: "Acme".to_string(),
            shortname: "acme".to_string(),
            wwwroot: "https://learn.example.com".to_string(),
        },
        ..GlobalConfig::default()
    }
}

/// In-memory services with the built-in data sources registered.
pub fn test_services() -> Services {
    init_test_logging(None);
    match Services::in_memory(&test_config()) {
        Ok(services) => services,
        Err(e) => panic!("built-in data sources failed to register: {e}"),
    }
}
