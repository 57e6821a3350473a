//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events: one `debug` event per store
//! operation and `trace` events for model construction and query evaluation.
//! Applications that have no subscriber of their own can install the default one:
//!
//! ```ignore
//! let config = FireflyConfig::load()?;
//! firefly::logging::init_tracing(&config.logging);
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs a formatted subscriber filtered by `RUST_LOG`, falling back to the
/// configured level.
///
/// Returns `false` when a global subscriber was already installed, in which case
/// nothing changes.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialization_is_a_no_op() {
        let config = LoggingConfig::default();
        init_tracing(&config);

        assert!(!init_tracing(&config));
    }
}
