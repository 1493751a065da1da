//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use vd_core::config::LoggingConfig;

/// Default directives when `verbose` is set.
pub const VERBOSE_FILTER: &str = "video_dummy=trace,vd_engine=trace,vd_core=debug";

/// The filter directive that [`init_tracing`] will install.
///
/// `RUST_LOG` wins over the configuration.
pub fn filter_directive(config: &LoggingConfig) -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if config.verbose {
            VERBOSE_FILTER.to_string()
        } else {
            config.filter.clone()
        }
    })
}

/// Install the global fmt subscriber.
///
/// Returns `false` if a subscriber was already installed, which happens when
/// a host (or a test binary) set one up first.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let directive = filter_directive(config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("invalid log filter {directive:?}: {e}; falling back to info");
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
