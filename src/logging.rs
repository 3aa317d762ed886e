//! Tracing setup for the CLI.
//!
//! `RUST_LOG` wins over the configured level. A level string that does not
//! parse falls back to `info` for this crate and `warn` for everything else.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const FALLBACK_DIRECTIVES: &str = "layerflat_core=info,warn";

/// Filter for `level`, unless `RUST_LOG` is set.
pub fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVES))
}

/// Install a global stderr subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level))
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.compact().with_target(false).try_init()
    };
    installed.is_ok()
}
