//! Tracing subscriber setup for the `vectorguard` binary.
//!
//! Logs go to stderr so stdout stays reserved for JSON results. The
//! `VECTORGUARD_LOG` environment variable takes precedence over the configured
//! level. Records emitted through the `log` facade (the `index` crate) are
//! bridged into the same subscriber.

use std::error::Error;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "VECTORGUARD_LOG";

/// Filter from `VECTORGUARD_LOG`, else from `cfg.level`, else `info`.
pub fn env_filter(cfg: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(cfg: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(cfg))
        .with_writer(std::io::stderr);

    match cfg.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder
            .json()
            .with_thread_ids(true)
            .with_target(true)
            .try_init(),
    }
}
