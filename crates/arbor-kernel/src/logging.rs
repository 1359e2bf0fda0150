//! Tracing subscriber setup for hosts embedding the kernel.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;
use crate::error::Result;

/// Build the filter: `RUST_LOG` if set, else the configured directives.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.filter)?),
    }
}

/// Install the global subscriber: env filter plus an fmt layer on stderr.
///
/// Errors if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = env_filter(config)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(config.ansi))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_filter_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            filter: "arbor_store=notalevel".into(),
            ansi: false,
        };
        assert!(env_filter(&config).is_err());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig {
            filter: "warn".into(),
            ansi: false,
        };
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
