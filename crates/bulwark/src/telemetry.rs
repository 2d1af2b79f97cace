//! Tracing subscriber setup for the binary.

use crate::LogFormat;
use bulwark_error::{BulwarkResult, ConfigError};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,bulwark=debug";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the defaults; `verbose` lowers the default to
/// `debug` for every crate.
pub fn init_telemetry(format: LogFormat, verbose: bool) -> BulwarkResult<()> {
    let fallback = if verbose { "debug" } else { DEFAULT_FILTER };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    result.map_err(|e| ConfigError::new(format!("Failed to initialize logging: {}", e)))?;

    info!(format = %format, "Telemetry initialized");
    Ok(())
}
